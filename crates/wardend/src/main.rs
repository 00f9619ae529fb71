//! Warden Daemon - protected gateway for a local text-generation backend
//!
//! Enforces login, per-client quotas and the content firewall, and stops
//! serving when the host runs out of CPU or RAM headroom.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use warden_common::{WardenConfig, VERSION};

#[derive(Debug, Parser)]
#[command(name = "wardend", version, about = "Protected gateway for a local text-generation backend")]
struct Args {
    /// Config file (defaults to /etc/warden/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the config
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("[BOOT] Warden Daemon v{} starting...", VERSION);

    let mut config =
        WardenConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    info!(
        "[BOOT] Quota {} prompts/client, fuse CPU {}% x{} RAM {}%",
        config.quota.max_prompts_per_client,
        config.fuse.cpu_limit_percent,
        config.fuse.cpu_strike_threshold,
        config.fuse.ram_limit_percent
    );

    wardend::server::run(config).await
}
