//! Shared types for the Warden gateway: configuration and wire payloads.

pub mod config;
pub mod error;
pub mod wire;

pub use config::{
    AuthConfig, BackendConfig, ExecutorConfig, ExecutorsConfig, FirewallConfig, FuseConfig,
    IdentityConfig, QuotaConfig, ServerConfig, WardenConfig,
};
pub use error::ConfigError;
pub use wire::{Agent, ChatReply, FeedbackReply, StatusResponse};

/// Crate version reported at boot.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
