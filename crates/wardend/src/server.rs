//! HTTP server for wardend

use crate::backend::{OllamaBackend, TextBackend};
use crate::executor::Executors;
use crate::feedback::FeedbackLog;
use crate::firewall::ContentFirewall;
use crate::fuse::{FuseLimits, ResourceFuse};
use crate::pipeline::AdmissionPipeline;
use crate::quota::QuotaTracker;
use crate::routes;
use crate::sampler::SysinfoSampler;
use crate::session::SessionStore;
use anyhow::{Context, Result};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use warden_common::WardenConfig;

/// Application state shared across handlers
pub struct AppState {
    pub fuse: Arc<ResourceFuse>,
    pub sessions: Arc<SessionStore>,
    pub quota: Arc<QuotaTracker>,
    pub pipeline: AdmissionPipeline,
    pub feedback: FeedbackLog,
    pub access_code: String,
    pub cookie_name: String,
    pub ai_name: String,
    pub gallery_dir: PathBuf,
    pub max_body_bytes: usize,
    pub start_time: Instant,
}

impl AppState {
    /// Wire every component from config around the given backend and executors
    pub fn new(config: &WardenConfig, backend: Arc<dyn TextBackend>, executors: Executors) -> Self {
        let fuse = Arc::new(ResourceFuse::new(FuseLimits::from(&config.fuse)));
        let sessions = Arc::new(SessionStore::new());
        let quota = Arc::new(QuotaTracker::new(config.quota.max_prompts_per_client));
        let firewall = ContentFirewall::new(&config.identity, &config.firewall);

        let pipeline = AdmissionPipeline::new(
            Arc::clone(&fuse),
            Arc::clone(&sessions),
            Arc::clone(&quota),
            firewall,
            backend,
            executors,
            config.identity.system_prompt(),
        );

        Self {
            fuse,
            sessions,
            quota,
            pipeline,
            feedback: FeedbackLog::new(config.server.feedback_log.clone()),
            access_code: config.auth.access_code.clone(),
            cookie_name: config.auth.session_cookie_name.clone(),
            ai_name: config.identity.ai_name.clone(),
            gallery_dir: config.server.gallery_dir.clone(),
            max_body_bytes: config.server.max_body_bytes,
            start_time: Instant::now(),
        }
    }

    /// Production wiring: HTTP backend and process executors
    pub fn from_config(config: &WardenConfig) -> Result<Self> {
        let backend = OllamaBackend::new(&config.backend).context("Failed to build backend client")?;
        info!("[BOOT] Backend: {} (model {})", config.backend.url, config.backend.model);

        let executors = Executors::from_config(&config.executors);
        Ok(Self::new(config, Arc::new(backend), executors))
    }
}

/// Assemble the router. Everything except the status route sits behind the
/// fuse gate.
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body = state.max_body_bytes;

    let guarded = Router::new()
        .merge(routes::page_routes())
        .merge(routes::api_routes())
        .merge(routes::gallery_routes(&state.gallery_dir))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            routes::fuse_guard,
        ));

    Router::new()
        .merge(guarded)
        .merge(routes::status_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(config: WardenConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);

    if !state.gallery_dir.exists() {
        std::fs::create_dir_all(&state.gallery_dir).with_context(|| {
            format!("Failed to create gallery dir {}", state.gallery_dir.display())
        })?;
    }

    state.fuse.start_monitoring(SysinfoSampler::new());

    let app = build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("  Listening on http://{}", config.server.bind);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!(
        "Shutting down gracefully after {}s",
        state.start_time.elapsed().as_secs()
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
