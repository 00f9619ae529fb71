//! API routes for wardend

use crate::error::AdmissionError;
use crate::pages;
use crate::pipeline::{ChatRequest, GALLERY_ROUTE};
use crate::server::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use warden_common::{ChatReply, FeedbackReply, StatusResponse};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Fuse gate
// ============================================================================

/// Refuse every request once the fuse has blown
pub async fn fuse_guard(
    State(state): State<AppStateArc>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = state.pipeline.fuse_gate() {
        warn!("Fuse blown, rejecting {} {}", request.method(), request.uri().path());
        return e.into_response();
    }
    next.run(request).await
}

// ============================================================================
// Page Routes
// ============================================================================

pub fn page_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(login_page))
        .route("/login", post(login))
        .route("/app", get(app_page))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub code: String,
}

async fn login_page(State(state): State<AppStateArc>) -> Html<String> {
    Html(pages::login_page(&state.ai_name, None))
}

async fn login(State(state): State<AppStateArc>, Form(form): Form<LoginForm>) -> Response {
    match state.sessions.login(&form.code, &state.access_code).await {
        Some(token) => {
            info!("Login accepted");
            let cookie = format!(
                "{}={}; HttpOnly; SameSite=Lax; Path=/",
                state.cookie_name, token
            );
            ([(header::SET_COOKIE, cookie)], Redirect::to("/app")).into_response()
        }
        None => Html(pages::login_page(&state.ai_name, Some("Invalid Access Code"))).into_response(),
    }
}

async fn app_page(State(state): State<AppStateArc>, headers: HeaderMap) -> Response {
    let token = session_token(&headers, &state.cookie_name);
    if !state.sessions.check_auth(token).await {
        return Redirect::to("/").into_response();
    }
    Html(pages::app_page(&state.ai_name, state.quota.ceiling())).into_response()
}

// ============================================================================
// API Routes
// ============================================================================

pub fn api_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/feedback", post(feedback))
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub prompt: String,
}

async fn chat(
    State(state): State<AppStateArc>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Result<Json<ChatReply>, AdmissionError> {
    let request = ChatRequest {
        session_token: session_token(&headers, &state.cookie_name).map(str::to_string),
        client_key: addr.ip().to_string(),
        prompt: form.prompt,
    };

    state.pipeline.admit(&request).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    pub message: String,
}

async fn feedback(
    State(state): State<AppStateArc>,
    Form(form): Form<FeedbackForm>,
) -> Json<FeedbackReply> {
    match state.feedback.append(&form.message).await {
        Ok(()) => Json(FeedbackReply::success()),
        Err(e) => Json(FeedbackReply::error(e.to_string())),
    }
}

// ============================================================================
// Status and gallery
// ============================================================================

pub fn status_routes() -> Router<AppStateArc> {
    Router::new().route("/api/status", get(status))
}

async fn status(State(state): State<AppStateArc>) -> Json<StatusResponse> {
    let fuse = state.fuse.status();
    Json(StatusResponse {
        safe: fuse.safe,
        reason: fuse.reason,
        cpu: fuse.cpu,
        ram: fuse.ram,
        users: state.sessions.len().await,
    })
}

/// Read-only mount of executor output
pub fn gallery_routes(dir: &Path) -> Router<AppStateArc> {
    Router::new().nest_service(GALLERY_ROUTE, ServeDir::new(dir))
}

// ============================================================================
// Helpers
// ============================================================================

/// Find a cookie value across all Cookie headers
fn session_token<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
