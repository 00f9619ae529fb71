//! Text-completion backend client.
//!
//! Talks to an Ollama-style `/api/generate` endpoint with streaming disabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use warden_common::BackendConfig;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Connection(String),

    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Conversational text shown to the user instead of an error page
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Status(code) => format!("Backend error: HTTP {}", code),
            other => format!(
                "Backend connection error: {} (is the backend running?)",
                other
            ),
        }
    }
}

#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Complete a fully assembled prompt
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_ctx: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// HTTP client for the local generation service
pub struct OllamaBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    num_ctx: u32,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            num_ctx: config.num_ctx,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl TextBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_ctx: self.num_ctx,
            },
        };

        debug!("Backend request: model={} prompt_bytes={}", self.model, prompt.len());

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Backend unreachable at {}: {}", self.url, e);
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    BackendError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("Backend returned {}", status);
            return Err(BackendError::Status(status.as_u16()));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout)
            } else {
                BackendError::InvalidResponse(e.to_string())
            }
        })?;

        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;

    async fn spawn_backend(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/generate", addr)
    }

    fn config(url: String) -> BackendConfig {
        BackendConfig {
            url,
            model: "test-model".to_string(),
            num_ctx: 1024,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_complete_sends_generate_payload() {
        let app = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["stream"], false);
                assert_eq!(body["options"]["num_ctx"], 1024);
                let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
                Json(serde_json::json!({ "response": format!("echo: {}", prompt) }))
            }),
        );
        let backend = OllamaBackend::new(&config(spawn_backend(app).await)).unwrap();

        let text = backend.complete("hello").await.unwrap();
        assert_eq!(text, "echo: hello");
    }

    #[tokio::test]
    async fn test_missing_response_field_is_empty() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async { Json(serde_json::json!({ "done": true })) }),
        );
        let backend = OllamaBackend::new(&config(spawn_backend(app).await)).unwrap();
        assert_eq!(backend.complete("hi").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_non_200_is_status_error() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "loading model") }),
        );
        let backend = OllamaBackend::new(&config(spawn_backend(app).await)).unwrap();

        let err = backend.complete("hi").await.unwrap_err();
        assert!(matches!(err, BackendError::Status(503)));
        assert_eq!(err.user_message(), "Backend error: HTTP 503");
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(serde_json::json!({ "response": "too late" }))
            }),
        );
        let backend = OllamaBackend::new(&BackendConfig {
            timeout_secs: 1,
            ..config(spawn_backend(app).await)
        })
        .unwrap();

        let err = backend.complete("hi").await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(d) if d == Duration::from_secs(1)));
        assert!(err
            .user_message()
            .starts_with("Backend connection error: request timed out"));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend =
            OllamaBackend::new(&config(format!("http://{}/api/generate", addr))).unwrap();
        let err = backend.complete("hi").await.unwrap_err();
        assert!(matches!(err, BackendError::Connection(_)));
        assert!(err
            .user_message()
            .starts_with("Backend connection error:"));
    }
}
