//! Request admission pipeline.
//!
//! Every chat request passes these stages in order and stops at the first
//! failure:
//!
//! 1. fuse gate (503) - checked first so an overloaded host sheds load cheaply
//! 2. session check (403)
//! 3. quota charge (429) - pay-on-attempt, never refunded
//! 4. command dispatch to task executors (soft failures as chat text)
//! 5. content firewall, then the text backend (soft failures as chat text)

use crate::backend::TextBackend;
use crate::commands::Command;
use crate::error::AdmissionError;
use crate::executor::{run_blocking, ExecutorError, Executors};
use crate::firewall::ContentFirewall;
use crate::fuse::ResourceFuse;
use crate::quota::QuotaTracker;
use crate::session::SessionStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use warden_common::{Agent, ChatReply};

pub const IMAGE_UNAVAILABLE: &str = "Image generation agent is not available.";
pub const CODE_UNAVAILABLE: &str = "Code generation agent is not available.";

/// URL prefix under which the gallery directory is served
pub const GALLERY_ROUTE: &str = "/gallery";

/// One inbound chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub session_token: Option<String>,
    /// Quota key, the client's source address
    pub client_key: String,
    pub prompt: String,
}

pub struct AdmissionPipeline {
    fuse: Arc<ResourceFuse>,
    sessions: Arc<SessionStore>,
    quota: Arc<QuotaTracker>,
    firewall: ContentFirewall,
    backend: Arc<dyn TextBackend>,
    executors: Executors,
    system_prompt: String,
}

impl AdmissionPipeline {
    pub fn new(
        fuse: Arc<ResourceFuse>,
        sessions: Arc<SessionStore>,
        quota: Arc<QuotaTracker>,
        firewall: ContentFirewall,
        backend: Arc<dyn TextBackend>,
        executors: Executors,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            fuse,
            sessions,
            quota,
            firewall,
            backend,
            executors,
            system_prompt: system_prompt.into(),
        }
    }

    /// Stage 1 on its own, shared with the fuse middleware
    pub fn fuse_gate(&self) -> Result<(), AdmissionError> {
        if self.fuse.is_safe() {
            Ok(())
        } else {
            Err(AdmissionError::FuseBlown {
                reason: self.fuse.reason(),
            })
        }
    }

    pub async fn admit(&self, request: &ChatRequest) -> Result<ChatReply, AdmissionError> {
        self.fuse_gate()?;

        if !self
            .sessions
            .check_auth(request.session_token.as_deref())
            .await
        {
            warn!("Unauthorized chat request from {}", request.client_key);
            return Err(AdmissionError::Unauthorized);
        }

        self.quota.check_and_consume(&request.client_key).await?;

        match Command::parse(&request.prompt) {
            Command::Imagine(prompt) => self.imagine(prompt).await,
            Command::Code(task) => self.generate_code(task).await,
            Command::Chat(prompt) => Ok(self.chat(prompt).await),
        }
    }

    async fn imagine(&self, prompt: &str) -> Result<ChatReply, AdmissionError> {
        let Some(executor) = self.executors.image.clone() else {
            return Ok(ChatReply::text(IMAGE_UNAVAILABLE));
        };

        let path = match run_blocking(executor, prompt.to_string()).await {
            Ok(path) => path,
            Err(ExecutorError::Join(e)) => return Err(AdmissionError::Internal(e)),
            Err(e) => return Ok(ChatReply::text(format!("Image generation failed: {}", e))),
        };

        match gallery_url(&path) {
            Some(url) => {
                info!("Image generated: {}", url);
                Ok(ChatReply::from_agent(
                    Agent::Imagine,
                    format!("Generated an image based on: '{}'", prompt),
                )
                .with_image_url(url))
            }
            None => Ok(ChatReply::text(format!(
                "Image generation failed: no file in executor output '{}'",
                path
            ))),
        }
    }

    async fn generate_code(&self, task: &str) -> Result<ChatReply, AdmissionError> {
        let Some(executor) = self.executors.code.clone() else {
            return Ok(ChatReply::text(CODE_UNAVAILABLE));
        };

        match run_blocking(executor, task.to_string()).await {
            Ok(code) => Ok(ChatReply::from_agent(Agent::Code, code).as_code()),
            Err(ExecutorError::Join(e)) => Err(AdmissionError::Internal(e)),
            Err(e) => Ok(ChatReply::text(format!("Code generation failed: {}", e))),
        }
    }

    async fn chat(&self, prompt: &str) -> ChatReply {
        let verdict = self.firewall.classify(prompt);
        if let Some(canned) = self.firewall.response_for(verdict) {
            info!("Firewall answered prompt ({:?})", verdict);
            return ChatReply::from_agent(Agent::Firewall, canned);
        }

        let full_prompt = format!("{}\n\nUser: {}\nAssistant:", self.system_prompt, prompt);
        match self.backend.complete(&full_prompt).await {
            Ok(text) => ChatReply::from_agent(Agent::Core, text),
            Err(e) => ChatReply::text(e.user_message()),
        }
    }
}

/// Map an executor's output path to its public gallery URL
fn gallery_url(path: &str) -> Option<String> {
    let name = Path::new(path.trim()).file_name()?.to_str()?;
    Some(format!("{}/{}", GALLERY_ROUTE, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_url() {
        assert_eq!(
            gallery_url("/srv/gallery/fox_001.png").as_deref(),
            Some("/gallery/fox_001.png")
        );
        assert_eq!(gallery_url("fox.png\n").as_deref(), Some("/gallery/fox.png"));
        assert_eq!(gallery_url("/"), None);
    }
}
