//! JSON payloads returned by the HTTP surface.

use serde::{Deserialize, Serialize};

/// Which part of the gateway produced a chat reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agent {
    /// Backend text completion
    Core,
    /// Canned reply from the content firewall
    Firewall,
    /// Image executor
    Imagine,
    /// Code executor
    Code,
}

/// Reply to POST /api/chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_code: Option<bool>,
}

impl ChatReply {
    /// Plain conversational text with no agent attribution
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            agent: None,
            image_url: None,
            is_code: None,
        }
    }

    pub fn from_agent(agent: Agent, response: impl Into<String>) -> Self {
        Self {
            agent: Some(agent),
            ..Self::text(response)
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn as_code(mut self) -> Self {
        self.is_code = Some(true);
        self
    }
}

/// Reply to GET /api/status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub safe: bool,
    pub reason: Option<String>,
    pub cpu: f32,
    pub ram: f32,
    /// Sessions issued since startup
    pub users: usize,
}

/// Reply to POST /api/feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReply {
    pub status: String,
    pub message: String,
}

impl FeedbackReply {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: "Feedback received!".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}
