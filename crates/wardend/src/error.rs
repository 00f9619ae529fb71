//! Hard-gate failures of the admission pipeline and their HTTP mapping.

use crate::quota::QuotaExceeded;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdmissionError {
    #[error("Server Overload Protection Activated (Fuse Blown).")]
    FuseBlown { reason: Option<String> },

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    QuotaExceeded(#[from] QuotaExceeded),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdmissionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::FuseBlown { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AdmissionError::Unauthorized => StatusCode::FORBIDDEN,
            AdmissionError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AdmissionError::FuseBlown { reason } => json!({
                "error": self.to_string(),
                "reason": reason,
            }),
            _ => json!({ "detail": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AdmissionError::FuseBlown { reason: None }.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AdmissionError::Unauthorized.status_code(), StatusCode::FORBIDDEN);
        let quota = AdmissionError::from(QuotaExceeded {
            client: "10.0.0.1".to_string(),
            limit: 50,
        });
        assert_eq!(quota.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(quota.to_string(), "Limit Reached. (50 Prompts Max)");
        assert_eq!(
            AdmissionError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
