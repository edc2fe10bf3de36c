use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;
use crate::notifications::NotificationError;

/// JSON error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Bad Request", "Bad Gateway")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Workflow-level error taxonomy. Nothing here is fatal to the process; each
/// variant is scoped to a single candidate or a single resolution request.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad signature, malformed encoding, or reached expiry. All token
    /// failure modes collapse to this one client-facing signal.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("invalid decision: {0:?}")]
    InvalidDecision(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("notification transport failure: {0}")]
    NotificationTransport(#[from] NotificationError),

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrExpiredToken | Self::InvalidDecision(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotificationTransport(_) | Self::Ledger(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message suitable for HTTP responses. Backend errors stay generic to
    /// avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::Ledger(_) => "Ledger backend error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
