//! Error mapping for the write gateway.
//!
//! Status mapping follows the kernel's error-kind table: missing auth
//! headers are 401, any verification failure is 403, validation and
//! lifecycle failures are 400 with a `{success: false, error}` body, and
//! unexpected internals are a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use observatory_agents::ClaimError;
use observatory_economy::TradeError;

/// Errors produced by gateway handlers and middleware.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// One or more auth headers are absent.
    #[error("Missing authentication headers")]
    AuthMissing,

    /// Signature, timestamp, or agent-liveness verification failed.
    #[error("{0}")]
    AuthInvalid(String),

    /// The request is well-formed HTTP but semantically invalid.
    #[error("{0}")]
    Validation(String),

    /// A claim-token failure.
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// A trade acceptance failure.
    #[error(transparent)]
    Trade(#[from] TradeError),

    /// Anything unexpected; details are logged, not exposed.
    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::AuthMissing => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({"error": self.to_string()}),
            ),
            Self::AuthInvalid(message) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({"error": message}),
            ),
            Self::Validation(_) | Self::Claim(_) | Self::Trade(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({"success": false, "error": self.to_string()}),
            ),
            Self::Internal(detail) => {
                tracing::error!(%detail, "Gateway internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({"success": false, "error": "Internal server error"}),
                )
            }
        };
        (status, axum::Json(body)).into_response()
    }
}
