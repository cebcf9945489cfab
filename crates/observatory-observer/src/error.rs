//! Error types for the observer API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the observer layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The observer surface is read-only.
    #[error("Observer API is read-only")]
    ReadOnly,

    /// A serialization failure while producing a response.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::ReadOnly => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            Self::Serialization(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {err}"))
            }
        };
        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
