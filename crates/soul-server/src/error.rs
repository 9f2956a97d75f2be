//! Error types for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Request validation failed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage failure.
    #[error("Vault error: {0}")]
    Vault(#[from] soul_vault::VaultError),

    /// Pipeline-layer failure.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] soul_pipeline::PipelineError),
}

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body: `{error, kind}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::Pipeline(soul_pipeline::PipelineError::TodoNotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ServerError::Internal(_) | ServerError::Vault(_) | ServerError::Pipeline(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = %status, kind, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, kind, error = %message, "Client error");
        }

        let body = ErrorBody {
            error: message,
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
