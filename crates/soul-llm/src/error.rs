//! Error types for LLM backends.

use thiserror::Error;

/// LLM error type.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend is misconfigured (missing key, bad URL).
    #[error("LLM configuration error: {0}")]
    Config(String),

    /// Transport-level failure, including timeouts.
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response carried no usable text.
    #[error("LLM returned an empty response")]
    Empty,

    /// Backend-specific failure (mock exhaustion, internal).
    #[error("LLM backend error: {0}")]
    Backend(String),
}

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;
