//! Error types for producers.

use std::path::PathBuf;

use thiserror::Error;

/// Producer error type.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The filesystem watcher could not be created.
    #[error("Failed to create file watcher: {0}")]
    WatcherInit(String),

    /// A watch path could not be registered.
    #[error("Failed to watch path {path}: {error}")]
    WatchFailed { path: PathBuf, error: String },
}

/// Result type for producer operations.
pub type Result<T> = std::result::Result<T, ProducerError>;
