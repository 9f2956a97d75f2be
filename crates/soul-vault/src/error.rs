//! Error types for vault storage.

use std::path::PathBuf;

use thiserror::Error;

/// Vault error type.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A filename contained a path separator or parent reference.
    #[error("Invalid resource name: {0}")]
    InvalidName(String),

    /// The vault root could not be created.
    #[error("Failed to create vault root {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file operation failed.
    #[error("Vault I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
