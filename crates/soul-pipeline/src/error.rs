//! Error types for the pipeline crate.

use thiserror::Error;

/// Pipeline error type.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Storage failure from the vault layer.
    #[error(transparent)]
    Vault(#[from] soul_vault::VaultError),

    /// A to-do id did not match any active item.
    #[error("Todo not found: {0}")]
    TodoNotFound(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
