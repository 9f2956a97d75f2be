//! Error types for insight generation.

use thiserror::Error;

/// Insight error type.
#[derive(Debug, Error)]
pub enum InsightError {
    /// The report could not be persisted.
    #[error(transparent)]
    Vault(#[from] soul_vault::VaultError),

    /// The configured daily time is not `HH:MM`.
    #[error("Invalid daily_time: {0}")]
    InvalidDailyTime(String),
}

/// Result type for insight operations.
pub type Result<T> = std::result::Result<T, InsightError>;
