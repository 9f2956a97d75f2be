//! The ingest-to-storage pipeline.
//!
//! Connects the ingest queue to durable storage: batches are classified via
//! the LLM backend and fanned out to the daily log, the vault's classified
//! notes, and the to-do store. Also home to the read-side stores those
//! side-effects feed (daily log, to-dos).

pub mod classifier;
pub mod consumer;
pub mod daily_log;
pub mod error;
pub mod todo;

pub use classifier::Classifier;
pub use consumer::{Pipeline, PipelineStatus};
pub use daily_log::DailyLog;
pub use error::{PipelineError, Result};
pub use todo::{TodoFilter, TodoItem, TodoStatus, TodoStore, TodoSummary, DEFAULT_STALE_DAYS};
