//! Shared application state for the HTTP surface.

use std::sync::Arc;
use std::time::Instant;

use soul_ingest::IngestQueue;
use soul_insight::InsightEngine;
use soul_pipeline::{DailyLog, Pipeline, TodoStore};
use soul_vault::VaultStore;

use crate::terminal::TerminalSink;

/// Application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<IngestQueue>,
    pub vault: Arc<VaultStore>,
    pub daily_log: Arc<DailyLog>,
    pub todos: Arc<TodoStore>,
    pub insight: Arc<InsightEngine>,
    pub pipeline: Arc<Pipeline>,
    pub terminal: Arc<TerminalSink>,
    pub started_at: Instant,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<IngestQueue>,
        vault: Arc<VaultStore>,
        daily_log: Arc<DailyLog>,
        todos: Arc<TodoStore>,
        insight: Arc<InsightEngine>,
        pipeline: Arc<Pipeline>,
        terminal: Arc<TerminalSink>,
    ) -> Self {
        Self {
            queue,
            vault,
            daily_log,
            todos,
            insight,
            pipeline,
            terminal,
            started_at: Instant::now(),
        }
    }
}
