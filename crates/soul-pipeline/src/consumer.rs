//! Pipeline consumer — drains the ingest queue, classifies batches, and
//! fans results out to the daily log, the vault, and the to-do store.
//!
//! The four side-effects per item are independent: a failure in one is
//! counted and logged but never aborts the others, and never aborts the
//! batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use soul_ingest::{ActionType, ClassifiedItem, IngestQueue};
use soul_vault::{Priority, VaultStore};

use crate::classifier::Classifier;
use crate::daily_log::DailyLog;
use crate::todo::TodoStore;

/// Poll timeout for one consumer iteration.
const GET_BATCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-sink failure counters, surfaced via `/service/status`.
#[derive(Debug, Default)]
pub struct SinkCounters {
    pub daily_log: AtomicU64,
    pub vault: AtomicU64,
    pub todo_create: AtomicU64,
    pub todo_update: AtomicU64,
}

/// Snapshot of pipeline health.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub batches: u64,
    pub items: u64,
    pub fallback_classifications: u64,
    pub daily_log_errors: u64,
    pub vault_errors: u64,
    pub todo_create_errors: u64,
    pub todo_update_errors: u64,
}

/// The single long-running consumer.
pub struct Pipeline {
    queue: Arc<IngestQueue>,
    classifier: Arc<Classifier>,
    vault: Arc<VaultStore>,
    daily_log: Arc<DailyLog>,
    todos: Arc<TodoStore>,
    batches: AtomicU64,
    items: AtomicU64,
    sink_errors: SinkCounters,
}

impl Pipeline {
    pub fn new(
        queue: Arc<IngestQueue>,
        classifier: Arc<Classifier>,
        vault: Arc<VaultStore>,
        daily_log: Arc<DailyLog>,
        todos: Arc<TodoStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            classifier,
            vault,
            daily_log,
            todos,
            batches: AtomicU64::new(0),
            items: AtomicU64::new(0),
            sink_errors: SinkCounters::default(),
        })
    }

    /// Run until the token is cancelled, then drain one final batch.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        info!("Pipeline consumer started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    let batch = self.queue.get_batch(Some(Duration::ZERO)).await;
                    if !batch.is_empty() {
                        debug!(count = batch.len(), "Draining final batch");
                        self.process_batch(batch).await;
                    }
                    break;
                }
                batch = self.queue.get_batch(Some(GET_BATCH_TIMEOUT)) => {
                    if !batch.is_empty() {
                        self.process_batch(batch).await;
                    }
                }
            }
        }
        info!("Pipeline consumer stopped");
    }

    /// Classify one batch and apply all side-effects. Returns the classified
    /// items, order-preserved.
    pub async fn process_batch(&self, batch: Vec<soul_ingest::IngestItem>) -> Vec<ClassifiedItem> {
        let active = self.todos.active_summaries();
        let classified = self.classifier.classify(&batch, &active).await;

        self.batches.fetch_add(1, Ordering::Relaxed);
        self.items.fetch_add(classified.len() as u64, Ordering::Relaxed);

        for c in &classified {
            self.apply_effects(c);
        }
        classified
    }

    fn apply_effects(&self, c: &ClassifiedItem) {
        if let Err(e) = self.daily_log.append(
            &c.item.text,
            c.item.source.as_str(),
            c.item.timestamp,
            Some(c.category),
            &c.tags,
            c.importance,
        ) {
            self.sink_errors.daily_log.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Daily log append failed");
        }

        if let Err(e) = self.vault.ingest_text(&c.item.text, c.item.source.as_str()) {
            self.sink_errors.vault.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Vault ingest failed");
        }

        if c.action_type == Some(ActionType::NewTask) {
            if let Some(detail) = &c.action_detail {
                match self.todos.create(detail, Priority::P2, true) {
                    Ok(id) => debug!(%id, "Auto-detected task created"),
                    Err(e) => {
                        self.sink_errors.todo_create.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "Todo creation failed");
                    }
                }
            }
        }

        if matches!(
            c.action_type,
            Some(ActionType::TaskProgress) | Some(ActionType::TaskDone)
        ) {
            if let Some(id) = &c.related_todo_id {
                let today = Local::now().date_naive();
                if let Err(e) = self.todos.record_activity(id, c.item.source.as_str(), today) {
                    self.sink_errors.todo_update.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, %id, "Todo activity update failed");
                }
                if c.action_type == Some(ActionType::TaskDone) {
                    if let Err(e) = self.todos.complete(id) {
                        self.sink_errors.todo_update.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, %id, "Todo completion failed");
                    }
                }
            }
        }
    }

    /// Health snapshot for the status endpoint.
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            batches: self.batches.load(Ordering::Relaxed),
            items: self.items.load(Ordering::Relaxed),
            fallback_classifications: self.classifier.fallback_count(),
            daily_log_errors: self.sink_errors.daily_log.load(Ordering::Relaxed),
            vault_errors: self.sink_errors.vault.load(Ordering::Relaxed),
            todo_create_errors: self.sink_errors.todo_create.load(Ordering::Relaxed),
            todo_update_errors: self.sink_errors.todo_update.load(Ordering::Relaxed),
        }
    }
}
