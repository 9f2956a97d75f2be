//! Thread-safe batching queue with deduplication.
//!
//! Producers call the synchronous [`IngestQueue::put`] from any thread; the
//! single pipeline consumer awaits [`IngestQueue::get_batch`]. A batch is
//! released when `batch_size` items have accumulated or when the flush
//! interval elapses with items waiting.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::item::IngestItem;

/// Hard cap beyond which new puts are shed. Producers are best-effort; a
/// stalled consumer must not grow the queue without bound.
const MAX_PENDING: usize = 10_000;

/// Queue tuning parameters.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Item count that triggers an immediate batch release.
    pub batch_size: usize,
    /// Maximum wait before a partial batch is flushed.
    pub flush_interval: Duration,
    /// Window during which identical text hashes are dropped.
    pub dedup_window: Duration,
    /// Pending-count ceiling; puts above it return `false`.
    pub max_pending: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            flush_interval: Duration::from_secs(60),
            dedup_window: Duration::from_secs(60),
            max_pending: MAX_PENDING,
        }
    }
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<IngestItem>,
    // dedup: hash16 -> instant last seen
    seen: HashMap<String, Instant>,
}

/// The process-wide ingest queue.
pub struct IngestQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    ready: Notify,
}

impl IngestQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(QueueState::default()),
            ready: Notify::new(),
        }
    }

    /// Short content hash used for deduplication.
    pub fn content_hash(text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    /// Enqueue an item.
    ///
    /// Returns `false` when the item was dropped: either its text hash was
    /// seen within the dedup window, or the queue is over its pending cap.
    pub fn put(&self, item: IngestItem) -> bool {
        let hash = Self::content_hash(&item.text);
        let now = Instant::now();

        let mut state = self.state.lock();

        // Expire old dedup entries while we hold the lock.
        let window = self.config.dedup_window;
        state.seen.retain(|_, seen_at| now.duration_since(*seen_at) < window);

        if state.seen.contains_key(&hash) {
            debug!(source = %item.source, "Dropped duplicate ingest item");
            return false;
        }

        if state.queue.len() >= self.config.max_pending {
            warn!(
                pending = state.queue.len(),
                "Ingest queue over capacity, shedding item"
            );
            return false;
        }

        state.seen.insert(hash, now);
        state.queue.push_back(item);

        if state.queue.len() >= self.config.batch_size {
            self.ready.notify_one();
        }
        true
    }

    /// Number of items currently waiting.
    pub fn pending_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Wait for a batch and return it, in enqueue order.
    ///
    /// Waits up to `timeout` (the flush interval when `None`) for either the
    /// batch-ready signal or a non-empty queue at a flush boundary, then
    /// drains up to `batch_size` items. An empty return is legal and means an
    /// idle interval.
    pub async fn get_batch(&self, timeout: Option<Duration>) -> Vec<IngestItem> {
        let deadline = Instant::now() + timeout.unwrap_or(self.config.flush_interval);

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(self.config.flush_interval);
            let signaled = tokio::time::timeout(wait, self.ready.notified())
                .await
                .is_ok();

            let batch = {
                let mut state = self.state.lock();
                if signaled || !state.queue.is_empty() {
                    self.drain(&mut state)
                } else {
                    Vec::new()
                }
            };
            if !batch.is_empty() {
                return batch;
            }
            // Signal without items (already drained) or idle flush boundary:
            // loop and re-check against the overall deadline.
        }

        // Final drain on deadline expiry.
        let mut state = self.state.lock();
        self.drain(&mut state)
    }

    fn drain(&self, state: &mut QueueState) -> Vec<IngestItem> {
        let take = state.queue.len().min(self.config.batch_size);
        let batch: Vec<IngestItem> = state.queue.drain(..take).collect();
        // Keep the signal live when a full batch is still waiting.
        if state.queue.len() >= self.config.batch_size {
            self.ready.notify_one();
        }
        batch
    }
}

impl Default for IngestQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Source;

    fn queue(batch_size: usize, flush_ms: u64) -> IngestQueue {
        IngestQueue::new(QueueConfig {
            batch_size,
            flush_interval: Duration::from_millis(flush_ms),
            dedup_window: Duration::from_secs(60),
            max_pending: MAX_PENDING,
        })
    }

    #[test]
    fn test_dedup_within_window() {
        let q = queue(10, 60_000);

        assert!(q.put(IngestItem::new("hello", Source::Note)));
        assert!(!q.put(IngestItem::new("hello", Source::Clipboard)));
        assert_eq!(q.pending_count(), 1);
    }

    #[test]
    fn test_distinct_hashes_all_enqueued() {
        let q = queue(100, 60_000);
        for i in 0..20 {
            assert!(q.put(IngestItem::new(format!("item {i}"), Source::Note)));
        }
        assert_eq!(q.pending_count(), 20);
    }

    #[test]
    fn test_dedup_expires_after_window() {
        let q = IngestQueue::new(QueueConfig {
            batch_size: 10,
            flush_interval: Duration::from_secs(60),
            dedup_window: Duration::from_millis(20),
            max_pending: MAX_PENDING,
        });

        assert!(q.put(IngestItem::new("hello", Source::Note)));
        std::thread::sleep(Duration::from_millis(40));
        assert!(q.put(IngestItem::new("hello", Source::Note)));
        assert_eq!(q.pending_count(), 2);
    }

    #[test]
    fn test_shed_over_capacity() {
        let q = IngestQueue::new(QueueConfig {
            batch_size: 100,
            flush_interval: Duration::from_secs(60),
            dedup_window: Duration::from_secs(60),
            max_pending: 3,
        });

        for i in 0..3 {
            assert!(q.put(IngestItem::new(format!("item {i}"), Source::Note)));
        }
        assert!(!q.put(IngestItem::new("over capacity", Source::Note)));
        assert_eq!(q.pending_count(), 3);
    }

    #[tokio::test]
    async fn test_batch_released_by_count_in_enqueue_order() {
        let q = queue(10, 60_000);
        for i in 0..10 {
            q.put(IngestItem::new(format!("item {i}"), Source::Note));
        }

        let batch = q.get_batch(Some(Duration::from_secs(2))).await;
        assert_eq!(batch.len(), 10);
        for (i, item) in batch.iter().enumerate() {
            assert_eq!(item.text, format!("item {i}"));
        }
    }

    #[tokio::test]
    async fn test_batch_released_by_flush_interval() {
        let q = queue(10, 300);
        q.put(IngestItem::new("lonely item", Source::Note));

        let batch = q.get_batch(Some(Duration::from_millis(500))).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text, "lonely item");
    }

    #[tokio::test]
    async fn test_empty_queue_zero_timeout_returns_immediately() {
        let q = queue(10, 60_000);
        let start = Instant::now();
        let batch = q.get_batch(Some(Duration::ZERO)).await;
        assert!(batch.is_empty());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_put_at_batch_boundary_signals_ready() {
        let q = queue(3, 60_000);
        q.put(IngestItem::new("a", Source::Note));
        q.put(IngestItem::new("b", Source::Note));
        // Next put crosses the threshold; get_batch must not wait for the
        // flush interval.
        q.put(IngestItem::new("c", Source::Note));

        let start = Instant::now();
        let batch = q.get_batch(Some(Duration::from_secs(10))).await;
        assert_eq!(batch.len(), 3);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_drain_caps_at_batch_size_and_keeps_rest() {
        let q = queue(5, 60_000);
        for i in 0..12 {
            q.put(IngestItem::new(format!("item {i}"), Source::Note));
        }

        let first = q.get_batch(Some(Duration::from_secs(2))).await;
        assert_eq!(first.len(), 5);
        assert_eq!(q.pending_count(), 7);

        // The surplus still exceeds batch_size, so the next call is served
        // without waiting for a new put.
        let second = q.get_batch(Some(Duration::from_secs(2))).await;
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].text, "item 5");
    }
}
