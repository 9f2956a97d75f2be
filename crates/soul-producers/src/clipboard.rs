//! Clipboard poller — samples the system pasteboard and enqueues changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use soul_ingest::{IngestItem, IngestQueue, Source};

/// Seconds between clipboard samples.
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Clipboard text longer than this is truncated before ingest.
const MAX_LENGTH: usize = 10_000;

/// Timeout for one pasteboard read.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// A readable clipboard. Production uses the system pasteboard; tests
/// substitute a scripted source.
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Current clipboard text, or `None` when unavailable.
    async fn read_text(&self) -> Option<String>;
}

/// System pasteboard read via `pbpaste`.
#[derive(Debug, Default)]
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn read_text(&self) -> Option<String> {
        let run = tokio::process::Command::new("pbpaste").output();
        match tokio::time::timeout(READ_TIMEOUT, run).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(_)) | Ok(Err(_)) => None,
            Err(_) => {
                debug!("pbpaste timed out");
                None
            }
        }
    }
}

/// The clipboard polling producer.
pub struct ClipboardPoller {
    queue: Arc<IngestQueue>,
    clipboard: Arc<dyn Clipboard>,
    poll_interval: Duration,
}

impl ClipboardPoller {
    pub fn new(queue: Arc<IngestQueue>, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            queue,
            clipboard,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until cancelled. Emits an item whenever the clipboard text
    /// changes from the last emitted value and is non-empty.
    pub async fn run(self, token: CancellationToken) {
        // Seed with whatever is on the clipboard at startup so pre-existing
        // content is not replayed.
        let mut last_hash = self
            .clipboard
            .read_text()
            .await
            .map(|t| hash_text(&t))
            .unwrap_or_default();

        info!("Clipboard poller started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let Some(text) = self.clipboard.read_text().await else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }

            let hash = hash_text(&text);
            if hash == last_hash {
                continue;
            }
            last_hash = hash;

            let truncated: String = text.chars().take(MAX_LENGTH).collect();
            if !self
                .queue
                .put(IngestItem::new(truncated, Source::Clipboard))
            {
                warn!("Clipboard item dropped by queue");
            }
        }
        info!("Clipboard poller stopped");
    }
}

fn hash_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use soul_ingest::QueueConfig;

    /// A clipboard that replays a script of reads.
    struct ScriptedClipboard {
        reads: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedClipboard {
        fn new(reads: Vec<Option<&str>>) -> Self {
            Self {
                reads: Mutex::new(
                    reads
                        .into_iter()
                        .map(|r| r.map(String::from))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl Clipboard for ScriptedClipboard {
        async fn read_text(&self) -> Option<String> {
            let mut reads = self.reads.lock();
            if reads.is_empty() {
                None
            } else {
                reads.remove(0)
            }
        }
    }

    fn queue() -> Arc<IngestQueue> {
        Arc::new(IngestQueue::new(QueueConfig::default()))
    }

    async fn run_script(reads: Vec<Option<&str>>, polls: usize) -> Arc<IngestQueue> {
        let q = queue();
        let poller = ClipboardPoller::new(q.clone(), Arc::new(ScriptedClipboard::new(reads)))
            .with_poll_interval(Duration::from_millis(1));

        let token = CancellationToken::new();
        let handle = tokio::spawn(poller.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(polls as u64 * 10 + 50)).await;
        token.cancel();
        handle.await.unwrap();
        q
    }

    #[tokio::test]
    async fn test_emits_on_change_only() {
        // First read seeds the hash; "hello" repeated must emit once.
        let q = run_script(
            vec![
                Some("initial"),
                Some("hello clipboard"),
                Some("hello clipboard"),
                Some("another value"),
            ],
            4,
        )
        .await;

        assert_eq!(q.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_skips_empty_and_unavailable() {
        let q = run_script(vec![Some("initial"), None, Some("   "), Some("")], 4).await;
        assert_eq!(q.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_truncates_oversized_text() {
        let big = "x".repeat(MAX_LENGTH + 500);
        let q = run_script(vec![Some("initial"), Some(&big)], 2).await;

        let batch = q.get_batch(Some(Duration::from_millis(50))).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text.chars().count(), MAX_LENGTH);
        assert_eq!(batch[0].source, Source::Clipboard);
    }
}
