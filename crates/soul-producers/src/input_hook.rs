//! Keystroke tap — buffers typed text and flushes it as ingest items.
//!
//! The OS-level event tap is isolated behind [`KeyEventSource`]: the
//! producer consumes a channel of [`KeyEvent`]s and owns all buffering,
//! suppression, and flush policy, so the platform glue stays trivial and
//! the logic is fully testable. On hosts without a usable tap (permission
//! denied, unsupported platform) the producer logs once and disables
//! itself.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use soul_ingest::{IngestItem, IngestQueue, ItemMeta, Source};

/// Buffer is flushed after this much keyboard silence.
const IDLE_FLUSH: Duration = Duration::from_secs(5);

/// Buffers shorter than this are discarded at flush time.
const MIN_FLUSH_LENGTH: usize = 10;

/// One keyboard event as delivered by the platform tap.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    /// Unicode characters produced by the keystroke.
    pub chars: String,
    /// Bundle identifier of the frontmost application.
    pub bundle_id: String,
    /// Whether the focused field is marked secure (password entry).
    pub secure: bool,
}

/// A platform keystroke source: a channel fed by the OS event loop.
pub type KeyEventSource = mpsc::Receiver<KeyEvent>;

/// Obtain the platform keystroke source.
///
/// There is no in-process event tap on this build; the hook degrades
/// silently, which is also what happens on macOS when accessibility
/// permission is denied.
pub fn platform_source() -> Option<KeyEventSource> {
    None
}

/// Accumulates typed characters between flushes.
#[derive(Debug, Default)]
pub struct InputBuffer {
    parts: Vec<String>,
    length: usize,
}

impl InputBuffer {
    pub fn append(&mut self, chars: &str) {
        self.length += chars.chars().count();
        self.parts.push(chars.to_string());
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Drain the buffer. Returns the accumulated text when it reaches the
    /// minimum length, `None` otherwise (content is discarded either way).
    pub fn flush(&mut self) -> Option<String> {
        let text = self.parts.concat();
        let length = self.length;
        self.parts.clear();
        self.length = 0;
        (length >= MIN_FLUSH_LENGTH).then_some(text)
    }
}

/// The keystroke tap producer.
pub struct InputHook {
    queue: Arc<IngestQueue>,
    dedicated_apps: HashSet<String>,
    idle_flush: Duration,
}

impl InputHook {
    pub fn new(queue: Arc<IngestQueue>, dedicated_apps: impl IntoIterator<Item = String>) -> Self {
        Self {
            queue,
            dedicated_apps: dedicated_apps.into_iter().collect(),
            idle_flush: IDLE_FLUSH,
        }
    }

    pub fn with_idle_flush(mut self, idle: Duration) -> Self {
        self.idle_flush = idle;
        self
    }

    /// Run against a key event source until cancelled.
    pub async fn run(self, mut source: KeyEventSource, token: CancellationToken) {
        let mut buffer = InputBuffer::default();
        info!(dedicated = self.dedicated_apps.len(), "Input hook started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.emit(&mut buffer);
                    break;
                }
                _ = tokio::time::sleep(self.idle_flush), if !buffer.is_empty() => {
                    self.emit(&mut buffer);
                }
                event = source.recv() => {
                    match event {
                        Some(event) => {
                            if self.suppressed(&event) {
                                continue;
                            }
                            buffer.append(&event.chars);
                        }
                        None => {
                            // Platform tap went away; flush and stop.
                            self.emit(&mut buffer);
                            break;
                        }
                    }
                }
            }
        }
        info!("Input hook stopped");
    }

    /// Whether capture is suppressed for this event.
    fn suppressed(&self, event: &KeyEvent) -> bool {
        event.secure || self.dedicated_apps.contains(&event.bundle_id)
    }

    fn emit(&self, buffer: &mut InputBuffer) {
        let Some(text) = buffer.flush() else {
            return;
        };
        let raw_length = text.chars().count();
        let accepted = self.queue.put(
            IngestItem::new(format!("Typed text: {text}"), Source::InputMethod)
                .with_meta(ItemMeta::InputMethod { raw_length }),
        );
        if accepted {
            debug!(raw_length, "Flushed typed text");
        }
    }
}

/// Spawn the input hook if a platform source exists; degrade silently
/// otherwise.
pub fn spawn_input_hook(
    queue: Arc<IngestQueue>,
    dedicated_apps: Vec<String>,
    token: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    match platform_source() {
        Some(source) => {
            let hook = InputHook::new(queue, dedicated_apps);
            Some(tokio::spawn(hook.run(source, token)))
        }
        None => {
            warn!("No keystroke source available; input hook disabled");
            None
        }
    }
}
