//! Terminal-command sink.
//!
//! Shell hooks POST individual commands; the sink buffers them per shell
//! session and flushes a combined summary item when a session goes idle
//! for five seconds or accumulates ten commands. Sessions are keyed by an
//! optional token from the hook; hooks that send none share one buffer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use soul_ingest::{IngestItem, IngestQueue, ItemMeta, Source};

/// Commands per session that force a flush.
const FLUSH_COUNT: usize = 10;

/// Idle time after which a session buffer is flushed.
const FLUSH_IDLE: Duration = Duration::from_secs(5);

/// Sweep cadence for idle detection.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Session key used when the hook supplies none.
const DEFAULT_SESSION: &str = "default";

/// One shell command reported by the hook.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminalCmd {
    pub command: String,
    #[serde(default)]
    pub exit_code: i32,
    /// Seconds the command ran.
    #[serde(default)]
    pub duration: u64,
}

struct SessionBuffer {
    cmds: Vec<TerminalCmd>,
    last_push: Instant,
}

/// The terminal-command sink.
pub struct TerminalSink {
    queue: Arc<IngestQueue>,
    buffers: Mutex<HashMap<String, SessionBuffer>>,
    flush_count: usize,
    flush_idle: Duration,
}

impl TerminalSink {
    pub fn new(queue: Arc<IngestQueue>) -> Arc<Self> {
        Arc::new(Self {
            queue,
            buffers: Mutex::new(HashMap::new()),
            flush_count: FLUSH_COUNT,
            flush_idle: FLUSH_IDLE,
        })
    }

    #[cfg(test)]
    fn with_limits(queue: Arc<IngestQueue>, flush_count: usize, flush_idle: Duration) -> Arc<Self> {
        Arc::new(Self {
            queue,
            buffers: Mutex::new(HashMap::new()),
            flush_count,
            flush_idle,
        })
    }

    /// Buffer one command. Returns the session's buffered count after the
    /// push (0 when the push triggered a flush).
    pub fn push(&self, session: Option<String>, cmd: TerminalCmd) -> usize {
        let key = session.unwrap_or_else(|| DEFAULT_SESSION.to_string());

        let to_flush = {
            let mut buffers = self.buffers.lock();
            let buffer = buffers.entry(key.clone()).or_insert_with(|| SessionBuffer {
                cmds: Vec::new(),
                last_push: Instant::now(),
            });
            buffer.cmds.push(cmd);
            buffer.last_push = Instant::now();

            if buffer.cmds.len() >= self.flush_count {
                Some(std::mem::take(&mut buffer.cmds))
            } else {
                return buffer.cmds.len();
            }
        };

        if let Some(cmds) = to_flush {
            self.emit(&key, cmds);
        }
        0
    }

    /// Flush every session idle past the threshold. Called by the sweeper.
    pub fn sweep(&self) {
        let drained: Vec<(String, Vec<TerminalCmd>)> = {
            let mut buffers = self.buffers.lock();
            let idle: Vec<String> = buffers
                .iter()
                .filter(|(_, b)| {
                    !b.cmds.is_empty() && b.last_push.elapsed() >= self.flush_idle
                })
                .map(|(k, _)| k.clone())
                .collect();
            idle.into_iter()
                .filter_map(|k| {
                    let cmds = std::mem::take(&mut buffers.get_mut(&k)?.cmds);
                    Some((k, cmds))
                })
                .collect()
        };

        for (key, cmds) in drained {
            self.emit(&key, cmds);
        }
    }

    /// Flush everything unconditionally (shutdown path).
    pub fn flush_all(&self) {
        let drained: Vec<(String, Vec<TerminalCmd>)> = {
            let mut buffers = self.buffers.lock();
            buffers
                .iter_mut()
                .filter(|(_, b)| !b.cmds.is_empty())
                .map(|(k, b)| (k.clone(), std::mem::take(&mut b.cmds)))
                .collect()
        };
        for (key, cmds) in drained {
            self.emit(&key, cmds);
        }
    }

    /// Run the idle sweeper until cancelled, flushing remaining buffers on
    /// the way out.
    pub async fn run_sweeper(self: Arc<Self>, token: CancellationToken) {
        info!("Terminal sink sweeper started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.flush_all();
                    break;
                }
                _ = tokio::time::sleep(SWEEP_INTERVAL) => self.sweep(),
            }
        }
        info!("Terminal sink sweeper stopped");
    }

    fn emit(&self, session: &str, cmds: Vec<TerminalCmd>) {
        if cmds.is_empty() {
            return;
        }
        let count = cmds.len();
        let lines: Vec<String> = cmds
            .iter()
            .map(|c| format!("$ {} (exit={}, {}s)", c.command, c.exit_code, c.duration))
            .collect();
        let text = format!("Terminal commands:\n{}", lines.join("\n"));

        let accepted = self.queue.put(
            IngestItem::new(text, Source::Terminal).with_meta(ItemMeta::Terminal { count }),
        );
        debug!(session, count, accepted, "Flushed terminal commands");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_ingest::QueueConfig;

    fn cmd(command: &str) -> TerminalCmd {
        TerminalCmd {
            command: command.to_string(),
            exit_code: 0,
            duration: 1,
        }
    }

    fn queue() -> Arc<IngestQueue> {
        Arc::new(IngestQueue::new(QueueConfig::default()))
    }

    #[test]
    fn test_flush_at_command_count() {
        let q = queue();
        let sink = TerminalSink::with_limits(q.clone(), 3, Duration::from_secs(60));

        assert_eq!(sink.push(None, cmd("ls")), 1);
        assert_eq!(sink.push(None, cmd("cd /tmp")), 2);
        // The third command triggers a flush.
        assert_eq!(sink.push(None, cmd("git status")), 0);

        assert_eq!(q.pending_count(), 1);
    }

    #[test]
    fn test_sessions_buffer_independently() {
        let q = queue();
        let sink = TerminalSink::with_limits(q.clone(), 3, Duration::from_secs(60));

        sink.push(Some("a".to_string()), cmd("ls"));
        sink.push(Some("a".to_string()), cmd("pwd"));
        sink.push(Some("b".to_string()), cmd("whoami"));

        // Neither session hit the flush count.
        assert_eq!(q.pending_count(), 0);

        sink.push(Some("a".to_string()), cmd("git log"));
        assert_eq!(q.pending_count(), 1);
    }

    #[test]
    fn test_sweep_flushes_idle_sessions() {
        let q = queue();
        let sink = TerminalSink::with_limits(q.clone(), 100, Duration::from_millis(10));

        sink.push(None, cmd("make build"));
        std::thread::sleep(Duration::from_millis(30));
        sink.sweep();

        assert_eq!(q.pending_count(), 1);
    }

    #[test]
    fn test_sweep_skips_fresh_sessions() {
        let q = queue();
        let sink = TerminalSink::with_limits(q.clone(), 100, Duration::from_secs(60));

        sink.push(None, cmd("make build"));
        sink.sweep();
        assert_eq!(q.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_flushed_item_format() {
        let q = queue();
        let sink = TerminalSink::with_limits(q.clone(), 2, Duration::from_secs(60));

        sink.push(None, cmd("cargo check"));
        sink.push(
            None,
            TerminalCmd {
                command: "cargo test".to_string(),
                exit_code: 101,
                duration: 12,
            },
        );

        let batch = q.get_batch(Some(Duration::from_millis(50))).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].source, Source::Terminal);
        assert!(batch[0].text.starts_with("Terminal commands:"));
        assert!(batch[0].text.contains("$ cargo check (exit=0, 1s)"));
        assert!(batch[0].text.contains("$ cargo test (exit=101, 12s)"));
        assert!(matches!(batch[0].meta, ItemMeta::Terminal { count: 2 }));
    }
}
