//! Filesystem watcher — debounced change events from the user's working
//! folders, with aggressive noise filtering and a short text preview.
//!
//! The `notify` debouncer runs on its own OS thread; events are filtered
//! and pushed straight onto the ingest queue (whose `put` is synchronous),
//! so no async bridge is needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use soul_ingest::{IngestItem, IngestQueue, ItemMeta, Source};

use crate::error::{ProducerError, Result};

/// Debounce window; also keeps previews off files still being written.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Characters of file content included in the item text.
const PREVIEW_CHARS: usize = 500;

/// Directory names whose subtrees are ignored entirely.
const IGNORE_DIRS: &[&str] = &[
    ".git",
    ".obsidian",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "target",
    "dist",
    "build",
    ".idea",
    ".vscode",
];

/// Exact filenames that are always noise.
const IGNORE_FILES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    ".gitkeep",
    "desktop.ini",
    "LOCK",
    "LOG",
    "MANIFEST",
    "CURRENT",
];

/// Extensions treated as binary; no event is emitted for them.
const BINARY_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "gz", "tar", "dmg", "exe", "bin", "iso", "png", "jpg", "jpeg", "gif", "bmp",
    "ico", "svg", "webp", "tiff", "mp3", "mp4", "avi", "mov", "mkv", "wav", "flac", "ogg",
    "woff", "woff2", "ttf", "eot", "pyc", "pyo", "so", "dylib", "dll", "o", "a", "sqlite", "db",
    "tmp", "lock", "crdownload", "part", "download",
];

/// Extensions where a content preview is noise rather than signal.
const SKIP_PREVIEW_EXTENSIONS: &[&str] =
    &["json", "plist", "xml", "yaml", "yml", "csv", "tsv", "log", "out", "map"];

/// Return true when the path should be ignored by the watcher.
pub fn should_ignore(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    if name.trim().is_empty() || IGNORE_FILES.contains(&name) {
        return true;
    }
    // Hidden files, except .env which carries real signal.
    if name.starts_with('.') && name != ".env" {
        return true;
    }
    // Editor temp/swap artifacts.
    if name.contains(".tmp.") || name.ends_with('~') {
        return true;
    }
    if extension(path).is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str())) {
        return true;
    }
    path.components().any(|part| {
        part.as_os_str()
            .to_str()
            .is_some_and(|p| IGNORE_DIRS.contains(&p))
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Read the first [`PREVIEW_CHARS`] characters of a text file.
///
/// Returns an empty string for unreadable files, preview-skipped
/// extensions, and content that looks binary.
pub fn extract_preview(path: &Path) -> String {
    if extension(path).is_some_and(|ext| SKIP_PREVIEW_EXTENSIONS.contains(&ext.as_str())) {
        return String::new();
    }
    let Ok(bytes) = std::fs::read(path) else {
        return String::new();
    };
    if bytes.contains(&0) {
        return String::new();
    }
    let text = String::from_utf8_lossy(&bytes);
    // A replacement char near the front means we mis-guessed the encoding.
    if text.chars().take(50).any(|c| c == '\u{fffd}') {
        return String::new();
    }
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Handle to the running watcher thread. The thread exits once the
/// cancellation token fires.
pub struct WatcherHandle {
    handle: std::thread::JoinHandle<()>,
}

impl WatcherHandle {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Wait for the watcher thread to exit.
    pub fn join(self) {
        let _ = self.handle.join();
    }
}

/// The filesystem watcher producer.
pub struct FileWatcher {
    queue: Arc<IngestQueue>,
    watch_dirs: Vec<PathBuf>,
}

impl FileWatcher {
    pub fn new(queue: Arc<IngestQueue>, watch_dirs: Vec<PathBuf>) -> Self {
        Self { queue, watch_dirs }
    }

    /// Start watching. Non-existent roots are skipped; failing to register
    /// an existing root is an error.
    pub fn start(self, token: CancellationToken) -> Result<WatcherHandle> {
        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer(DEBOUNCE, tx)
            .map_err(|e| ProducerError::WatcherInit(e.to_string()))?;

        let mut watched = 0usize;
        for dir in &self.watch_dirs {
            if !dir.is_dir() {
                debug!(path = %dir.display(), "Skipping non-existent watch dir");
                continue;
            }
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::Recursive)
                .map_err(|e| ProducerError::WatchFailed {
                    path: dir.clone(),
                    error: e.to_string(),
                })?;
            watched += 1;
        }
        info!(dirs = watched, "File watcher started");

        let queue = self.queue;
        let handle = std::thread::Builder::new()
            .name("file-watcher".to_string())
            .spawn(move || {
                // Keep the debouncer alive for the thread's lifetime.
                let _debouncer = debouncer;

                loop {
                    if token.is_cancelled() {
                        break;
                    }
                    match rx.recv_timeout(Duration::from_millis(500)) {
                        Ok(Ok(events)) => {
                            for event in events {
                                handle_event(&queue, &event.path);
                            }
                        }
                        Ok(Err(e)) => warn!(error = ?e, "File watcher error"),
                        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("File watcher thread exiting");
            })
            .map_err(|e| ProducerError::WatcherInit(e.to_string()))?;

        Ok(WatcherHandle { handle })
    }
}

/// Turn one debounced path event into an ingest item.
fn handle_event(queue: &IngestQueue, path: &Path) {
    if should_ignore(path) {
        return;
    }
    // Deletions and directory churn carry no reviewable content.
    if !path.is_file() {
        return;
    }

    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let action = classify_action(path);
    let preview = extract_preview(path);

    let text = if preview.is_empty() {
        format!("[{action}] {filename}")
    } else {
        format!("[{action}] {filename}: {}", preview)
    };

    let accepted = queue.put(
        IngestItem::new(text, Source::File).with_meta(ItemMeta::File {
            path: path.display().to_string(),
            action: action.to_string(),
            filename: filename.to_string(),
        }),
    );
    if accepted {
        debug!(path = %path.display(), action, "File event enqueued");
    }
}

/// The debouncer collapses create+modify bursts, so the action is inferred
/// from file age: something born within two debounce windows is a creation.
fn classify_action(path: &Path) -> &'static str {
    let created_recently = std::fs::metadata(path)
        .and_then(|m| m.created())
        .ok()
        .and_then(|c| c.elapsed().ok())
        .is_some_and(|age| age <= DEBOUNCE * 2);
    if created_recently {
        "created"
    } else {
        "modified"
    }
}
