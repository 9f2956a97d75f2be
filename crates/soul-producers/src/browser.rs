//! Browser history poller — reads Chrome and Safari SQLite history.
//!
//! Browsers hold write locks on their databases, so each poll copies the
//! file to a temp location and opens the copy read-only. Incremental
//! cursors (one per browser) ensure each visit is emitted once per process
//! lifetime.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use rusqlite::{Connection, OpenFlags};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use soul_ingest::{IngestItem, IngestQueue, ItemMeta, Source};

/// Seconds between history polls.
const POLL_INTERVAL: Duration = Duration::from_secs(300);

/// URL prefixes that never reach the queue.
const SKIP_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "about:",
    "blob:",
    "data:",
    "devtools://",
    "edge://",
    "file://",
    "safari-resource://",
];

/// File extensions that mark a URL as a binary download.
const BINARY_URL_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".gz", ".tar", ".dmg", ".exe", ".bin", ".png", ".jpg", ".jpeg", ".gif",
    ".bmp", ".ico", ".svg", ".webp", ".mp3", ".mp4", ".avi", ".mov", ".mkv", ".wav", ".flac",
    ".woff", ".woff2", ".ttf", ".eot",
];

// Chrome stores visit times as microseconds since 1601-01-01 (FILETIME).
const CHROME_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

// Safari stores visit times as seconds since 2001-01-01 (Core Data).
const SAFARI_EPOCH_OFFSET_SECS: f64 = 978_307_200.0;

/// One history row.
#[derive(Debug, Clone)]
pub struct Visit {
    pub url: String,
    pub title: String,
    /// Unix timestamp, seconds.
    pub visit_time: f64,
}

/// Return true when the URL should be filtered out.
pub fn should_skip_url(url: &str) -> bool {
    if url.is_empty() {
        return true;
    }
    let lower = url.to_lowercase();
    if SKIP_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    // Strip query and fragment before the extension check.
    let path = lower.split(['?', '#']).next().unwrap_or("");
    BINARY_URL_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn chrome_ts_to_unix(chrome_ts: i64) -> f64 {
    (chrome_ts - CHROME_EPOCH_OFFSET_MICROS) as f64 / 1_000_000.0
}

fn unix_to_chrome_ts(unix: f64) -> i64 {
    (unix * 1_000_000.0) as i64 + CHROME_EPOCH_OFFSET_MICROS
}

fn safari_ts_to_unix(safari_ts: f64) -> f64 {
    safari_ts + SAFARI_EPOCH_OFFSET_SECS
}

fn unix_to_safari_ts(unix: f64) -> f64 {
    unix - SAFARI_EPOCH_OFFSET_SECS
}

/// Copy a browser database to a temp file for lock-free reading.
fn copy_db(db_path: &Path) -> Option<tempfile::NamedTempFile> {
    if !db_path.exists() {
        return None;
    }
    let tmp = tempfile::Builder::new().suffix(".sqlite").tempfile().ok()?;
    match std::fs::copy(db_path, tmp.path()) {
        Ok(_) => Some(tmp),
        Err(e) => {
            debug!(path = %db_path.display(), error = %e, "Failed to copy browser DB");
            None
        }
    }
}

/// Read Chrome visits newer than `since_unix`.
pub fn read_chrome_history(db_path: &Path, since_unix: f64) -> Vec<Visit> {
    let Some(tmp) = copy_db(db_path) else {
        return Vec::new();
    };

    let result = (|| -> rusqlite::Result<Vec<Visit>> {
        let conn = Connection::open_with_flags(tmp.path(), OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn.prepare(
            "SELECT u.url, u.title, v.visit_time
             FROM visits v JOIN urls u ON v.url = u.id
             WHERE v.visit_time > ?1
             ORDER BY v.visit_time ASC",
        )?;
        let rows = stmt.query_map([unix_to_chrome_ts(since_unix)], |row| {
            Ok(Visit {
                url: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                visit_time: chrome_ts_to_unix(row.get(2)?),
            })
        })?;
        Ok(rows
            .filter_map(|r| r.ok())
            .filter(|v| !should_skip_url(&v.url))
            .collect())
    })();

    result.unwrap_or_else(|e| {
        debug!(error = %e, "Error reading Chrome history");
        Vec::new()
    })
}

/// Read Safari visits newer than `since_unix`.
pub fn read_safari_history(db_path: &Path, since_unix: f64) -> Vec<Visit> {
    let Some(tmp) = copy_db(db_path) else {
        return Vec::new();
    };

    let result = (|| -> rusqlite::Result<Vec<Visit>> {
        let conn = Connection::open_with_flags(tmp.path(), OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn.prepare(
            "SELECT hi.url, hv.title, hv.visit_time
             FROM history_visits hv JOIN history_items hi ON hv.history_item = hi.id
             WHERE hv.visit_time > ?1
             ORDER BY hv.visit_time ASC",
        )?;
        let rows = stmt.query_map([unix_to_safari_ts(since_unix)], |row| {
            Ok(Visit {
                url: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                visit_time: safari_ts_to_unix(row.get(2)?),
            })
        })?;
        Ok(rows
            .filter_map(|r| r.ok())
            .filter(|v| !should_skip_url(&v.url))
            .collect())
    })();

    result.unwrap_or_else(|e| {
        debug!(error = %e, "Error reading Safari history");
        Vec::new()
    })
}

/// Default Chrome history location (macOS).
pub fn default_chrome_db() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("Library/Application Support/Google/Chrome/Default/History")
}

/// Default Safari history location (macOS).
pub fn default_safari_db() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("Library/Safari/History.db")
}

/// The browser history polling producer.
pub struct BrowserPoller {
    queue: Arc<IngestQueue>,
    chrome_db: PathBuf,
    safari_db: PathBuf,
    poll_interval: Duration,
}

impl BrowserPoller {
    pub fn new(queue: Arc<IngestQueue>) -> Self {
        Self {
            queue,
            chrome_db: default_chrome_db(),
            safari_db: default_safari_db(),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_chrome_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_db = path.into();
        self
    }

    pub fn with_safari_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.safari_db = path.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until cancelled. Cursors start at "now": only visits made while
    /// the daemon is alive are captured.
    pub async fn run(self, token: CancellationToken) {
        let now = Local::now().timestamp() as f64;
        let mut chrome_cursor = now;
        let mut safari_cursor = now;

        info!("Browser history poller started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            chrome_cursor = self.poll_once("chrome", &self.chrome_db, chrome_cursor, read_chrome_history);
            safari_cursor = self.poll_once("safari", &self.safari_db, safari_cursor, read_safari_history);
        }
        info!("Browser history poller stopped");
    }

    /// Poll one browser, enqueue its new visits, and return the advanced
    /// cursor.
    fn poll_once(
        &self,
        browser: &str,
        db: &Path,
        cursor: f64,
        reader: fn(&Path, f64) -> Vec<Visit>,
    ) -> f64 {
        let visits = reader(db, cursor);
        if visits.is_empty() {
            return cursor;
        }

        let mut max_seen = cursor;
        for visit in &visits {
            max_seen = max_seen.max(visit.visit_time);
            let text = format!("{} — {}", visit.title, visit.url);
            let timestamp = unix_to_local(visit.visit_time);
            let accepted = self.queue.put(
                IngestItem::new(text, Source::Browser)
                    .with_timestamp(timestamp)
                    .with_meta(ItemMeta::Browser {
                        url: visit.url.clone(),
                        title: visit.title.clone(),
                        browser: browser.to_string(),
                    }),
            );
            if !accepted {
                debug!(browser, url = %visit.url, "Browser visit deduplicated or shed");
            }
        }
        debug!(browser, count = visits.len(), "Enqueued browser visits");
        max_seen
    }
}

fn unix_to_local(unix: f64) -> DateTime<Local> {
    Local
        .timestamp_opt(unix as i64, 0)
        .single()
        .unwrap_or_else(Local::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_ingest::QueueConfig;

    #[test]
    fn test_should_skip_url_prefixes() {
        assert!(should_skip_url("chrome://settings"));
        assert!(should_skip_url("about:blank"));
        assert!(should_skip_url("data:image/png;base64,xxx"));
        assert!(should_skip_url("blob:https://example.com/uuid"));
        assert!(should_skip_url("file:///etc/hosts"));
        assert!(should_skip_url("chrome-extension://abcdef/popup.html"));
        assert!(should_skip_url(""));
        assert!(!should_skip_url("https://docs.rs/tokio"));
    }

    #[test]
    fn test_should_skip_binary_downloads() {
        assert!(should_skip_url("https://example.com/report.pdf"));
        assert!(should_skip_url("https://example.com/archive.zip?token=1"));
        assert!(!should_skip_url("https://example.com/page?file=.pdf.html"));
    }

    #[test]
    fn test_chrome_epoch_round_trip() {
        let unix = 1_772_000_000.0;
        let chrome = unix_to_chrome_ts(unix);
        assert!((chrome_ts_to_unix(chrome) - unix).abs() < 1.0);
        // A FILETIME value predating the Unix epoch maps below zero.
        assert!(chrome_ts_to_unix(0) < 0.0);
    }

    #[test]
    fn test_safari_epoch_round_trip() {
        let unix = 1_772_000_000.0;
        assert!((safari_ts_to_unix(unix_to_safari_ts(unix)) - unix).abs() < f64::EPSILON);
        // Core Data zero is 2001-01-01.
        assert_eq!(safari_ts_to_unix(0.0), SAFARI_EPOCH_OFFSET_SECS);
    }

    #[test]
    fn test_missing_db_yields_no_visits() {
        assert!(read_chrome_history(Path::new("/nonexistent/History"), 0.0).is_empty());
        assert!(read_safari_history(Path::new("/nonexistent/History.db"), 0.0).is_empty());
    }

    fn make_chrome_db(dir: &Path) -> PathBuf {
        let path = dir.join("History");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE urls (id INTEGER PRIMARY KEY, url TEXT, title TEXT);
             CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER, visit_time INTEGER);",
        )
        .unwrap();
        path
    }

    fn insert_chrome_visit(path: &Path, id: i64, url: &str, title: &str, unix: f64) {
        let conn = Connection::open(path).unwrap();
        conn.execute(
            "INSERT INTO urls (id, url, title) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, url, title],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO visits (url, visit_time) VALUES (?1, ?2)",
            rusqlite::params![id, unix_to_chrome_ts(unix)],
        )
        .unwrap();
    }

    #[test]
    fn test_chrome_reader_respects_cursor_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_chrome_db(dir.path());
        insert_chrome_visit(&db, 1, "https://docs.rs/tokio", "tokio - Rust", 1000.0);
        insert_chrome_visit(&db, 2, "https://example.com/new", "New page", 2000.0);
        insert_chrome_visit(&db, 3, "chrome://flags", "Flags", 3000.0);

        let visits = read_chrome_history(&db, 1500.0);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].url, "https://example.com/new");
        assert_eq!(visits[0].title, "New page");
        assert!((visits[0].visit_time - 2000.0).abs() < 1.0);
    }

    #[tokio::test]
    async fn test_poll_once_enqueues_and_advances_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let db = make_chrome_db(dir.path());
        insert_chrome_visit(&db, 1, "https://example.com/a", "A", 5000.0);
        insert_chrome_visit(&db, 2, "https://example.com/b", "B", 6000.0);

        let queue = Arc::new(IngestQueue::new(QueueConfig::default()));
        let poller = BrowserPoller::new(queue.clone()).with_chrome_db(&db);

        let cursor = poller.poll_once("chrome", &db, 0.0, read_chrome_history);
        assert!((cursor - 6000.0).abs() < 1.0);
        assert_eq!(queue.pending_count(), 2);

        let batch = queue.get_batch(Some(Duration::from_millis(50))).await;
        assert_eq!(batch[0].text, "A — https://example.com/a");
        assert!(matches!(
            &batch[0].meta,
            ItemMeta::Browser { browser, .. } if browser == "chrome"
        ));

        // Re-polling from the advanced cursor finds nothing new.
        let cursor2 = poller.poll_once("chrome", &db, cursor, read_chrome_history);
        assert_eq!(cursor2, cursor);
        assert_eq!(queue.pending_count(), 0);
    }
}
