//! Daily log — one append-only Markdown file per calendar date.
//!
//! Lines have the form `[HH:MM] (source) [category] text`; the category tag
//! is omitted for unclassified entries and the historical files that predate
//! classification. The date is derived from the *item* timestamp in local
//! time, so an entry captured just before midnight lands in its own day.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use parking_lot::Mutex;
use tracing::debug;

use soul_ingest::Category;
use soul_vault::{frontmatter, VaultDir, VaultStore};

use crate::error::Result;

/// Days of log content kept in the read cache.
const CACHE_DAYS: usize = 3;

#[derive(Default)]
struct ReadCache {
    // date -> raw file content, most recently used last
    entries: HashMap<NaiveDate, String>,
    order: Vec<NaiveDate>,
}

impl ReadCache {
    fn get(&mut self, date: NaiveDate) -> Option<String> {
        let content = self.entries.get(&date)?.clone();
        self.touch(date);
        Some(content)
    }

    fn insert(&mut self, date: NaiveDate, content: String) {
        self.entries.insert(date, content);
        self.touch(date);
        while self.order.len() > CACHE_DAYS {
            let evicted = self.order.remove(0);
            self.entries.remove(&evicted);
        }
    }

    fn evict(&mut self, date: NaiveDate) {
        self.entries.remove(&date);
        self.order.retain(|d| *d != date);
    }

    fn touch(&mut self, date: NaiveDate) {
        self.order.retain(|d| *d != date);
        self.order.push(date);
    }
}

/// The daily log store.
pub struct DailyLog {
    vault: Arc<VaultStore>,
    cache: Mutex<ReadCache>,
    // Per-date append locks so writes to the same file serialize without
    // blocking appends to other dates.
    locks: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
}

impl DailyLog {
    pub fn new(vault: Arc<VaultStore>) -> Self {
        Self {
            vault,
            cache: Mutex::new(ReadCache::default()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn filename(date: NaiveDate) -> String {
        format!("{date}.md")
    }

    fn date_lock(&self, date: NaiveDate) -> Arc<Mutex<()>> {
        self.locks.lock().entry(date).or_default().clone()
    }

    /// Append a timestamped entry to the log for the entry's own date.
    pub fn append(
        &self,
        text: &str,
        source: &str,
        timestamp: DateTime<Local>,
        category: Option<Category>,
        tags: &[String],
        importance: u8,
    ) -> Result<()> {
        let date = timestamp.date_naive();
        let name = Self::filename(date);

        let cat_tag = category
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        let entry = format!(
            "[{}] ({source}){cat_tag} {}",
            timestamp.format("%H:%M"),
            text.replace('\n', " ").trim()
        );

        let lock = self.date_lock(date);
        let _guard = lock.lock();

        let (fields, mut body) = match self.vault.read(VaultDir::Logs, &name) {
            Some(existing) => frontmatter::parse(&existing),
            None => {
                let mut fields = frontmatter::Fields::new();
                fields.insert("priority".to_string(), "P2".to_string());
                fields.insert("date".to_string(), date.to_string());
                if let Some(cat) = category {
                    frontmatter::add_classification(&mut fields, cat.as_str(), tags, importance);
                }
                debug!(%date, "Created daily log");
                (fields, String::new())
            }
        };

        if body.is_empty() {
            body = entry;
        } else {
            body.push('\n');
            body.push_str(&entry);
        }

        self.vault
            .write(VaultDir::Logs, &name, &frontmatter::build(&fields, &body))?;

        // Any append to date D invalidates its cached copy.
        self.cache.lock().evict(date);
        Ok(())
    }

    /// Read the full log document for a date, through the cache.
    pub fn read(&self, date: NaiveDate) -> Option<String> {
        if let Some(cached) = self.cache.lock().get(date) {
            return Some(cached);
        }
        let content = self.vault.read(VaultDir::Logs, &Self::filename(date))?;
        self.cache.lock().insert(date, content.clone());
        Some(content)
    }

    /// Read the body (entries only) for a date.
    pub fn read_body(&self, date: NaiveDate) -> Option<String> {
        self.read(date).map(|content| frontmatter::parse(&content).1)
    }

    /// Dates with an existing log file, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.vault
            .list(VaultDir::Logs)
            .iter()
            .filter_map(|name| name.strip_suffix(".md"))
            .filter_map(|stem| stem.parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, DailyLog) {
        let dir = tempdir().unwrap();
        let vault = VaultStore::open(dir.path().join("vault")).unwrap();
        (dir, DailyLog::new(vault))
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_append_creates_file_with_frontmatter() {
        let (_dir, log) = setup();
        log.append(
            "reviewed the PR",
            "note",
            ts(2026, 3, 1, 9, 30, 0),
            Some(Category::Work),
            &["review".to_string()],
            4,
        )
        .unwrap();

        let content = log.read(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()).unwrap();
        let (fields, body) = frontmatter::parse(&content);
        assert_eq!(fields.get("priority").unwrap(), "P2");
        assert_eq!(fields.get("date").unwrap(), "2026-03-01");
        assert_eq!(fields.get("category").unwrap(), "work");
        assert_eq!(body, "[09:30] (note) [work] reviewed the PR");
    }

    #[test]
    fn test_append_without_category_omits_tag() {
        let (_dir, log) = setup();
        log.append("raw note", "note", ts(2026, 3, 1, 8, 0, 0), None, &[], 3)
            .unwrap();

        let body = log
            .read_body(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
            .unwrap();
        assert_eq!(body, "[08:00] (note) raw note");
    }

    #[test]
    fn test_appends_accumulate_in_order() {
        let (_dir, log) = setup();
        log.append("first", "note", ts(2026, 3, 1, 9, 0, 0), None, &[], 3)
            .unwrap();
        log.append("second", "terminal", ts(2026, 3, 1, 9, 5, 0), Some(Category::Coding), &[], 3)
            .unwrap();

        let body = log
            .read_body(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
            .unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "[09:00] (note) first");
        assert_eq!(lines[1], "[09:05] (terminal) [coding] second");
    }

    #[test]
    fn test_embedded_newlines_flattened() {
        let (_dir, log) = setup();
        log.append("line one\nline two", "clipboard", ts(2026, 3, 1, 9, 0, 0), None, &[], 3)
            .unwrap();

        let body = log
            .read_body(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
            .unwrap();
        assert_eq!(body.lines().count(), 1);
        assert!(body.contains("line one line two"));
    }

    #[test]
    fn test_midnight_rollover_uses_item_timestamp() {
        let (_dir, log) = setup();
        log.append("late entry", "note", ts(2026, 3, 1, 23, 59, 59), None, &[], 3)
            .unwrap();
        log.append("early entry", "note", ts(2026, 3, 2, 0, 0, 0), None, &[], 3)
            .unwrap();

        assert!(log
            .read_body(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
            .unwrap()
            .contains("late entry"));
        assert!(log
            .read_body(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
            .unwrap()
            .contains("early entry"));
    }

    #[test]
    fn test_append_evicts_cached_date() {
        let (_dir, log) = setup();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        log.append("first", "note", ts(2026, 3, 1, 9, 0, 0), None, &[], 3)
            .unwrap();

        // Populate the cache, then append again.
        assert!(log.read(date).is_some());
        log.append("second", "note", ts(2026, 3, 1, 9, 1, 0), None, &[], 3)
            .unwrap();

        // The re-read must observe the new entry, not the cached copy.
        assert!(log.read_body(date).unwrap().contains("second"));
    }

    #[test]
    fn test_cache_bounded_to_three_days() {
        let (_dir, log) = setup();
        for day in 1..=5 {
            log.append("x", "note", ts(2026, 3, day, 9, 0, 0), None, &[], 3)
                .unwrap();
            log.read(NaiveDate::from_ymd_opt(2026, 3, day).unwrap());
        }
        let cache = log.cache.lock();
        assert!(cache.entries.len() <= CACHE_DAYS);
    }

    #[test]
    fn test_dates_listing() {
        let (_dir, log) = setup();
        log.append("a", "note", ts(2026, 3, 2, 9, 0, 0), None, &[], 3)
            .unwrap();
        log.append("b", "note", ts(2026, 3, 1, 9, 0, 0), None, &[], 3)
            .unwrap();

        assert_eq!(
            log.dates(),
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
            ]
        );
    }
}
