//! Daily-log entry parsing and cleanup.
//!
//! Log lines look like `[09:30] (terminal) [coding] git push`, with the
//! category tag absent on historical files. Before aggregation, noise
//! entries are dropped and repeated browsing visits deduplicated.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Matches `[HH:MM] (source) [category] text` with the category optional.
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2}:\d{2})\]\s+\((\w[\w-]*)\)\s*(?:\[(\w+)\])?\s*(.*)").unwrap()
});

/// Extracts `#tag` markers from entry text.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").unwrap());

/// Finds a URL for browsing dedup.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Noise markers that never make it into a report.
static NOISE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)\.tmp\b", r"(?i)\.crdownload\b", r"~\$", r"\.DS_Store\b"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// One parsed daily-log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// `HH:MM`.
    pub time: String,
    pub source: String,
    /// `uncategorized` when the line predates classification.
    pub category: String,
    pub text: String,
    pub tags: Vec<String>,
}

/// Parse a daily-log body into structured entries. Lines that do not match
/// the entry grammar are skipped.
pub fn parse_entries(body: &str) -> Vec<LogEntry> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let caps = ENTRY_RE.captures(line)?;
            let text = caps.get(4).map_or("", |m| m.as_str()).to_string();
            Some(LogEntry {
                time: caps[1].to_string(),
                source: caps[2].to_string(),
                category: caps
                    .get(3)
                    .map_or("uncategorized", |m| m.as_str())
                    .to_string(),
                tags: TAG_RE
                    .captures_iter(&text)
                    .map(|c| c[1].to_string())
                    .collect(),
                text,
            })
        })
        .collect()
}

/// Drop noise entries and collapse repeated browsing visits to their first
/// occurrence.
pub fn filter_entries(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    let mut seen_urls: Vec<String> = Vec::new();
    entries
        .into_iter()
        .filter(|e| !NOISE_RES.iter().any(|re| re.is_match(&e.text)))
        .filter(|e| {
            if e.source != "browser" {
                return true;
            }
            let key = URL_RE
                .find(&e.text)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| e.text.clone());
            if seen_urls.contains(&key) {
                false
            } else {
                seen_urls.push(key);
                true
            }
        })
        .collect()
}

/// Tag frequencies across entries, most common first, capped at `n`.
pub fn top_tags(entries: &[LogEntry], n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        for tag in &entry.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_with_category() {
        let entries = parse_entries("[09:30] (terminal) [coding] git push origin main");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].time, "09:30");
        assert_eq!(entries[0].source, "terminal");
        assert_eq!(entries[0].category, "coding");
        assert_eq!(entries[0].text, "git push origin main");
    }

    #[test]
    fn test_parse_entry_without_category() {
        let entries = parse_entries("[08:00] (note) remember to stretch");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, "uncategorized");
        assert_eq!(entries[0].text, "remember to stretch");
    }

    #[test]
    fn test_parse_entry_with_dashed_source() {
        let entries = parse_entries("[10:12] (claude-code) [coding] edited consumer.rs");
        assert_eq!(entries[0].source, "claude-code");
    }

    #[test]
    fn test_parse_skips_garbage_lines() {
        let body = "not an entry\n[11:00] (note) [work] real entry\n\n---";
        let entries = parse_entries(body);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_tags_extracted_from_text() {
        let entries = parse_entries("[12:00] (note) [work] planning #roadmap and #q2");
        assert_eq!(entries[0].tags, vec!["roadmap", "q2"]);
    }

    #[test]
    fn test_noise_filtered() {
        let entries = parse_entries(
            "[09:00] (file) [work] [modified] report.tmp\n\
             [09:01] (file) [work] [created] ~$budget.xlsx\n\
             [09:02] (note) [work] real work",
        );
        let filtered = filter_entries(entries);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].text, "real work");
    }

    #[test]
    fn test_browsing_dedup_keeps_first_visit() {
        let entries = parse_entries(
            "[09:00] (browser) [browsing] docs — https://docs.rs/tokio\n\
             [09:05] (browser) [browsing] docs again — https://docs.rs/tokio\n\
             [09:10] (browser) [browsing] other — https://crates.io",
        );
        let filtered = filter_entries(entries);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].time, "09:00");
    }

    #[test]
    fn test_top_tags_ranked() {
        let entries = parse_entries(
            "[09:00] (note) [work] #alpha #beta\n\
             [10:00] (note) [work] #alpha\n\
             [11:00] (note) [work] #gamma #alpha #beta",
        );
        let tags = top_tags(&entries, 2);
        assert_eq!(tags[0], ("alpha".to_string(), 3));
        assert_eq!(tags[1], ("beta".to_string(), 2));
    }
}
