//! Frontmatter codec — the `---`-delimited `key: value` header of every
//! vault file, plus the typed helpers layered on top of it (classification,
//! lifecycle, activity log).
//!
//! The grammar is deliberately loose: values are everything up to the
//! newline, trimmed. Files are human-editable and the codec must tolerate
//! edits that preserve this contract.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Frontmatter fields as a flat string map.
pub type Fields = HashMap<String, String>;

/// Canonical emission order for known keys. Unknown keys are appended after
/// these, sorted lexicographically, so `build(parse(x))` is deterministic.
const CANONICAL_ORDER: &[&str] = &[
    "id",
    "type",
    "priority",
    "status",
    "category",
    "tags",
    "importance",
    "created",
    "expires",
    "last_activity",
    "activity_log",
    "auto_detected",
    "date",
];

// ─────────────────────────────────────────────────────────────────────────────
// Priority
// ─────────────────────────────────────────────────────────────────────────────

/// Resource priority. Lower is more important; the ordering is used when
/// listing to-dos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    /// Days until a resource of this priority expires. `None` never expires.
    pub fn ttl_days(self) -> Option<u64> {
        match self {
            Priority::P0 => None,
            Priority::P1 => Some(30),
            Priority::P2 => Some(14),
            Priority::P3 => Some(7),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "P0" => Ok(Priority::P0),
            "P1" => Ok(Priority::P1),
            "P2" => Ok(Priority::P2),
            "P3" => Ok(Priority::P3),
            _ => Err(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parse / build
// ─────────────────────────────────────────────────────────────────────────────

/// Parse frontmatter from markdown content.
///
/// Returns `(fields, body)`. Input without a leading `---` is all body with
/// empty fields.
pub fn parse(content: &str) -> (Fields, String) {
    if !content.starts_with("---") {
        return (Fields::new(), content.to_string());
    }

    let mut parts = content.splitn(3, "---");
    parts.next(); // leading empty segment
    let (Some(header), Some(body)) = (parts.next(), parts.next()) else {
        return (Fields::new(), content.to_string());
    };

    let mut fields = Fields::new();
    for line in header.trim().lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    (fields, body.trim().to_string())
}

/// Build a markdown document with frontmatter.
///
/// Known keys are emitted in canonical order, unknown keys after them in
/// lexicographic order.
pub fn build(fields: &Fields, body: &str) -> String {
    let mut out = String::from("---\n");

    for key in CANONICAL_ORDER {
        if let Some(value) = fields.get(*key) {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    let mut extra: Vec<&String> = fields
        .keys()
        .filter(|k| !CANONICAL_ORDER.contains(&k.as_str()))
        .collect();
    extra.sort();
    for key in extra {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&fields[key]);
        out.push('\n');
    }

    out.push_str("---\n");
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Set classification fields. Tags serialize comma-joined.
pub fn add_classification(fields: &mut Fields, category: &str, tags: &[String], importance: u8) {
    fields.insert("category".to_string(), category.to_string());
    fields.insert("tags".to_string(), tags.join(","));
    fields.insert("importance".to_string(), importance.to_string());
}

/// Set lifecycle fields: `priority`, `created`, and `expires` per the
/// priority's TTL. P0 resources carry no `expires`.
pub fn add_lifecycle(fields: &mut Fields, priority: Priority, today: NaiveDate) {
    fields.insert("priority".to_string(), priority.to_string());
    fields.insert("created".to_string(), today.to_string());
    if let Some(days) = priority.ttl_days() {
        if let Some(expires) = today.checked_add_days(Days::new(days)) {
            fields.insert("expires".to_string(), expires.to_string());
        }
    }
}

/// Whether a resource has passed its `expires` date. P0 never expires;
/// unparseable dates are treated as not expired.
pub fn is_expired(fields: &Fields, today: NaiveDate) -> bool {
    if fields.get("priority").map(String::as_str) == Some("P0") {
        return false;
    }
    fields
        .get("expires")
        .and_then(|raw| NaiveDate::from_str(raw).ok())
        .is_some_and(|expires| today > expires)
}

/// Parse a comma-separated tags value.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Activity log
// ─────────────────────────────────────────────────────────────────────────────

/// One day of recorded activity on a to-do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub date: NaiveDate,
    pub count: u32,
    pub sources: Vec<String>,
}

/// Record one unit of activity for `date` from `source`.
///
/// A duplicate date increments its count and unions the source; a new date is
/// inserted keeping entries date-ordered. `last_activity` is kept equal to
/// the maximum date present.
pub fn add_activity_entry(fields: &mut Fields, date: NaiveDate, source: &str) {
    let raw = fields.get("activity_log").map(String::as_str).unwrap_or("");
    let mut entries = parse_activity_log(raw);

    match entries.iter_mut().find(|e| e.date == date) {
        Some(entry) => {
            entry.count += 1;
            if !entry.sources.iter().any(|s| s == source) {
                entry.sources.push(source.to_string());
            }
        }
        None => {
            let entry = ActivityEntry {
                date,
                count: 1,
                sources: vec![source.to_string()],
            };
            let pos = entries.partition_point(|e| e.date < date);
            entries.insert(pos, entry);
        }
    }

    fields.insert("activity_log".to_string(), serialize_activity(&entries));
    if let Some(max) = entries.iter().map(|e| e.date).max() {
        fields.insert("last_activity".to_string(), max.to_string());
    }
}

/// Parse the `YYYY-MM-DD:N:src1,src2|...` encoding. Malformed segments are
/// skipped; an empty string yields no entries.
pub fn parse_activity_log(raw: &str) -> Vec<ActivityEntry> {
    let mut entries = Vec::new();
    for part in raw.split('|') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut segments = part.splitn(3, ':');
        let (Some(date), Some(count), Some(sources)) =
            (segments.next(), segments.next(), segments.next())
        else {
            continue;
        };
        let Ok(date) = NaiveDate::from_str(date) else {
            continue;
        };
        let Ok(count) = count.parse::<u32>() else {
            continue;
        };
        entries.push(ActivityEntry {
            date,
            count,
            sources: sources
                .split(',')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        });
    }
    entries
}

fn serialize_activity(entries: &[ActivityEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}:{}:{}", e.date, e.count, e.sources.join(",")))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let (fields, body) = parse("just some text");
        assert!(fields.is_empty());
        assert_eq!(body, "just some text");
    }

    #[test]
    fn test_parse_with_frontmatter() {
        let (fields, body) = parse("---\nid: abc12345\npriority: P2\n---\nTask body");
        assert_eq!(fields.get("id").unwrap(), "abc12345");
        assert_eq!(fields.get("priority").unwrap(), "P2");
        assert_eq!(body, "Task body");
    }

    #[test]
    fn test_parse_keeps_dashes_in_body() {
        let (fields, body) = parse("---\nid: x\n---\nline\n---\nmore");
        assert_eq!(fields.get("id").unwrap(), "x");
        assert!(body.contains("---"));
    }

    #[test]
    fn test_build_canonical_key_order() {
        let mut fields = Fields::new();
        fields.insert("date".to_string(), "2026-03-01".to_string());
        fields.insert("id".to_string(), "abc12345".to_string());
        fields.insert("zebra".to_string(), "1".to_string());
        fields.insert("alpha".to_string(), "2".to_string());
        fields.insert("priority".to_string(), "P1".to_string());

        let doc = build(&fields, "body");
        let id_pos = doc.find("id:").unwrap();
        let priority_pos = doc.find("priority:").unwrap();
        let date_pos = doc.find("date:").unwrap();
        let alpha_pos = doc.find("alpha:").unwrap();
        let zebra_pos = doc.find("zebra:").unwrap();

        assert!(id_pos < priority_pos);
        assert!(priority_pos < date_pos);
        // Unknown keys after known ones, lexicographic.
        assert!(date_pos < alpha_pos);
        assert!(alpha_pos < zebra_pos);
    }

    #[test]
    fn test_build_parse_round_trip() {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), "deadbeef".to_string());
        fields.insert("status".to_string(), "active".to_string());
        fields.insert("custom".to_string(), "value".to_string());
        let body = "Line one\nLine two";

        let (parsed_fields, parsed_body) = parse(&build(&fields, body));
        assert_eq!(parsed_fields, fields);
        assert_eq!(parsed_body, body);

        // Idempotent: building again yields the identical document.
        assert_eq!(
            build(&parsed_fields, &parsed_body),
            build(&fields, body)
        );
    }

    #[test]
    fn test_priority_ttl_table() {
        assert_eq!(Priority::P0.ttl_days(), None);
        assert_eq!(Priority::P1.ttl_days(), Some(30));
        assert_eq!(Priority::P2.ttl_days(), Some(14));
        assert_eq!(Priority::P3.ttl_days(), Some(7));
    }

    #[test]
    fn test_add_lifecycle_sets_expiry() {
        let mut fields = Fields::new();
        add_lifecycle(&mut fields, Priority::P2, date("2026-03-01"));

        assert_eq!(fields.get("priority").unwrap(), "P2");
        assert_eq!(fields.get("created").unwrap(), "2026-03-01");
        assert_eq!(fields.get("expires").unwrap(), "2026-03-15");
    }

    #[test]
    fn test_add_lifecycle_p0_never_expires() {
        let mut fields = Fields::new();
        add_lifecycle(&mut fields, Priority::P0, date("2026-03-01"));
        assert!(!fields.contains_key("expires"));
        assert!(!is_expired(&fields, date("2099-01-01")));
    }

    #[test]
    fn test_is_expired() {
        let mut fields = Fields::new();
        add_lifecycle(&mut fields, Priority::P3, date("2026-03-01"));
        assert!(!is_expired(&fields, date("2026-03-08")));
        assert!(is_expired(&fields, date("2026-03-09")));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("a, b ,c"), vec!["a", "b", "c"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn test_activity_entry_added_and_parsed() {
        let mut fields = Fields::new();
        add_activity_entry(&mut fields, date("2026-03-01"), "terminal");

        let entries = parse_activity_log(fields.get("activity_log").unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, date("2026-03-01"));
        assert_eq!(entries[0].count, 1);
        assert_eq!(entries[0].sources, vec!["terminal"]);
        assert_eq!(fields.get("last_activity").unwrap(), "2026-03-01");
    }

    #[test]
    fn test_activity_duplicate_date_increments_without_duplicating_source() {
        let mut fields = Fields::new();
        add_activity_entry(&mut fields, date("2026-03-01"), "terminal");
        add_activity_entry(&mut fields, date("2026-03-01"), "terminal");
        add_activity_entry(&mut fields, date("2026-03-01"), "browser");

        let entries = parse_activity_log(fields.get("activity_log").unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].count, 3);
        assert_eq!(entries[0].sources, vec!["terminal", "browser"]);
    }

    #[test]
    fn test_activity_entries_stay_date_ordered() {
        let mut fields = Fields::new();
        add_activity_entry(&mut fields, date("2026-03-05"), "note");
        add_activity_entry(&mut fields, date("2026-03-01"), "terminal");
        add_activity_entry(&mut fields, date("2026-03-03"), "browser");

        let entries = parse_activity_log(fields.get("activity_log").unwrap());
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(
            dates,
            vec![date("2026-03-01"), date("2026-03-03"), date("2026-03-05")]
        );
        // last_activity tracks the maximum date, not the latest insertion.
        assert_eq!(fields.get("last_activity").unwrap(), "2026-03-05");
    }

    #[test]
    fn test_activity_log_skips_malformed_segments() {
        let entries = parse_activity_log("2026-03-01:2:note|garbage|:::|2026-03-02:1:browser");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_empty_activity_log() {
        assert!(parse_activity_log("").is_empty());
    }
}
