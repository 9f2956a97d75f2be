//! LLM-powered batch classifier.
//!
//! Builds a single prompt for a batch of ingest items, calls the backend,
//! and parses the strict-JSON response. Every failure path — network,
//! timeout, invalid JSON, length mismatch, malformed element — degrades to
//! rule-based fallback for the affected indices. The classifier never fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use soul_ingest::{ActionType, Category, ClassifiedItem, IngestItem};
use soul_llm::{ChatRequest, SharedBackend};

use crate::todo::TodoSummary;

const SYSTEM_PROMPT: &str = "You are a classification engine for a personal activity agent. \
Classify each item into exactly one category and respond with JSON only, \
no prose and no markdown fences.";

const MAX_TOKENS: u32 = 1024;

/// Matches a fenced code block, optionally tagged `json`.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?\s*```").unwrap()
});

/// Batch classifier over an LLM backend.
pub struct Classifier {
    backend: SharedBackend,
    fallback_total: AtomicU64,
}

impl Classifier {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            fallback_total: AtomicU64::new(0),
        }
    }

    /// Number of items that have taken the rule-based fallback so far.
    pub fn fallback_count(&self) -> u64 {
        self.fallback_total.load(Ordering::Relaxed)
    }

    /// Classify a batch. Returns exactly `items.len()` results, index-aligned
    /// with the input.
    pub async fn classify(
        &self,
        items: &[IngestItem],
        active_todos: &[TodoSummary],
    ) -> Vec<ClassifiedItem> {
        if items.is_empty() {
            return Vec::new();
        }

        let prompt = build_prompt(items, active_todos);
        let request = ChatRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(MAX_TOKENS);

        let raw = match self.backend.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "LLM call failed, using fallback");
                String::new()
            }
        };

        let parsed = parse_response(&raw, items.len());
        if parsed.is_none() && !raw.is_empty() {
            debug!(len = raw.len(), "Unusable classifier response");
        }

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let entry = parsed.as_ref().and_then(|v| v.get(i));
                let (classified, fell_back) = classify_one(item, entry);
                if fell_back {
                    self.fallback_total.fetch_add(1, Ordering::Relaxed);
                }
                classified
            })
            .collect()
    }
}

/// Build the batch prompt: active to-dos as JSON, then one line per item.
fn build_prompt(items: &[IngestItem], active_todos: &[TodoSummary]) -> String {
    let todo_context = if active_todos.is_empty() {
        "No active todos.".to_string()
    } else {
        format!(
            "Active todos (JSON):\n{}",
            serde_json::to_string(active_todos).unwrap_or_else(|_| "[]".to_string())
        )
    };

    let items_block = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. [{}, {}] {}",
                i + 1,
                item.source,
                item.timestamp.format("%H:%M"),
                item.text.replace('\n', " ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Classify each of the following items. For every item return a JSON object with:\n\
         - \"category\": one of browsing, coding, communication, learning, life, work\n\
         - \"tags\": list of up to 5 short keyword strings\n\
         - \"importance\": integer 1-5 (1=trivial, 5=critical)\n\
         - \"summary\": short summary, at most 30 characters\n\
         - \"action_type\": null, \"new_task\", \"task_progress\", or \"task_done\"\n\
         - \"action_detail\": string or null, required when action_type is set\n\
         - \"related_todo_id\": string or null, id of an existing todo this item advances\n\
         \n\
         Return a JSON array with exactly {count} objects (one per item, same order).\n\
         \n\
         {todo_context}\n\
         \n\
         Items:\n\
         {items_block}\n",
        count = items.len(),
    )
}

/// Parse the LLM response into per-item JSON values.
///
/// Handles optional markdown fences. Returns `None` on any parse failure,
/// non-array payload, or count mismatch — the whole batch then falls back.
fn parse_response(raw: &str, count: usize) -> Option<Vec<Value>> {
    let mut text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let captured;
    if let Some(m) = FENCE_RE.captures(text) {
        captured = m.get(1)?.as_str().trim().to_string();
        text = &captured;
    }

    let parsed: Value = serde_json::from_str(text).ok()?;
    let Value::Array(entries) = parsed else {
        return None;
    };
    if entries.len() != count {
        return None;
    }
    Some(entries)
}

/// Classify a single item from its (possibly absent) JSON entry.
///
/// Returns the classified item and whether the rule-based fallback was used.
fn classify_one(item: &IngestItem, entry: Option<&Value>) -> (ClassifiedItem, bool) {
    let Some(Value::Object(obj)) = entry else {
        return (fallback_classify(item), true);
    };

    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Category>().ok())
        .unwrap_or_else(|| Category::fallback_for(item.source));

    let tags: Vec<String> = obj
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .take(5)
                .collect()
        })
        .unwrap_or_default();

    let importance = obj
        .get("importance")
        .and_then(Value::as_i64)
        .map(|v| v.clamp(1, 5) as u8)
        .unwrap_or(3);

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| truncate_chars(s, 30))
        .unwrap_or_default();

    let action_type = obj
        .get("action_type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<ActionType>().ok());

    let action_detail = obj
        .get("action_detail")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    // An action without a detail is unusable; drop both.
    let (action_type, action_detail) = match (action_type, action_detail) {
        (Some(kind), Some(detail)) => (Some(kind), Some(detail)),
        _ => (None, None),
    };

    let related_todo_id = obj
        .get("related_todo_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    (
        ClassifiedItem {
            item: item.clone(),
            category,
            tags,
            importance,
            summary,
            action_type,
            action_detail,
            related_todo_id,
        },
        false,
    )
}

/// Rule-based classification used when the LLM result is unusable.
fn fallback_classify(item: &IngestItem) -> ClassifiedItem {
    ClassifiedItem {
        item: item.clone(),
        category: Category::fallback_for(item.source),
        tags: Vec::new(),
        importance: 3,
        summary: truncate_chars(&item.text, 30),
        action_type: None,
        action_detail: None,
        related_todo_id: None,
    }
}

/// Truncate to at most `n` characters on a char boundary.
fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use soul_ingest::Source;
    use soul_llm::MockBackend;

    fn item(text: &str, source: Source) -> IngestItem {
        IngestItem::new(text, source)
    }

    #[tokio::test]
    async fn test_fallback_on_failed_backend() {
        let classifier = Classifier::new(Arc::new(MockBackend::failing()));
        let items = vec![item("git status", Source::Terminal)];

        let results = classifier.classify(&items, &[]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, Category::Coding);
        assert_eq!(results[0].importance, 3);
        assert_eq!(results[0].summary, "git status");
        assert!(results[0].tags.is_empty());
        assert!(results[0].action_type.is_none());
        assert_eq!(classifier.fallback_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_falls_back() {
        let classifier = Classifier::new(Arc::new(MockBackend::with_text("")));
        let items = vec![item("reading docs", Source::Browser)];

        let results = classifier.classify(&items, &[]).await;
        assert_eq!(results[0].category, Category::Browsing);
    }

    #[tokio::test]
    async fn test_valid_response_applied() {
        let response = r#"[{"category":"learning","tags":["rust","async"],
            "importance":4,"summary":"Read tokio docs","action_type":null,
            "action_detail":null,"related_todo_id":null}]"#;
        let classifier = Classifier::new(Arc::new(MockBackend::with_text(response)));
        let items = vec![item("tokio tutorial", Source::Browser)];

        let results = classifier.classify(&items, &[]).await;
        assert_eq!(results[0].category, Category::Learning);
        assert_eq!(results[0].tags, vec!["rust", "async"]);
        assert_eq!(results[0].importance, 4);
        assert_eq!(results[0].summary, "Read tokio docs");
        assert_eq!(classifier.fallback_count(), 0);
    }

    #[tokio::test]
    async fn test_fenced_response_is_stripped() {
        let response = "```json\n[{\"category\":\"coding\",\"importance\":2}]\n```";
        let classifier = Classifier::new(Arc::new(MockBackend::with_text(response)));
        let items = vec![item("fn main() {}", Source::Clipboard)];

        let results = classifier.classify(&items, &[]).await;
        assert_eq!(results[0].category, Category::Coding);
        assert_eq!(results[0].importance, 2);
    }

    #[tokio::test]
    async fn test_length_mismatch_degrades_whole_batch() {
        let response = r#"[{"category":"coding"}]"#;
        let classifier = Classifier::new(Arc::new(MockBackend::with_text(response)));
        let items = vec![
            item("one", Source::Note),
            item("two", Source::Terminal),
        ];

        let results = classifier.classify(&items, &[]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].category, Category::Work);
        assert_eq!(results[1].category, Category::Coding);
        assert_eq!(classifier.fallback_count(), 2);
    }

    #[tokio::test]
    async fn test_object_response_is_rejected() {
        let classifier = Classifier::new(Arc::new(MockBackend::with_text(
            r#"{"category":"coding"}"#,
        )));
        let items = vec![item("something", Source::Note)];

        let results = classifier.classify(&items, &[]).await;
        assert_eq!(results[0].category, Category::Work);
        assert_eq!(classifier.fallback_count(), 1);
    }

    #[tokio::test]
    async fn test_field_coercion() {
        let response = r#"[{"category":"nonsense","tags":["a","b","c","d","e","f","g"],
            "importance":99,
            "summary":"this summary is much longer than thirty characters total",
            "action_type":"update_task","action_detail":"x"}]"#;
        let classifier = Classifier::new(Arc::new(MockBackend::with_text(response)));
        let items = vec![item("hello", Source::Terminal)];

        let results = classifier.classify(&items, &[]).await;
        // Unknown category falls back by source; other LLM fields are kept.
        assert_eq!(results[0].category, Category::Coding);
        assert_eq!(results[0].tags.len(), 5);
        assert_eq!(results[0].importance, 5);
        assert_eq!(results[0].summary.chars().count(), 30);
        // Unknown action_type is dropped.
        assert!(results[0].action_type.is_none());
    }

    #[tokio::test]
    async fn test_action_without_detail_is_dropped() {
        let response =
            r#"[{"category":"work","action_type":"new_task","action_detail":null}]"#;
        let classifier = Classifier::new(Arc::new(MockBackend::with_text(response)));
        let items = vec![item("plan the week", Source::Note)];

        let results = classifier.classify(&items, &[]).await;
        assert!(results[0].action_type.is_none());
        assert!(results[0].action_detail.is_none());
    }

    #[tokio::test]
    async fn test_prompt_embeds_todos_and_items() {
        let backend = Arc::new(MockBackend::with_text("[]"));
        let classifier = Classifier::new(backend.clone());
        let todos = vec![TodoSummary {
            id: "abcd1234".to_string(),
            text: "write weekly report".to_string(),
        }];
        let items = vec![item("follow up on report", Source::Note)];

        classifier.classify(&items, &todos).await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("abcd1234"));
        assert!(requests[0].prompt.contains("1. [note,"));
        assert!(requests[0].prompt.contains("follow up on report"));
        assert_eq!(requests[0].max_tokens, 1024);
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("写本周周报并发给经理", 4), "写本周周");
        assert_eq!(truncate_chars("short", 30), "short");
    }
}
