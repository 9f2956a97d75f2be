//! Data model for the classification pipeline.
//!
//! An [`IngestItem`] is a raw signal captured by a producer; a
//! [`ClassifiedItem`] is the same record after the LLM classifier has
//! attached a category, tags, importance, summary, and optional task action.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Source
// ─────────────────────────────────────────────────────────────────────────────

/// Where an item was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Note,
    Clipboard,
    Browser,
    File,
    Terminal,
    ClaudeCode,
    InputMethod,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Note => "note",
            Source::Clipboard => "clipboard",
            Source::Browser => "browser",
            Source::File => "file",
            Source::Terminal => "terminal",
            Source::ClaudeCode => "claude-code",
            Source::InputMethod => "input-method",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(Source::Note),
            "clipboard" => Ok(Source::Clipboard),
            "browser" => Ok(Source::Browser),
            "file" => Ok(Source::File),
            "terminal" => Ok(Source::Terminal),
            "claude-code" => Ok(Source::ClaudeCode),
            "input-method" => Ok(Source::InputMethod),
            _ => Err(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Category
// ─────────────────────────────────────────────────────────────────────────────

/// Classification category. Exactly one per classified item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coding,
    Work,
    Learning,
    Communication,
    Browsing,
    Life,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Coding => "coding",
            Category::Work => "work",
            Category::Learning => "learning",
            Category::Communication => "communication",
            Category::Browsing => "browsing",
            Category::Life => "life",
        }
    }

    /// Rule-based category used when the LLM result is unusable.
    pub fn fallback_for(source: Source) -> Category {
        match source {
            Source::Terminal | Source::ClaudeCode => Category::Coding,
            Source::Browser => Category::Browsing,
            Source::InputMethod => Category::Communication,
            _ => Category::Work,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coding" => Ok(Category::Coding),
            "work" => Ok(Category::Work),
            "learning" => Ok(Category::Learning),
            "communication" => Ok(Category::Communication),
            "browsing" => Ok(Category::Browsing),
            "life" => Ok(Category::Life),
            _ => Err(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ActionType
// ─────────────────────────────────────────────────────────────────────────────

/// Task side-effect requested by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    NewTask,
    TaskProgress,
    TaskDone,
}

impl FromStr for ActionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_task" => Ok(ActionType::NewTask),
            "task_progress" => Ok(ActionType::TaskProgress),
            "task_done" => Ok(ActionType::TaskDone),
            _ => Err(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ItemMeta
// ─────────────────────────────────────────────────────────────────────────────

/// Source-specific metadata, typed per source rather than an opaque map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ItemMeta {
    #[default]
    None,
    Browser {
        url: String,
        title: String,
        browser: String,
    },
    File {
        path: String,
        action: String,
        filename: String,
    },
    Terminal {
        /// Number of shell commands folded into this item.
        count: usize,
    },
    InputMethod {
        /// Character count of the captured text before formatting.
        raw_length: usize,
    },
}

impl ItemMeta {
    /// Flatten into string pairs for status surfaces and log fields.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        match self {
            ItemMeta::None => {}
            ItemMeta::Browser {
                url,
                title,
                browser,
            } => {
                map.insert("url".to_string(), url.clone());
                map.insert("title".to_string(), title.clone());
                map.insert("browser".to_string(), browser.clone());
            }
            ItemMeta::File {
                path,
                action,
                filename,
            } => {
                map.insert("path".to_string(), path.clone());
                map.insert("action".to_string(), action.clone());
                map.insert("filename".to_string(), filename.clone());
            }
            ItemMeta::Terminal { count } => {
                map.insert("count".to_string(), count.to_string());
            }
            ItemMeta::InputMethod { raw_length } => {
                map.insert("raw_length".to_string(), raw_length.to_string());
            }
        }
        map
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────────────────────────

/// Raw item captured from any source before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestItem {
    pub text: String,
    pub source: Source,
    pub timestamp: DateTime<Local>,
    #[serde(default)]
    pub meta: ItemMeta,
}

impl IngestItem {
    /// Create an item stamped with the current local time.
    pub fn new(text: impl Into<String>, source: Source) -> Self {
        Self {
            text: text.into(),
            source,
            timestamp: Local::now(),
            meta: ItemMeta::None,
        }
    }

    pub fn with_meta(mut self, meta: ItemMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// An [`IngestItem`] after passing through the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedItem {
    #[serde(flatten)]
    pub item: IngestItem,
    pub category: Category,
    pub tags: Vec<String>,
    pub importance: u8,
    pub summary: String,
    pub action_type: Option<ActionType>,
    pub action_detail: Option<String>,
    pub related_todo_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for s in [
            Source::Note,
            Source::Clipboard,
            Source::Browser,
            Source::File,
            Source::Terminal,
            Source::ClaudeCode,
            Source::InputMethod,
        ] {
            assert_eq!(s.as_str().parse::<Source>().unwrap(), s);
        }
    }

    #[test]
    fn test_source_serde_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Source::ClaudeCode).unwrap(),
            "\"claude-code\""
        );
        assert_eq!(
            serde_json::from_str::<Source>("\"input-method\"").unwrap(),
            Source::InputMethod
        );
    }

    #[test]
    fn test_category_fallback_table() {
        assert_eq!(Category::fallback_for(Source::Terminal), Category::Coding);
        assert_eq!(Category::fallback_for(Source::Browser), Category::Browsing);
        assert_eq!(Category::fallback_for(Source::ClaudeCode), Category::Coding);
        assert_eq!(
            Category::fallback_for(Source::InputMethod),
            Category::Communication
        );
        assert_eq!(Category::fallback_for(Source::Note), Category::Work);
        assert_eq!(Category::fallback_for(Source::Clipboard), Category::Work);
    }

    #[test]
    fn test_action_type_from_str() {
        assert_eq!("new_task".parse::<ActionType>(), Ok(ActionType::NewTask));
        assert_eq!(
            "task_progress".parse::<ActionType>(),
            Ok(ActionType::TaskProgress)
        );
        assert_eq!("task_done".parse::<ActionType>(), Ok(ActionType::TaskDone));
        assert!("update_task".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_meta_to_map() {
        let meta = ItemMeta::Browser {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            browser: "chrome".to_string(),
        };
        let map = meta.to_map();
        assert_eq!(map.get("url").unwrap(), "https://example.com");
        assert_eq!(map.get("browser").unwrap(), "chrome");
        assert!(ItemMeta::None.to_map().is_empty());
    }
}
