//! To-do store — task records under `todos/active/` and `todos/done/`.
//!
//! Each task is one Markdown file `task-<id8>.md` whose body is the task
//! description. Ids are the first 8 hex chars of a SHA-256 over the creation
//! text and timestamp, so they are stable and collision-resistant enough for
//! a personal store.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use soul_vault::{frontmatter, ActivityEntry, Priority, VaultDir, VaultStore};

use crate::error::{PipelineError, Result};

/// Default stall window in days.
pub const DEFAULT_STALE_DAYS: u64 = 3;

/// Compact view handed to the classifier prompt.
#[derive(Debug, Clone, Serialize)]
pub struct TodoSummary {
    pub id: String,
    pub text: String,
}

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Active,
    Done,
}

/// Listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoFilter {
    Active,
    Done,
    All,
}

/// A fully parsed task record.
#[derive(Debug, Clone, Serialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub priority: Priority,
    pub status: TodoStatus,
    pub created: Option<NaiveDate>,
    pub last_activity: Option<NaiveDate>,
    pub auto_detected: bool,
    pub activity: Vec<ActivityEntry>,
}

/// The to-do store.
pub struct TodoStore {
    vault: Arc<VaultStore>,
    // Per-id locks so concurrent activity updates to the same task
    // serialize without coupling unrelated tasks.
    id_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TodoStore {
    pub fn new(vault: Arc<VaultStore>) -> Self {
        Self {
            vault,
            id_locks: Mutex::new(HashMap::new()),
        }
    }

    fn id_lock(&self, id8: &str) -> Arc<Mutex<()>> {
        self.id_locks
            .lock()
            .entry(id8.to_string())
            .or_default()
            .clone()
    }

    /// Create a new task. Returns its 8-char hex id.
    pub fn create(&self, text: &str, priority: Priority, auto_detected: bool) -> Result<String> {
        let now = Local::now();
        let id = generate_id(text, &now.to_rfc3339());

        let mut fields = frontmatter::Fields::new();
        fields.insert("id".to_string(), id.clone());
        fields.insert("status".to_string(), "active".to_string());
        fields.insert("auto_detected".to_string(), auto_detected.to_string());
        frontmatter::add_lifecycle(&mut fields, priority, now.date_naive());

        self.vault.write(
            VaultDir::TodosActive,
            &format!("task-{id}.md"),
            &frontmatter::build(&fields, text),
        )?;
        debug!(%id, auto_detected, "Created todo");
        Ok(id)
    }

    /// List tasks, sorted by priority ascending then creation date
    /// descending.
    pub fn list(&self, filter: TodoFilter) -> Vec<TodoItem> {
        let mut todos = Vec::new();
        if matches!(filter, TodoFilter::Active | TodoFilter::All) {
            todos.extend(self.load_dir(VaultDir::TodosActive, TodoStatus::Active));
        }
        if matches!(filter, TodoFilter::Done | TodoFilter::All) {
            todos.extend(self.load_dir(VaultDir::TodosDone, TodoStatus::Done));
        }
        todos.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.created.cmp(&a.created))
        });
        todos
    }

    /// Compact `{id, text}` records for the classifier prompt.
    pub fn active_summaries(&self) -> Vec<TodoSummary> {
        self.list(TodoFilter::Active)
            .into_iter()
            .map(|t| TodoSummary {
                id: t.id,
                text: t.text,
            })
            .collect()
    }

    /// Record activity on the task matching the first 8 chars of `id`.
    /// Returns whether a task was found.
    pub fn record_activity(&self, id: &str, source: &str, date: NaiveDate) -> Result<bool> {
        let id8 = id8(id);
        let lock = self.id_lock(&id8);
        let _guard = lock.lock();

        let Some((name, content)) = self.find_active(&id8) else {
            return Ok(false);
        };

        let (mut fields, body) = frontmatter::parse(&content);
        frontmatter::add_activity_entry(&mut fields, date, source);
        self.vault.write(
            VaultDir::TodosActive,
            &name,
            &frontmatter::build(&fields, &body),
        )?;
        Ok(true)
    }

    /// Move a task from active to done, setting `status: done`.
    pub fn complete(&self, id: &str) -> Result<()> {
        let id8 = id8(id);
        let lock = self.id_lock(&id8);
        let _guard = lock.lock();

        let Some((name, content)) = self.find_active(&id8) else {
            return Err(PipelineError::TodoNotFound(id8));
        };

        let (mut fields, body) = frontmatter::parse(&content);
        fields.insert("status".to_string(), "done".to_string());
        frontmatter::add_activity_entry(&mut fields, Local::now().date_naive(), "done");

        // Write the done copy before removing the active one so a crash in
        // between duplicates rather than loses the task.
        self.vault.write(
            VaultDir::TodosDone,
            &name,
            &frontmatter::build(&fields, &body),
        )?;
        self.vault.delete(VaultDir::TodosActive, &name);
        debug!(id = %id8, "Completed todo");
        Ok(())
    }

    /// Active tasks with no recorded activity for `stale_days` or more.
    ///
    /// Tasks that never saw activity are judged by their creation date.
    pub fn stalled(&self, today: NaiveDate, stale_days: u64) -> Vec<TodoItem> {
        let Some(cutoff) = today.checked_sub_days(Days::new(stale_days)) else {
            return Vec::new();
        };
        self.list(TodoFilter::Active)
            .into_iter()
            .filter(|t| match t.last_activity.or(t.created) {
                Some(last) => last <= cutoff,
                None => false,
            })
            .collect()
    }

    /// Done tasks whose final activity was `today`.
    pub fn done_on(&self, today: NaiveDate) -> Vec<TodoItem> {
        self.list(TodoFilter::Done)
            .into_iter()
            .filter(|t| t.last_activity == Some(today))
            .collect()
    }

    /// Fetch one task by id prefix, active or done.
    pub fn get(&self, id: &str) -> Option<TodoItem> {
        let id8 = id8(id);
        self.list(TodoFilter::All)
            .into_iter()
            .find(|t| t.id.starts_with(&id8))
    }

    fn find_active(&self, id8: &str) -> Option<(String, String)> {
        for name in self.vault.list(VaultDir::TodosActive) {
            let Some(content) = self.vault.read(VaultDir::TodosActive, &name) else {
                continue;
            };
            let (fields, _) = frontmatter::parse(&content);
            if fields.get("id").is_some_and(|v| v.starts_with(id8)) {
                return Some((name, content));
            }
        }
        None
    }

    fn load_dir(&self, dir: VaultDir, status: TodoStatus) -> Vec<TodoItem> {
        self.vault
            .list(dir)
            .into_iter()
            .filter_map(|name| {
                let content = self.vault.read(dir, &name)?;
                match parse_todo(&name, &content, status) {
                    Some(todo) => Some(todo),
                    None => {
                        warn!(%name, dir = %dir, "Skipping malformed todo file");
                        None
                    }
                }
            })
            .collect()
    }
}

/// First 8 chars of a SHA-256 over text + timestamp.
fn generate_id(text: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(timestamp.as_bytes());
    hex::encode(hasher.finalize())[..8].to_string()
}

fn id8(id: &str) -> String {
    id.chars().take(8).collect()
}

fn parse_todo(name: &str, content: &str, status: TodoStatus) -> Option<TodoItem> {
    let (fields, body) = frontmatter::parse(content);
    let id = fields
        .get("id")
        .cloned()
        .or_else(|| {
            name.strip_prefix("task-")
                .and_then(|s| s.strip_suffix(".md"))
                .map(String::from)
        })?;

    let priority = fields
        .get("priority")
        .and_then(|p| Priority::from_str(p).ok())
        .unwrap_or(Priority::P2);

    let activity = fields
        .get("activity_log")
        .map(|raw| frontmatter::parse_activity_log(raw))
        .unwrap_or_default();

    Some(TodoItem {
        id,
        text: body,
        priority,
        status,
        created: fields.get("created").and_then(|v| v.parse().ok()),
        last_activity: fields.get("last_activity").and_then(|v| v.parse().ok()),
        auto_detected: fields.get("auto_detected").map(String::as_str) == Some("true"),
        activity,
    })
}
