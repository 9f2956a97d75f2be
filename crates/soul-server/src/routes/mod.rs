//! HTTP route handlers.

pub mod ingest;
pub mod query;
pub mod service;
pub mod todos;

pub use ingest::{post_claudecode, post_note, post_terminal_cmd};
pub use query::{get_categories, get_core, get_insight, get_recall, get_search, post_core};
pub use service::{get_health, get_service_status};
pub use todos::{
    get_todo_list, get_todo_progress, get_todo_stalled, post_todo_add, post_todo_done,
};
