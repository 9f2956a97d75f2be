//! Daily insight reports for soul-agent.
//!
//! Read-side aggregation over the persisted store: parses daily logs,
//! computes time allocation and task state, assembles a Markdown report,
//! and (via one optional LLM call) appends work advice. A scheduler task
//! generates and persists the report once per day.

pub mod entries;
pub mod error;
pub mod report;
pub mod scheduler;

pub use entries::{filter_entries, parse_entries, top_tags, LogEntry};
pub use error::{InsightError, Result};
pub use report::{compute_allocation, CategoryAllocation, InsightEngine};
pub use scheduler::{parse_daily_time, InsightScheduler};
