//! Insight report assembly.
//!
//! A report has four sections in fixed order: time allocation, task
//! tracking, core topics, and work advice. The first three are computed
//! locally; the last is one LLM call that receives the partial report as
//! context and is simply omitted when the call fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use soul_llm::{ChatRequest, SharedBackend};
use soul_pipeline::{DailyLog, TodoStore, DEFAULT_STALE_DAYS};
use soul_vault::{frontmatter, Priority, VaultDir, VaultStore};

use crate::entries::{filter_entries, parse_entries, top_tags, LogEntry};
use crate::error::Result;

const ADVICE_SYSTEM_PROMPT: &str = "You are the user's personal work advisor. Based on the \
day's report, give 2-4 concrete, decision-ready suggestions. Focus on unfinished key items, \
follow-ups at risk of being forgotten, and priority calls. Output a plain list, one line per \
suggestion, no preamble.";

const ADVICE_MAX_TOKENS: u32 = 512;

/// Per-category share of the day.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryAllocation {
    pub count: usize,
    pub percent: u32,
    /// Up to three sample entry texts.
    pub samples: Vec<String>,
}

/// Compute per-category counts and percentages. Percentages are integers
/// and always sum to exactly 100 (largest-remainder rounding).
pub fn compute_allocation(entries: &[LogEntry]) -> BTreeMap<String, CategoryAllocation> {
    let total = entries.len();
    let mut allocation: BTreeMap<String, CategoryAllocation> = BTreeMap::new();
    if total == 0 {
        return allocation;
    }

    for entry in entries {
        let slot = allocation
            .entry(entry.category.clone())
            .or_insert(CategoryAllocation {
                count: 0,
                percent: 0,
                samples: Vec::new(),
            });
        slot.count += 1;
        if slot.samples.len() < 3 {
            slot.samples.push(entry.text.clone());
        }
    }

    // Largest-remainder rounding so the percentages sum to 100.
    let mut shares: Vec<(String, u32, f64)> = allocation
        .iter()
        .map(|(cat, a)| {
            let exact = a.count as f64 * 100.0 / total as f64;
            (cat.clone(), exact.floor() as u32, exact - exact.floor())
        })
        .collect();
    let assigned: u32 = shares.iter().map(|(_, floor, _)| floor).sum();
    let mut leftover = 100 - assigned;
    shares.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    for (cat, floor, _) in shares {
        let bump = u32::from(leftover > 0);
        leftover -= bump;
        if let Some(slot) = allocation.get_mut(&cat) {
            slot.percent = floor + bump;
        }
    }
    allocation
}

/// The insight engine.
pub struct InsightEngine {
    vault: Arc<VaultStore>,
    daily_log: Arc<DailyLog>,
    todos: Arc<TodoStore>,
    backend: SharedBackend,
}

impl InsightEngine {
    pub fn new(
        vault: Arc<VaultStore>,
        daily_log: Arc<DailyLog>,
        todos: Arc<TodoStore>,
        backend: SharedBackend,
    ) -> Self {
        Self {
            vault,
            daily_log,
            todos,
            backend,
        }
    }

    /// Entries for one date, cleaned for aggregation. Empty when no log
    /// exists.
    pub fn entries_for(&self, date: NaiveDate) -> Vec<LogEntry> {
        let Some(body) = self.daily_log.read_body(date) else {
            return Vec::new();
        };
        filter_entries(parse_entries(&body))
    }

    /// Build the Markdown report for `date`. Returns a "no data" report
    /// when the daily log is absent or empty.
    pub async fn build_report(&self, date: NaiveDate) -> String {
        let entries = self.entries_for(date);
        if entries.is_empty() {
            return format!("# Daily Insight — {date}\n\nNo data for this date.\n");
        }

        let mut report = format!("# Daily Insight — {date}\n\n");

        // Time allocation
        report.push_str("## Time Allocation\n\n");
        let allocation = compute_allocation(&entries);
        let mut ranked: Vec<_> = allocation.iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        for (category, alloc) in &ranked {
            report.push_str(&format!(
                "- **{category}**: {} entries ({}%)\n",
                alloc.count, alloc.percent
            ));
        }
        report.push('\n');

        // Task tracking
        report.push_str("## Task Tracking\n\n");
        let done = self.todos.done_on(date);
        let active = self.todos.list(soul_pipeline::TodoFilter::Active);
        let stalled = self.todos.stalled(date, DEFAULT_STALE_DAYS);
        if !done.is_empty() {
            report.push_str(&format!("**Done today** ({})\n\n", done.len()));
            for t in &done {
                report.push_str(&format!("- {}\n", truncate(&t.text, 80)));
            }
            report.push('\n');
        }
        if active.is_empty() {
            report.push_str("No active tasks.\n\n");
        } else {
            report.push_str(&format!("**Active** ({})\n\n", active.len()));
            for t in &active {
                report.push_str(&format!("- [{}] {}\n", t.priority, truncate(&t.text, 80)));
            }
            report.push('\n');
        }
        if !stalled.is_empty() {
            report.push_str(&format!("**Stalled** ({})\n\n", stalled.len()));
            for t in &stalled {
                let last = t
                    .last_activity
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                report.push_str(&format!(
                    "- {} (last activity: {last})\n",
                    truncate(&t.text, 80)
                ));
            }
            report.push('\n');
        }

        // Core topics
        report.push_str("## Core Topics\n\n");
        let tags = top_tags(&entries, 10);
        if tags.is_empty() {
            for (category, alloc) in ranked.iter().take(3) {
                for sample in &alloc.samples {
                    report.push_str(&format!("- [{category}] {}\n", truncate(sample, 80)));
                }
            }
        } else {
            for (tag, count) in &tags {
                report.push_str(&format!("- #{tag} ({count})\n"));
            }
        }
        report.push('\n');

        // Work advice — the only LLM-dependent section; omitted on failure.
        match self.advice(&report).await {
            Some(advice) => {
                report.push_str("## Work Advice\n\n");
                report.push_str(advice.trim());
                report.push('\n');
            }
            None => {
                warn!(%date, "Advice generation failed, section omitted");
            }
        }

        report
    }

    async fn advice(&self, partial_report: &str) -> Option<String> {
        let request = ChatRequest::new(format!(
            "Today's report so far:\n\n{partial_report}\n\nGive your advice."
        ))
        .with_system(ADVICE_SYSTEM_PROMPT)
        .with_max_tokens(ADVICE_MAX_TOKENS);

        match self.backend.complete(request).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "LLM advice call failed");
                None
            }
        }
    }

    /// Build the report and persist it to `insights/daily-<date>.md` with
    /// lifecycle fields.
    pub async fn generate_and_save(&self, date: NaiveDate) -> Result<String> {
        let report = self.build_report(date).await;

        let mut fields = frontmatter::Fields::new();
        fields.insert("type".to_string(), "daily-insight".to_string());
        fields.insert("date".to_string(), date.to_string());
        frontmatter::add_lifecycle(&mut fields, Priority::P2, date);

        self.vault.write(
            VaultDir::Insights,
            &format!("daily-{date}.md"),
            &frontmatter::build(&fields, &report),
        )?;
        info!(%date, "Saved daily insight");
        Ok(report)
    }
}

fn truncate(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
