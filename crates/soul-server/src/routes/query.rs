//! Read-side endpoints: search, recall, insight, categories, core memory.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use soul_insight::{compute_allocation, CategoryAllocation, LogEntry};
use soul_vault::VaultDir;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Number of recent daily logs scanned by `/search`.
const SEARCH_DAYS: usize = 7;

// ─────────────────────────────────────────────────────────────────────────────
// /search
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct SearchHitBody {
    pub date: NaiveDate,
    pub line: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHitBody>,
}

/// `GET /search?q=&limit=` — substring scan over recent daily logs.
pub async fn get_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let needle = params.q.trim().to_lowercase();
    if needle.is_empty() {
        return Err(ServerError::BadRequest("q must be non-empty".to_string()));
    }

    let mut results = Vec::new();
    let mut dates = state.daily_log.dates();
    dates.reverse(); // newest first
    for date in dates.into_iter().take(SEARCH_DAYS) {
        let Some(body) = state.daily_log.read_body(date) else {
            continue;
        };
        for line in body.lines() {
            if line.to_lowercase().contains(&needle) {
                results.push(SearchHitBody {
                    date,
                    line: line.to_string(),
                });
                if results.len() >= params.limit {
                    return Ok(Json(SearchResponse { results }));
                }
            }
        }
    }
    Ok(Json(SearchResponse { results }))
}

// ─────────────────────────────────────────────────────────────────────────────
// /recall and /categories
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "today".to_string()
}

fn period_days(period: &str) -> Result<u64> {
    match period {
        "today" => Ok(1),
        "week" => Ok(7),
        "month" => Ok(30),
        other => Err(ServerError::BadRequest(format!(
            "unknown period: {other}"
        ))),
    }
}

/// Dates covered by a period, oldest first, ending today.
fn period_dates(days: u64) -> Vec<NaiveDate> {
    let today = Local::now().date_naive();
    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct RecallDay {
    pub date: NaiveDate,
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
pub struct RecallResponse {
    pub period: String,
    pub days: Vec<RecallDay>,
}

/// `GET /recall?period=` — compiled view of daily logs.
pub async fn get_recall(
    State(state): State<AppState>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<RecallResponse>> {
    let days = period_days(&params.period)?;
    let days = period_dates(days)
        .into_iter()
        .filter_map(|date| {
            let entries = state.insight.entries_for(date);
            (!entries.is_empty()).then_some(RecallDay { date, entries })
        })
        .collect();
    Ok(Json(RecallResponse {
        period: params.period,
        days,
    }))
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: BTreeMap<String, CategoryAllocation>,
}

/// `GET /categories?period=` — time-allocation map.
pub async fn get_categories(
    State(state): State<AppState>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<CategoriesResponse>> {
    if params.period == "month" {
        return Err(ServerError::BadRequest(
            "period must be today or week".to_string(),
        ));
    }
    let days = period_days(&params.period)?;
    let entries: Vec<LogEntry> = period_dates(days)
        .into_iter()
        .flat_map(|date| state.insight.entries_for(date))
        .collect();
    Ok(Json(CategoriesResponse {
        categories: compute_allocation(&entries),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// /insight
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InsightParams {
    #[serde(default = "default_period")]
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub date: NaiveDate,
    pub report: String,
}

/// `GET /insight?date=YYYY-MM-DD|today` — generated insight report.
pub async fn get_insight(
    State(state): State<AppState>,
    Query(params): Query<InsightParams>,
) -> Result<Json<InsightResponse>> {
    let date = if params.date == "today" {
        Local::now().date_naive()
    } else {
        params
            .date
            .parse()
            .map_err(|_| ServerError::BadRequest(format!("invalid date: {}", params.date)))?
    };
    let report = state.insight.build_report(date).await;
    Ok(Json(InsightResponse { date, report }))
}

// ─────────────────────────────────────────────────────────────────────────────
// /core
// ─────────────────────────────────────────────────────────────────────────────

const CORE_MEMORY_FILE: &str = "MEMORY.md";

#[derive(Debug, Serialize)]
pub struct CoreResponse {
    pub content: String,
}

/// `GET /core` — contents of `core/MEMORY.md`.
pub async fn get_core(State(state): State<AppState>) -> Json<CoreResponse> {
    Json(CoreResponse {
        content: state
            .vault
            .read(VaultDir::Core, CORE_MEMORY_FILE)
            .unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CoreUpdateRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub status: &'static str,
}

/// `POST /core` — replace `core/MEMORY.md`.
pub async fn post_core(
    State(state): State<AppState>,
    Json(req): Json<CoreUpdateRequest>,
) -> Result<Json<OkResponse>> {
    state
        .vault
        .write(VaultDir::Core, CORE_MEMORY_FILE, &req.content)?;
    Ok(Json(OkResponse { status: "ok" }))
}
