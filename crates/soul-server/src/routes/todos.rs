//! To-do endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

use soul_pipeline::{TodoFilter, TodoItem, DEFAULT_STALE_DAYS};
use soul_vault::{ActivityEntry, Priority};

use crate::error::{Result, ServerError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "active".to_string()
}

#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<TodoItem>,
}

/// `GET /todo/list?status=active|stalled|all`.
pub async fn get_todo_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<TodoListResponse>> {
    let todos = match params.status.as_str() {
        "active" => state.todos.list(TodoFilter::Active),
        "all" => state.todos.list(TodoFilter::All),
        "stalled" => state
            .todos
            .stalled(Local::now().date_naive(), DEFAULT_STALE_DAYS),
        other => {
            return Err(ServerError::BadRequest(format!(
                "unknown status: {other}"
            )))
        }
    };
    Ok(Json(TodoListResponse { todos }))
}

/// `GET /todo/stalled` — shorthand for the stalled listing.
pub async fn get_todo_stalled(State(state): State<AppState>) -> Json<TodoListResponse> {
    Json(TodoListResponse {
        todos: state
            .todos
            .stalled(Local::now().date_naive(), DEFAULT_STALE_DAYS),
    })
}

#[derive(Debug, Serialize)]
pub struct TodoProgressResponse {
    pub id: String,
    pub text: String,
    pub activity: Vec<ActivityEntry>,
}

/// `GET /todo/progress/{id}`.
pub async fn get_todo_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TodoProgressResponse>> {
    let todo = state
        .todos
        .get(&id)
        .ok_or_else(|| ServerError::NotFound(format!("todo {id}")))?;
    Ok(Json(TodoProgressResponse {
        id: todo.id,
        text: todo.text,
        activity: todo.activity,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TodoAddRequest {
    pub text: String,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Serialize)]
pub struct TodoAddResponse {
    pub status: &'static str,
    pub id: String,
}

/// `POST /todo/add` — create a task by hand.
pub async fn post_todo_add(
    State(state): State<AppState>,
    Json(req): Json<TodoAddRequest>,
) -> Result<Json<TodoAddResponse>> {
    if req.text.trim().is_empty() {
        return Err(ServerError::BadRequest("text must be non-empty".to_string()));
    }
    let id = state
        .todos
        .create(&req.text, req.priority.unwrap_or(Priority::P2), false)?;
    Ok(Json(TodoAddResponse { status: "ok", id }))
}

#[derive(Debug, Deserialize)]
pub struct TodoIdRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub status: &'static str,
}

/// `POST /todo/done` — complete a task.
pub async fn post_todo_done(
    State(state): State<AppState>,
    Json(req): Json<TodoIdRequest>,
) -> Result<Json<OkResponse>> {
    state.todos.complete(&req.id)?;
    Ok(Json(OkResponse { status: "ok" }))
}
