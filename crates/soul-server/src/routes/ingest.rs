//! Write-side endpoints: manual notes, tool output, terminal commands.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use soul_ingest::{IngestItem, Source};

use crate::error::{Result, ServerError};
use crate::state::AppState;
use crate::terminal::TerminalCmd;

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub status: &'static str,
    /// False when the item was deduplicated or shed.
    pub accepted: bool,
}

/// `POST /note` — enqueue a manual note.
pub async fn post_note(
    State(state): State<AppState>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<EnqueueResponse>> {
    enqueue(&state, req.text, Source::Note)
}

/// `POST /ingest/claudecode` — enqueue conversational tool output.
pub async fn post_claudecode(
    State(state): State<AppState>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<EnqueueResponse>> {
    enqueue(&state, req.text, Source::ClaudeCode)
}

fn enqueue(state: &AppState, text: String, source: Source) -> Result<Json<EnqueueResponse>> {
    if text.trim().is_empty() {
        return Err(ServerError::BadRequest("text must be non-empty".to_string()));
    }
    let accepted = state.queue.put(IngestItem::new(text, source));
    Ok(Json(EnqueueResponse {
        status: "queued",
        accepted,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TerminalCmdRequest {
    #[serde(flatten)]
    pub cmd: TerminalCmd,
    /// Shell session token from the hook; absent on older hooks.
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TerminalCmdResponse {
    pub status: &'static str,
    pub buffered: usize,
}

/// `POST /terminal/cmd` — buffer one shell command.
pub async fn post_terminal_cmd(
    State(state): State<AppState>,
    Json(req): Json<TerminalCmdRequest>,
) -> Result<Json<TerminalCmdResponse>> {
    if req.cmd.command.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "command must be non-empty".to_string(),
        ));
    }
    let buffered = state.terminal.push(req.session, req.cmd);
    Ok(Json(TerminalCmdResponse {
        status: "ok",
        buffered,
    }))
}
