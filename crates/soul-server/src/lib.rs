//! Loopback HTTP surface for the soul-agent daemon.
//!
//! Exposes the write side (notes, tool output, terminal commands) and the
//! read side (search, recall, insight, categories, to-dos, status). Binds
//! to 127.0.0.1 only and carries no authentication by design — the daemon
//! is a single-user local service.

pub mod error;
pub mod routes;
pub mod state;
pub mod terminal;

pub use error::{Result, ServerError};
pub use state::AppState;
pub use terminal::{TerminalCmd, TerminalSink};

use std::net::{Ipv4Addr, SocketAddr};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The soul-agent HTTP server.
pub struct Server {
    state: AppState,
    port: u16,
}

impl Server {
    pub fn new(state: AppState, port: u16) -> Self {
        Self { state, port }
    }

    /// Build the router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(routes::get_health))
            .route("/service/status", get(routes::get_service_status))
            .route("/note", post(routes::post_note))
            .route("/ingest/claudecode", post(routes::post_claudecode))
            .route("/terminal/cmd", post(routes::post_terminal_cmd))
            .route("/search", get(routes::get_search))
            .route("/recall", get(routes::get_recall))
            .route("/insight", get(routes::get_insight))
            .route("/categories", get(routes::get_categories))
            .route("/core", get(routes::get_core).post(routes::post_core))
            .route("/todo/list", get(routes::get_todo_list))
            .route("/todo/stalled", get(routes::get_todo_stalled))
            .route("/todo/progress/{id}", get(routes::get_todo_progress))
            .route("/todo/add", post(routes::post_todo_add))
            .route("/todo/done", post(routes::post_todo_done))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until the token is cancelled. Loopback bind only.
    pub async fn run(self, token: CancellationToken) -> Result<()> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port));
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {addr}: {e}")))?;
        info!(%addr, "HTTP surface listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {e}")))?;
        Ok(())
    }
}
