//! Liveness and component health.

use axum::{extract::State, Json};
use serde::Serialize;

use soul_pipeline::PipelineStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// `GET /health` — bare liveness probe.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "soul-agent",
    })
}

#[derive(Debug, Serialize)]
pub struct ServiceStatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub queue_pending: usize,
    pub pipeline: PipelineStatus,
}

/// `GET /service/status` — liveness plus component health.
pub async fn get_service_status(State(state): State<AppState>) -> Json<ServiceStatusResponse> {
    Json(ServiceStatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        queue_pending: state.queue.pending_count(),
        pipeline: state.pipeline.status(),
    })
}
