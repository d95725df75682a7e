//! Liveness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Notifications accepted but not yet handed to the sink.
    pub pending_notifications: u64,
}

/// GET /health
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.orchestrator.outbox().stats();
    Json(HealthResponse {
        status: "ok",
        pending_notifications: stats.pending(),
    })
}
