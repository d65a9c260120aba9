use axum::{extract::State, Json};

use super::AppState;
use crate::api::models::HealthResponse;

/// GET /health
/// Always 200 while the process runs; backend reachability is informational
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sync = state.controller.store().sync_status().await;

    Json(HealthResponse {
        status: "ok",
        backend_online: sync.online,
    })
}
