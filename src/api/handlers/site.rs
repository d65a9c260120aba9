use axum::{extract::State, http::StatusCode, Json};

use super::AppState;
use crate::api::models::RefreshResponse;
use crate::controller::{CommandOutcome, SiteSnapshot};
use crate::error::Result;

/// GET /api/v1/site
pub async fn get_site(State(state): State<AppState>) -> Json<SiteSnapshot> {
    Json(state.controller.snapshot().await)
}

/// POST /api/v1/site/refresh
/// Queues an out-of-band status poll; the regular schedule is unaffected
pub async fn refresh(State(state): State<AppState>) -> (StatusCode, Json<RefreshResponse>) {
    let queued = state
        .status_refresh
        .as_ref()
        .map(|r| r.trigger())
        .unwrap_or(false);

    (StatusCode::ACCEPTED, Json(RefreshResponse { queued }))
}

/// POST /api/v1/diesel/engine/toggle
pub async fn toggle_diesel_engine(State(state): State<AppState>) -> Result<Json<CommandOutcome>> {
    Ok(Json(state.controller.toggle_diesel_engine().await?))
}

/// POST /api/v1/ess/power/toggle
pub async fn toggle_ess_power(State(state): State<AppState>) -> Result<Json<CommandOutcome>> {
    Ok(Json(state.controller.toggle_ess_power().await?))
}
