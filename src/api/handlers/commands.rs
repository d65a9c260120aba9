use axum::{extract::State, Json};

use super::AppState;
use crate::api::models::CommandBody;
use crate::error::Result;
use crate::models::CommandResult;

/// POST /api/v1/commands
/// Unknown pairs are rejected with 422 before anything is sent. A backend
/// failure is still a 200 carrying `success: false`.
pub async fn execute(
    State(state): State<AppState>,
    Json(body): Json<CommandBody>,
) -> Result<Json<CommandResult>> {
    let result = state
        .controller
        .execute(body.device.trim(), body.action.trim())
        .await?;
    Ok(Json(result))
}
