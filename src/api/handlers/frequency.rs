use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::AppState;
use crate::api::models::{FrequencyCommit, ViewResponse};
use crate::controller::CommandOutcome;
use crate::error::Result;
use crate::guard::EditSession;

/// POST /api/v1/pcs/frequency/edit
pub async fn begin_edit(State(state): State<AppState>) -> Result<(StatusCode, Json<EditSession>)> {
    let session = state.controller.begin_frequency_edit().await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// PUT /api/v1/pcs/frequency/edit
/// 204 when the value is unchanged and nothing was sent
pub async fn commit_edit(
    State(state): State<AppState>,
    Json(body): Json<FrequencyCommit>,
) -> Result<Response> {
    let response = match state.controller.commit_frequency_edit(body.value).await? {
        Some(outcome) => Json(outcome).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

/// DELETE /api/v1/pcs/frequency/edit
pub async fn cancel_edit(State(state): State<AppState>) -> Result<Json<ViewResponse>> {
    let view = state.controller.cancel_frequency_edit().await?;
    Ok(Json(ViewResponse { view }))
}

/// POST /api/v1/pcs/frequency/reset
pub async fn reset(State(state): State<AppState>) -> Result<Json<CommandOutcome>> {
    Ok(Json(state.controller.reset_frequency().await?))
}
