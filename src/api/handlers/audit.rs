use axum::{
    extract::{Query, State},
    Json,
};

use super::AppState;
use crate::api::models::AuditListResponse;
use crate::audit::AuditQuery;

/// GET /api/v1/audit?status=&search=&range=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<AuditListResponse> {
    let records = state.controller.audit(&query).await;

    Json(AuditListResponse {
        total: records.len(),
        records,
    })
}
