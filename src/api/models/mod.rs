use serde::{Deserialize, Serialize};

use crate::audit::AuditRecord;
use crate::models::ViewModel;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend_online: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub queued: bool,
}

#[derive(Debug, Deserialize)]
pub struct FrequencyCommit {
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view: ViewModel,
}

#[derive(Debug, Deserialize)]
pub struct CommandBody {
    pub device: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub total: usize,
    pub records: Vec<AuditRecord>,
}
