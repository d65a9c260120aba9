//! Single owner of the site view model
//!
//! Writers are the poll path (normalized snapshots) and the controller
//! (optimistic commands and edit sessions). Polls are merged field by field:
//! any leaf held by a pending command or an open edit session keeps its local
//! value.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

use crate::demo;
use crate::guard::EditSessions;
use crate::models::{FieldPath, ViewModel};
use crate::normalize::{global_status, normalize};
use crate::reconcile::Reconciler;

/// Connectivity as last observed by the status poll
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub online: bool,
    pub all_devices_connected: Option<bool>,
    pub last_error: Option<String>,
    pub last_sequence: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SiteState {
    pub view: ViewModel,
    pub reconciler: Reconciler,
    pub sessions: EditSessions,
    pub sync: SyncStatus,
}

impl SiteState {
    /// Leaves a poll must leave untouched
    pub fn held_fields(&self) -> BTreeSet<FieldPath> {
        self.reconciler
            .held_fields()
            .chain(self.sessions.fields())
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollApplied {
    Applied,
    Stale,
}

pub struct SiteStore {
    state: RwLock<SiteState>,
    demo_enabled: bool,
}

impl SiteStore {
    pub fn new(demo_enabled: bool) -> Self {
        Self {
            state: RwLock::new(SiteState::default()),
            demo_enabled,
        }
    }

    pub async fn view(&self) -> ViewModel {
        self.state.read().await.view.clone()
    }

    pub async fn sync_status(&self) -> SyncStatus {
        self.state.read().await.sync.clone()
    }

    pub async fn snapshot(&self) -> (ViewModel, SyncStatus) {
        let state = self.state.read().await;
        (state.view.clone(), state.sync.clone())
    }

    /// Run `f` with exclusive access. Keep it synchronous: no I/O under the lock.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut SiteState) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut *state)
    }

    /// Merge a `/status` payload tagged with poll sequence `seq`.
    /// Anything not newer than the last applied sequence is discarded.
    pub async fn apply_poll(&self, seq: u64, raw: &Value) -> PollApplied {
        let mut state = self.state.write().await;

        if seq <= state.sync.last_sequence {
            tracing::debug!(
                "Discarding stale status poll #{} (last applied #{})",
                seq,
                state.sync.last_sequence
            );
            return PollApplied::Stale;
        }

        let mut next = normalize(raw, &state.view);
        next.copy_fields(&state.view, &state.held_fields());
        state.view = next;

        let sync = &mut state.sync;
        sync.online = true;
        sync.last_error = None;
        sync.last_sequence = seq;
        sync.updated_at = Some(Utc::now());
        if let Some(connected) = global_status(raw) {
            sync.all_devices_connected = Some(connected);
        }

        PollApplied::Applied
    }

    /// Record a failed poll. With demo mode on, the last known view drifts.
    pub async fn mark_poll_failure(&self, seq: u64, error: &str) -> PollApplied {
        let mut state = self.state.write().await;

        if seq <= state.sync.last_sequence {
            return PollApplied::Stale;
        }

        state.sync.online = false;
        state.sync.last_error = Some(error.to_string());
        state.sync.last_sequence = seq;

        if self.demo_enabled {
            demo::perturb(&mut state.view, &mut rand::thread_rng());
        }

        PollApplied::Applied
    }
}
