//! Process-scoped site context: the operator operations the API exposes.
//!
//! Optimistic commands run in a detached task so the pending ticket is always
//! settled, even if the HTTP caller goes away mid-dispatch.

use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::audit::{AuditLog, AuditQuery, AuditRecord};
use crate::backend::BackendClient;
use crate::dispatch::CommandDispatcher;
use crate::error::{AppError, Result};
use crate::guard::{self, EditSession, FrequencyEnvelope, GuardError};
use crate::models::{Action, CommandRequest, CommandResult, Device, FieldPath, ViewModel};
use crate::reconcile::{Change, Outcome, Phase, ReconcileError, Ticket};
use crate::store::{SiteStore, SyncStatus};

/// Result of an optimistic command after it settled
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub outcome: Outcome,
    pub result: CommandResult,
    pub view: ViewModel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSnapshot {
    pub view: ViewModel,
    pub sync: SyncStatus,
    pub executing: bool,
}

#[derive(Clone)]
pub struct SiteController {
    store: Arc<SiteStore>,
    dispatcher: CommandDispatcher,
    audit: Arc<RwLock<AuditLog>>,
    envelope: FrequencyEnvelope,
}

impl SiteController {
    pub fn new(store: Arc<SiteStore>, backend: BackendClient, audit: Arc<RwLock<AuditLog>>) -> Self {
        Self {
            store,
            dispatcher: CommandDispatcher::new(backend, audit.clone()),
            audit,
            envelope: FrequencyEnvelope::PCS,
        }
    }

    pub fn store(&self) -> &Arc<SiteStore> {
        &self.store
    }

    pub fn is_executing(&self) -> bool {
        self.dispatcher.is_executing()
    }

    pub async fn snapshot(&self) -> SiteSnapshot {
        let (view, sync) = self.store.snapshot().await;
        SiteSnapshot {
            view,
            sync,
            executing: self.is_executing(),
        }
    }

    /// Start the generator when stopped, stop it when running
    pub async fn toggle_diesel_engine(&self) -> Result<CommandOutcome> {
        let (ticket, on) = self
            .store
            .with_state(|s| {
                let on = !s.view.diesel.engine_switch;
                s.reconciler
                    .begin(&mut s.view, &Change::diesel_engine(on))
                    .map(|ticket| (ticket, on))
            })
            .await?;

        let action = if on { Action::StartDg } else { Action::StopDg };
        self.settle_detached(CommandRequest::new(Device::Diesel, action), ticket)
            .await
    }

    /// Power the battery system on when off, off when on
    pub async fn toggle_ess_power(&self) -> Result<CommandOutcome> {
        let (ticket, on) = self
            .store
            .with_state(|s| {
                let on = !s.view.ess.switch;
                s.reconciler
                    .begin(&mut s.view, &Change::ess_power(on))
                    .map(|ticket| (ticket, on))
            })
            .await?;

        let action = if on {
            Action::PowerOnSbms
        } else {
            Action::PowerOffSbms
        };
        self.settle_detached(CommandRequest::new(Device::Sbms, action), ticket)
            .await
    }

    /// Capture the current setpoint as the edit's original value
    pub async fn begin_frequency_edit(&self) -> Result<EditSession> {
        let session = self
            .store
            .with_state(|s| -> Result<EditSession> {
                if s.reconciler.phase(FieldPath::PcsFrequency) == Phase::Applying {
                    return Err(AppError::from(ReconcileError::Busy {
                        field: FieldPath::PcsFrequency.key().to_string(),
                    }));
                }
                let current = s.view.ess.pcs.frequency;
                Ok(s.sessions.open(FieldPath::PcsFrequency, current)?)
            })
            .await?;

        tracing::debug!("Frequency edit opened at {:.2} Hz", session.original_value);
        Ok(session)
    }

    /// Commit the edited setpoint.
    ///
    /// Out-of-range values revert to the original and never reach the
    /// backend. An unchanged value closes the session with `Ok(None)`.
    pub async fn commit_frequency_edit(&self, value: f64) -> Result<Option<CommandOutcome>> {
        let envelope = self.envelope;

        let planned = self
            .store
            .with_state(|s| -> Result<Option<(Action, Ticket)>> {
                let field = FieldPath::PcsFrequency;
                let original = s
                    .sessions
                    .get(field)
                    .map(|session| session.original_value)
                    .ok_or_else(|| GuardError::NoSession(field.key().to_string()))?;

                let verdict = guard::evaluate(&envelope, original, value);
                s.sessions.close(field)?;

                match verdict {
                    Err(e) => {
                        s.view.ess.pcs.frequency = original;
                        Err(e.into())
                    }
                    Ok(None) => {
                        s.view.ess.pcs.frequency = original;
                        Ok(None)
                    }
                    Ok(Some(action)) => {
                        let ticket = s
                            .reconciler
                            .begin(&mut s.view, &Change::pcs_frequency(value))?;
                        Ok(Some((action, ticket)))
                    }
                }
            })
            .await;

        let (action, ticket) = match planned {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                tracing::debug!("Frequency edit closed unchanged");
                return Ok(None);
            }
            Err(e) => {
                tracing::info!("Frequency edit rejected: {}", e);
                return Err(e);
            }
        };

        self.settle_detached(CommandRequest::new(Device::Pcs, action), ticket)
            .await
            .map(Some)
    }

    /// Drop the edit and restore the captured original
    pub async fn cancel_frequency_edit(&self) -> Result<ViewModel> {
        self.store
            .with_state(|s| -> Result<ViewModel> {
                let session = s.sessions.close(FieldPath::PcsFrequency)?;
                s.view.ess.pcs.frequency = session.original_value;
                Ok(s.view.clone())
            })
            .await
    }

    /// Drive the setpoint to 60.00 Hz. Always dispatches and supersedes an open edit.
    pub async fn reset_frequency(&self) -> Result<CommandOutcome> {
        let ticket = self
            .store
            .with_state(|s| {
                let field = FieldPath::PcsFrequency;
                if s.reconciler.phase(field) == Phase::Applying {
                    return Err(ReconcileError::Busy {
                        field: field.key().to_string(),
                    });
                }
                if let Ok(session) = s.sessions.close(field) {
                    s.view.ess.pcs.frequency = session.original_value;
                }
                s.reconciler.begin(
                    &mut s.view,
                    &Change::pcs_frequency(FrequencyEnvelope::RESET_VALUE),
                )
            })
            .await?;

        self.settle_detached(CommandRequest::new(Device::Pcs, Action::PcsFreqReset), ticket)
            .await
    }

    /// Dispatch any vocabulary command without touching the view
    pub async fn execute(&self, device: &str, action: &str) -> Result<CommandResult> {
        let request = CommandRequest::parse(device, action)?;
        Ok(self.dispatcher.dispatch(request).await)
    }

    pub async fn audit(&self, query: &AuditQuery) -> Vec<AuditRecord> {
        self.audit.read().await.filter(query, Local::now())
    }

    async fn settle_detached(&self, request: CommandRequest, ticket: Ticket) -> Result<CommandOutcome> {
        let this = self.clone();

        tokio::spawn(async move {
            let result = this.dispatcher.dispatch(request).await;
            let success = result.success;

            let (outcome, view) = this
                .store
                .with_state(|s| {
                    let outcome = s.reconciler.settle(&mut s.view, ticket, success);
                    (outcome, s.view.clone())
                })
                .await;

            if outcome == Outcome::RolledBack {
                tracing::warn!(
                    "Rolled back {} {}: {}",
                    result.original_request.device,
                    result.original_request.action,
                    result.message
                );
            }

            CommandOutcome {
                outcome,
                result,
                view,
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("command task failed: {}", e)))
    }
}
