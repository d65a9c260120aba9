//! Command dispatcher
//!
//! Sends one vocabulary command to `POST /control`, never fails towards the
//! caller, and writes an audit record for every outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::audit::{AuditLog, AuditRecord};
use crate::backend::{BackendClient, BackendError};
use crate::models::{CommandRequest, CommandResult};

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Command executed successfully";
pub const CONNECTIVITY_MESSAGE: &str = "Unable to connect to backend service";

#[derive(Clone)]
pub struct CommandDispatcher {
    backend: BackendClient,
    audit: Arc<RwLock<AuditLog>>,
    in_flight: Arc<AtomicUsize>,
}

/// Counts a dispatch as executing until dropped, including on cancellation
struct Executing(Arc<AtomicUsize>);

impl Executing {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for Executing {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CommandDispatcher {
    pub fn new(backend: BackendClient, audit: Arc<RwLock<AuditLog>>) -> Self {
        Self {
            backend,
            audit,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// True while any dispatch is awaiting the backend
    pub fn is_executing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn dispatch(&self, request: CommandRequest) -> CommandResult {
        let _executing = Executing::enter(&self.in_flight);

        tracing::info!("Dispatching {} {}", request.device, request.action);

        let (success, message) = match self.backend.send_control(&request).await {
            Ok(reply) => (
                true,
                reply
                    .message
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
            ),
            // 2xx with an unreadable body still means the backend accepted it
            Err(BackendError::Deserialization(e)) => {
                tracing::debug!("Unreadable control reply for {}: {}", request.action, e);
                (true, DEFAULT_SUCCESS_MESSAGE.to_string())
            }
            Err(BackendError::Http { status, message }) => {
                tracing::warn!(
                    "Backend rejected {} {} ({}): {}",
                    request.device,
                    request.action,
                    status,
                    message
                );
                (false, message)
            }
            Err(BackendError::Network(e)) => {
                tracing::warn!(
                    "Could not reach backend for {} {}: {}",
                    request.device,
                    request.action,
                    e
                );
                (false, CONNECTIVITY_MESSAGE.to_string())
            }
        };

        if success {
            tracing::info!("{} {} succeeded: {}", request.device, request.action, message);
        }

        let result = CommandResult {
            success,
            message,
            original_request: request,
        };

        self.audit
            .write()
            .await
            .record(AuditRecord::from_dispatch(&result));

        result
    }
}
