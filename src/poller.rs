//! Polling scheduler
//!
//! Each job runs once immediately, then on a fixed period. A manual refresh
//! runs an extra cycle without moving the schedule. Cycles may overlap under a
//! slow backend; every cycle gets a fresh sequence number so consumers can
//! drop late answers. Shutting down aborts whatever is still in flight.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

use crate::audit::AuditLog;
use crate::backend::BackendClient;
use crate::store::{PollApplied, SiteStore};

#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// One cycle. Failures are handled inside; nothing propagates.
    async fn run(&self, seq: u64);
}

/// `GET /status` into the site store
pub struct StatusJob {
    backend: BackendClient,
    store: Arc<SiteStore>,
}

impl StatusJob {
    pub fn new(backend: BackendClient, store: Arc<SiteStore>) -> Self {
        Self { backend, store }
    }
}

#[async_trait]
impl PollJob for StatusJob {
    fn name(&self) -> &'static str {
        "status"
    }

    async fn run(&self, seq: u64) {
        match self.backend.fetch_status().await {
            Ok(raw) => {
                if self.store.apply_poll(seq, &raw).await == PollApplied::Applied {
                    tracing::trace!("Applied status poll #{}", seq);
                }
            }
            Err(e) => {
                tracing::warn!("Status poll #{} failed: {}", seq, e);
                self.store.mark_poll_failure(seq, &e.to_string()).await;
            }
        }
    }
}

/// `GET /logs` into the audit trail
pub struct LogJob {
    backend: BackendClient,
    audit: Arc<RwLock<AuditLog>>,
}

impl LogJob {
    pub fn new(backend: BackendClient, audit: Arc<RwLock<AuditLog>>) -> Self {
        Self { backend, audit }
    }
}

#[async_trait]
impl PollJob for LogJob {
    fn name(&self) -> &'static str {
        "logs"
    }

    async fn run(&self, _seq: u64) {
        match self.backend.fetch_logs().await {
            Ok(lines) => {
                let added = self.audit.write().await.ingest_backend(&lines, Utc::now());
                if added > 0 {
                    tracing::debug!("Ingested {} backend log line(s)", added);
                }
            }
            Err(e) => tracing::warn!("Log fetch failed: {}", e),
        }
    }
}

/// Cloneable trigger for out-of-band cycles
#[derive(Clone)]
pub struct Refresher(mpsc::Sender<()>);

impl Refresher {
    /// Request an extra cycle. Requests made while one is queued coalesce.
    pub fn trigger(&self) -> bool {
        self.0.try_send(()).is_ok()
    }
}

pub struct PollerHandle {
    name: &'static str,
    refresh: Refresher,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn refresh(&self) -> bool {
        self.refresh.trigger()
    }

    pub fn refresher(&self) -> Refresher {
        self.refresh.clone()
    }

    /// Stop the schedule and abort in-flight cycles
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Poller '{}' ended abnormally: {}", self.name, e);
        }
        tracing::info!("Poller '{}' stopped", self.name);
    }
}

pub fn spawn<J: PollJob>(job: J, period: Duration) -> PollerHandle {
    let job = Arc::new(job);
    let name = job.name();
    let (refresh_tx, mut refresh_rx) = mpsc::channel::<()>(1);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tracing::info!("Poller '{}' started (interval: {:?})", name, period);

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = JoinSet::new();
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    seq += 1;
                    let job = job.clone();
                    in_flight.spawn(async move { job.run(seq).await });
                }
                Some(()) = refresh_rx.recv() => {
                    seq += 1;
                    tracing::debug!("Manual refresh of '{}' (#{})", name, seq);
                    let job = job.clone();
                    in_flight.spawn(async move { job.run(seq).await });
                }
                Some(joined) = in_flight.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!("Poll cycle of '{}' panicked: {}", name, e);
                        }
                    }
                }
            }
        }

        in_flight.abort_all();
        while in_flight.join_next().await.is_some() {}
    });

    PollerHandle {
        name,
        refresh: Refresher(refresh_tx),
        shutdown: shutdown_tx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::time::sleep;

    #[derive(Default)]
    struct Recorder {
        seqs: Mutex<Vec<u64>>,
    }

    struct RecordingJob(Arc<Recorder>);

    #[async_trait]
    impl PollJob for RecordingJob {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn run(&self, seq: u64) {
            self.0.seqs.lock().unwrap().push(seq);
        }
    }

    struct HangingJob(Arc<AtomicBool>);

    #[async_trait]
    impl PollJob for HangingJob {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn run(&self, _seq: u64) {
            sleep(Duration::from_secs(60)).await;
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_first_cycle_runs_immediately() {
        let recorder = Arc::new(Recorder::default());
        let handle = spawn(RecordingJob(recorder.clone()), Duration::from_secs(30));

        sleep(Duration::from_millis(100)).await;

        assert_eq!(*recorder.seqs.lock().unwrap(), vec![1]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_manual_refresh_runs_extra_cycle() {
        let recorder = Arc::new(Recorder::default());
        let handle = spawn(RecordingJob(recorder.clone()), Duration::from_secs(30));
        sleep(Duration::from_millis(100)).await;

        assert!(handle.refresh());
        sleep(Duration::from_millis(100)).await;

        assert_eq!(*recorder.seqs.lock().unwrap(), vec![1, 2]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_periodic_cycles() {
        let recorder = Arc::new(Recorder::default());
        let handle = spawn(RecordingJob(recorder.clone()), Duration::from_millis(50));

        sleep(Duration::from_millis(275)).await;
        handle.shutdown().await;

        let seqs = recorder.seqs.lock().unwrap().clone();
        assert!(seqs.len() >= 3, "only {} cycles ran", seqs.len());
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_in_flight_cycle() {
        let finished = Arc::new(AtomicBool::new(false));
        let handle = spawn(HangingJob(finished.clone()), Duration::from_secs(30));
        sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("shutdown should not wait for the hanging cycle");

        assert!(!finished.load(Ordering::SeqCst));
    }
}
