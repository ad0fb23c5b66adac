//! Periodic sync runner with an explicit start/stop handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::extract::AmountExtractor;
use crate::orchestrator::SyncOrchestrator;
use crate::store::Store;

/// Owns the periodic sync task. Constructed once by the process lifecycle
/// and passed by reference to whatever needs to query or control it;
/// there is no module-level singleton.
#[derive(Default)]
pub struct SyncScheduler {
    handle: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the interval loop. The first sync runs immediately; starting
    /// an already-running scheduler is a no-op.
    pub fn start<S, E>(&mut self, orchestrator: Arc<SyncOrchestrator<S, E>>, interval: Duration)
    where
        S: Store + 'static,
        E: AmountExtractor + 'static,
    {
        if self.is_running() {
            info!("scheduler already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match orchestrator.sync_pending().await {
                            Ok(report) => info!(
                                processed = report.processed,
                                total = report.total,
                                "scheduled sync finished"
                            ),
                            Err(e) => error!(error = %e, "scheduled sync failed"),
                        }
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        self.shutdown = Some(tx);
        self.handle = Some(handle);
        info!(interval_secs = interval.as_secs(), "scheduler started");
    }

    /// Signal shutdown and wait for the task to wind down.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}
