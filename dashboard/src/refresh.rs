//! Periodic REST refresh
//!
//! Re-runs a panel's fetch on a fixed cadence. A failed fetch is logged and
//! counted; whatever the panel showed before stays in place until the next
//! successful run.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::logger::child_span;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, Span, debug, info, warn};

use crate::api::ApiError;

pub struct Refresher {
    runs: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Refresher {
    /// First run happens one full `every` after spawning; callers load
    /// their initial data themselves.
    pub fn spawn<F, Fut>(name: &'static str, every: Duration, span: Span, mut refresh: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let runs = Arc::new(AtomicU64::new(0));
        let failures = Arc::new(AtomicU64::new(0));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task_runs = Arc::clone(&runs);
        let task_failures = Arc::clone(&failures);

        let task = tokio::spawn(
            async move {
                let mut ticker = interval_at(Instant::now() + every, every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                info!(
                    refresher = name,
                    every_ms = every.as_millis() as u64,
                    "rest refresher started"
                );

                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = ticker.tick() => {
                            task_runs.fetch_add(1, Ordering::SeqCst);
                            match refresh().instrument(child_span(name)).await {
                                Ok(()) => debug!(refresher = name, "refreshed"),
                                Err(e) => {
                                    task_failures.fetch_add(1, Ordering::SeqCst);
                                    warn!(refresher = name, error = %e, "refresh failed; keeping previous data");
                                }
                            }
                        }
                    }
                }

                info!(refresher = name, "rest refresher stopped");
            }
            .instrument(span),
        );

        Self {
            runs,
            failures,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// When this returns no further refresh will start.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
