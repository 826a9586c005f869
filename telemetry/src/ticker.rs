//! Jitter ticker
//!
//! Periodically perturbs one panel's snapshot in the `MetricStore` so a demo
//! dashboard looks live without a backend. The timer belongs to the ticker
//! handle: `stop()` (or dropping the handle) releases it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::jitter::Jitter;
use crate::store::MetricStore;

pub struct JitterTicker {
    panel: String,
    ticks: Arc<AtomicU64>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl JitterTicker {
    /// Starts ticking after one full `every`; the first change is not immediate.
    pub fn spawn(store: MetricStore, panel: impl Into<String>, jitter: Jitter, every: Duration) -> Self {
        Self::spawn_with_rng(store, panel, jitter, every, StdRng::from_entropy())
    }

    pub fn spawn_with_rng<R>(
        store: MetricStore,
        panel: impl Into<String>,
        jitter: Jitter,
        every: Duration,
        mut rng: R,
    ) -> Self
    where
        R: Rng + Send + 'static,
    {
        let panel = panel.into();
        let ticks = Arc::new(AtomicU64::new(0));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task_panel = panel.clone();
        let task_ticks = Arc::clone(&ticks);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                panel = %task_panel,
                every_ms = every.as_millis() as u64,
                rules = jitter.rules().len(),
                "jitter ticker started"
            );

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        store.update(&task_panel, |snap| jitter.tick(snap, &mut rng)).await;
                        let n = task_ticks.fetch_add(1, Ordering::SeqCst) + 1;
                        debug!(panel = %task_panel, tick = n, "jitter applied");
                    }
                }
            }

            info!(panel = %task_panel, "jitter ticker stopped");
        });

        Self {
            panel,
            ticks,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    pub fn panel(&self) -> &str {
        &self.panel
    }

    /// Ticks applied so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancels the timer. When this returns no further tick will fire.
    pub async fn stop(mut self) {
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for JitterTicker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
