//! Scaler: the controller task that reconciles the live Worker population to
//! a shape function's target on every period tick.
//!
//! Grounded in the original `scaler.Start`/`scale`/`spawn`/`despawn`
//! (`utils/scaler/scaler.go`), restructured around a tagged [`Shape`] +
//! [`evaluate`] instead of a runtime closure, per spec.md's Design Notes.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{ScalerConfig, WorkerConfig};
use crate::metrics::MetricsRegistry;
use crate::shapes::evaluate;
use crate::sync::SyncBarrier;
use crate::worker::{self, WorkerHandle};

pub struct Scaler {
    config: ScalerConfig,
    worker_config: Arc<WorkerConfig>,
    metrics: Arc<MetricsRegistry>,
    http_client: reqwest::Client,
    sync_barrier: Arc<SyncBarrier>,
    step: f64,
    workers: VecDeque<WorkerHandle>,
}

impl Scaler {
    pub fn new(
        config: ScalerConfig,
        worker_config: Arc<WorkerConfig>,
        metrics: Arc<MetricsRegistry>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            worker_config,
            metrics,
            http_client,
            sync_barrier: Arc::new(SyncBarrier::new()),
            step: 0.0,
            workers: VecDeque::new(),
        }
    }

    /// Runs until `token` fires, ticking on `config.period`. The shape is
    /// evaluated once immediately, before the first period elapses (spec.md
    /// §4.3 "First tick"), then on every subsequent tick of a
    /// period-length interval.
    pub async fn run(&mut self, token: CancellationToken) {
        let period = self.config.period.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        self.reconcile(&token);
        // `interval`'s first tick fires immediately; without this reset the
        // manual reconcile above and that first tick would both land at
        // t≈0, double-evaluating the shape and skipping a step. Resetting
        // pushes the next tick out to now+period, matching the Go
        // original's `time.NewTicker`, which never fires immediately.
        ticker.reset();

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.drain().await;
                    return;
                }
                _ = ticker.tick() => {
                    self.reconcile(&token);
                }
            }
        }
    }

    /// One reconciliation: advance `step`, evaluate the shape, clamp +
    /// round, then spawn/despawn toward the target (spec.md §4.3).
    fn reconcile(&mut self, token: &CancellationToken) {
        self.step += 1.0;
        let (min, max) = self.config.effective_bounds();
        let raw = evaluate(self.config.shape, self.step, self.config.factor, max);
        let target = raw.abs().clamp(min, max).round() as usize;

        let before = self.workers.len();

        while self.workers.len() < target {
            self.spawn(token);
        }
        while self.workers.len() > target {
            self.despawn();
        }

        if before != self.workers.len() {
            self.metrics.set_workers(self.workers.len() as f64);
            info!(workers = self.workers.len(), step = self.step, "scaled worker population");
        }
    }

    fn spawn(&mut self, token: &CancellationToken) {
        let handle = worker::spawn(
            self.worker_config.clone(),
            self.metrics.clone(),
            token,
            self.http_client.clone(),
            self.sync_barrier.clone(),
        );
        self.workers.push_back(handle);
    }

    /// FIFO eviction: the oldest Worker is canceled first. Fire-and-forget
    /// during steady-state ticks — the Worker tears itself down
    /// asynchronously (spec.md §4.3 "Despawn").
    fn despawn(&mut self) {
        if let Some(handle) = self.workers.pop_front() {
            handle.cancel();
            debug!(workers_remaining = self.workers.len(), "despawned oldest worker");
        }
    }

    /// Ordered drain: cancel every Worker and synchronously await each
    /// completion signal in order, so the orchestrator observes a fully
    /// quiescent system before snapshotting metrics (spec.md §4.3
    /// "Shutdown", Property 2).
    async fn drain(&mut self) {
        for handle in &self.workers {
            handle.cancel();
        }
        while let Some(handle) = self.workers.pop_front() {
            handle.join().await;
        }
        self.metrics.set_workers(0.0);
        info!("scaler drained, all workers quiescent");
    }
}
