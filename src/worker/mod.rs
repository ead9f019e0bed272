//! Worker: a long-lived task that repeatedly performs one unit of protocol
//! work until canceled, recording the outcome into the Metrics Registry.
//!
//! Dispatch between the HTTP and Net variants happens once, at spawn time,
//! keyed by [`crate::config::TargetScheme`] — mirroring the original's
//! `workers` scheme registry (`worker_type.go`), simplified to a two-way
//! split since gRPC/WS targets are out of scope here.

pub mod http;
pub mod net;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::WorkerConfig;
use crate::metrics::MetricsRegistry;
use crate::sync::SyncBarrier;

/// The Scaler's handle on one live Worker task (spec.md §3 `WorkerHandle`).
pub struct WorkerHandle {
    cancellation_trigger: CancellationToken,
    completion_signal: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn cancel(&self) {
        self.cancellation_trigger.cancel();
    }

    /// Awaits this Worker's termination. Used by the Scaler's ordered drain
    /// on shutdown (spec.md §4.3 "Shutdown").
    pub async fn join(self) {
        if let Err(e) = self.completion_signal.await {
            warn!(error = %e, "worker task ended abnormally");
        }
    }
}

/// Spawns a protocol-appropriate Worker as a child of `parent_token`
/// (spec.md §4.3 "Spawn"). `http_client` is shared across every HTTP Worker
/// in the run rather than rebuilt per worker.
pub fn spawn(
    config: Arc<WorkerConfig>,
    metrics: Arc<MetricsRegistry>,
    parent_token: &CancellationToken,
    http_client: reqwest::Client,
    sync_barrier: Arc<SyncBarrier>,
) -> WorkerHandle {
    let token = parent_token.child_token();
    let worker_token = token.clone();

    let completion_signal = if config.target.scheme.is_http() {
        tokio::spawn(async move {
            let mut worker = http::HttpWorker::new(config, metrics, http_client, sync_barrier);
            worker.run(worker_token).await;
        })
    } else {
        tokio::spawn(async move {
            let mut worker = net::NetWorker::new(config, metrics, sync_barrier);
            worker.run(worker_token).await;
        })
    };

    WorkerHandle { cancellation_trigger: token, completion_signal }
}

/// Implements the 90%-of-first-successful-response length floor shared by
/// the HTTP and Net workers (spec.md's pinned "stable rule" for
/// `baseline_blen`, resolving the source's 50%/90% inconsistency in favor of
/// the 90% variant). Not re-baselined if the response size later changes —
/// an open question spec.md leaves unresolved in the source's favor of the
/// simpler, stable behavior.
pub(crate) struct BaselineTracker {
    baseline_blen: Option<usize>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self { baseline_blen: None }
    }

    /// `true` if `len` clears the established baseline, or if this call
    /// establishes it. On establishment, also records `response_bytes`.
    pub fn check(&mut self, len: usize, metrics: &MetricsRegistry) -> bool {
        match self.baseline_blen {
            None => {
                let baseline = (len as f64 * 0.9).floor() as usize;
                self.baseline_blen = Some(baseline);
                metrics.set_response_bytes(len as f64);
                true
            }
            Some(baseline) => len >= baseline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_established_on_first_call() {
        let metrics = MetricsRegistry::new();
        let mut tracker = BaselineTracker::new();
        assert!(tracker.check(100, &metrics));
        assert_eq!(tracker.baseline_blen, Some(90));
    }

    #[test]
    fn baseline_rejects_shorter_subsequent_bodies() {
        let metrics = MetricsRegistry::new();
        let mut tracker = BaselineTracker::new();
        tracker.check(100, &metrics);
        assert!(tracker.check(95, &metrics));
        assert!(tracker.check(90, &metrics));
        assert!(!tracker.check(89, &metrics));
    }
}
