//! HTTP Worker: issues one request per iteration against the configured
//! target, grounded in the original `DoHTTP` (`worker_http.go`).

use std::str::FromStr;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::WorkerConfig;
use crate::errors::WorkerOutcome;
use crate::metrics::MetricsRegistry;
use crate::sync::SyncBarrier;
use crate::worker::BaselineTracker;

pub struct HttpWorker {
    config: Arc<WorkerConfig>,
    metrics: Arc<MetricsRegistry>,
    client: reqwest::Client,
    sync_barrier: Arc<SyncBarrier>,
    method: reqwest::Method,
    baseline: BaselineTracker,
}

impl HttpWorker {
    pub fn new(
        config: Arc<WorkerConfig>,
        metrics: Arc<MetricsRegistry>,
        client: reqwest::Client,
        sync_barrier: Arc<SyncBarrier>,
    ) -> Self {
        let method = reqwest::Method::from_str(&config.http.method).unwrap_or(reqwest::Method::GET);
        Self { config, metrics, client, sync_barrier, method, baseline: BaselineTracker::new() }
    }

    /// Common Worker frame (spec.md §4.2): loop until canceled, one
    /// `requests_total` increment per attempt before classification.
    pub async fn run(&mut self, token: CancellationToken) {
        let barrier_id = self.config.sync.then(|| self.sync_barrier.join());

        loop {
            if token.is_cancelled() {
                break;
            }

            let outcome = self.do_one(&token).await;
            self.metrics.inc_requests_total();
            if outcome.is_failure() {
                self.metrics.inc_requests_failed();
            }

            if token.is_cancelled() {
                break;
            }
            if let Some(id) = barrier_id {
                self.sync_barrier.wait(id).await;
            }
        }

        if let Some(id) = barrier_id {
            self.sync_barrier.leave(id);
        }
    }

    async fn do_one(&mut self, token: &CancellationToken) -> WorkerOutcome {
        let mut request = self.client.request(self.method.clone(), &self.config.target.address);
        if let Some(payload) = &self.config.payload {
            request = request.body(payload.clone());
        }

        let start = Instant::now();
        let send = tokio::time::timeout(self.config.http.timeout, request.send());

        let response = tokio::select! {
            _ = token.cancelled() => {
                debug!("cancellation observed while sending request");
                self.metrics.inc_requests_aborted();
                return WorkerOutcome::Aborted;
            }
            result = send => match result {
                Err(_elapsed) => {
                    debug!(timeout = ?self.config.http.timeout, "request deadline exceeded");
                    self.metrics.inc_requests_aborted();
                    return WorkerOutcome::Aborted;
                }
                Ok(Err(e)) if e.is_timeout() => {
                    debug!(error = %e, "request deadline exceeded");
                    self.metrics.inc_requests_aborted();
                    return WorkerOutcome::Aborted;
                }
                Ok(Err(e)) => {
                    debug!(error = %e, "http transport error");
                    self.metrics.inc_requests_error();
                    return WorkerOutcome::Error;
                }
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status().as_u16();
        self.metrics.code_counter(status).inc();
        if !(200..=299).contains(&status) {
            return WorkerOutcome::StatusMismatch;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                debug!(error = %e, "deadline exceeded while reading response body");
                self.metrics.inc_requests_aborted();
                return WorkerOutcome::Aborted;
            }
            Err(e) => {
                debug!(error = %e, "failed reading response body");
                self.metrics.inc_requests_error();
                return WorkerOutcome::Error;
            }
        };
        let elapsed = start.elapsed();

        if self.baseline.check(body.len(), &self.metrics) {
            self.metrics.observe_response_time_ns(elapsed.as_nanos() as f64);
            WorkerOutcome::Success
        } else {
            self.metrics.inc_requests_blength();
            WorkerOutcome::BodyLengthMismatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpOpts, NetOpts, TargetUri};
    use std::collections::HashMap;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn worker_config(target: &str, http_method: &str) -> Arc<WorkerConfig> {
        Arc::new(WorkerConfig {
            target: TargetUri::parse(target).unwrap(),
            payload: None,
            http: HttpOpts {
                method: http_method.to_string(),
                headers: HashMap::new(),
                follow_redirects: false,
                timeout: Duration::from_secs(5),
            },
            net: NetOpts { timeout: Duration::from_millis(200) },
            sync: false,
        })
    }

    /// Property 6 — HTTP roundtrip.
    #[tokio::test]
    async fn roundtrip_reports_201_for_every_method() {
        for m in ["GET", "POST", "PUT", "PATCH", "DELETE"] {
            let server = MockServer::start().await;
            Mock::given(method(m))
                .and(path("/"))
                .respond_with(ResponseTemplate::new(201).set_body_string("Hello World"))
                .mount(&server)
                .await;

            let config = worker_config(&format!("http://{}/", server.address()), m);
            let metrics = MetricsRegistry::new();
            let client = reqwest::Client::new();
            let mut worker = HttpWorker::new(config, metrics.clone(), client, Arc::new(SyncBarrier::new()));

            let token = CancellationToken::new();
            let outcome = worker.do_one(&token).await;

            assert_eq!(outcome, WorkerOutcome::Success, "method {m}");
            assert_eq!(metrics.snapshot().response_codes.get("201"), Some(&1));
        }
    }

    #[tokio::test]
    async fn status_404_counts_as_failed_without_blength_bump() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = worker_config(&format!("http://{}/", server.address()), "GET");
        let metrics = MetricsRegistry::new();
        let mut worker =
            HttpWorker::new(config, metrics.clone(), reqwest::Client::new(), Arc::new(SyncBarrier::new()));

        let token = CancellationToken::new();
        let outcome = worker.do_one(&token).await;

        assert_eq!(outcome, WorkerOutcome::StatusMismatch);
        assert_eq!(metrics.snapshot().response_codes.get("404"), Some(&1));
        assert_eq!(metrics.snapshot().requests_blength, 0);
    }

    #[tokio::test]
    async fn body_shrinking_below_baseline_is_a_blength_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0123456789"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0"))
            .mount(&server)
            .await;

        let config = worker_config(&format!("http://{}/", server.address()), "GET");
        let metrics = MetricsRegistry::new();
        let mut worker =
            HttpWorker::new(config, metrics.clone(), reqwest::Client::new(), Arc::new(SyncBarrier::new()));

        let token = CancellationToken::new();
        let first = worker.do_one(&token).await;
        let second = worker.do_one(&token).await;

        assert_eq!(first, WorkerOutcome::Success);
        assert_eq!(second, WorkerOutcome::BodyLengthMismatch);
        assert_eq!(metrics.snapshot().requests_blength, 1);
    }
}
