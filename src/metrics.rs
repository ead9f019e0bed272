//! The Metrics Registry: process-wide counters, a gauge, and the streaming
//! quantile summary, shared read/write by every Worker and the Scaler.
//!
//! Per the design notes in spec.md §9, this is NOT a `lazy_static` global —
//! it's constructed once in `main` and threaded to components as an
//! `Arc<MetricsRegistry>`, the only process-wide value being `tolerance`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use prometheus::{Encoder, Gauge, IntCounter, Opts, Registry, TextEncoder};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::percentiles::{ResponseTimeSummary, QUANTILES};

/// The seven named counters/gauges the core tracks, plus the dynamic
/// per-status-code map and the quantile summary.
pub struct MetricsRegistry {
    start: Instant,
    requests_total: IntCounter,
    requests_failed: IntCounter,
    requests_error: IntCounter,
    requests_aborted: IntCounter,
    requests_blength: IntCounter,
    workers: Gauge,
    response_bytes: Gauge,
    response_times: Mutex<ResponseTimeSummary>,
    response_codes: Mutex<HashMap<u16, IntCounter>>,
    registry: Registry,
    /// Bit-cast f64; `f64 >= 1.0` disables the sanity check entirely.
    tolerance_bits: AtomicU64,
}

macro_rules! new_counter {
    ($registry:expr, $name:expr, $help:expr) => {{
        let c = IntCounter::with_opts(Opts::new($name, $help).namespace("netbench")).unwrap();
        $registry.register(Box::new(c.clone())).unwrap();
        c
    }};
}

impl MetricsRegistry {
    pub fn new() -> Arc<Self> {
        let registry = Registry::new();

        let requests_total = new_counter!(registry, "requests_total", "Total number of requests attempted");
        let requests_failed = new_counter!(registry, "requests_failed", "Requests that did not succeed");
        let requests_error = new_counter!(registry, "requests_error", "Requests that failed with a transport/protocol error");
        let requests_aborted = new_counter!(registry, "requests_aborted", "Requests aborted by cancellation or deadline");
        let requests_blength = new_counter!(
            registry,
            "requests_failed_bodylength",
            "Requests whose response body was shorter than the established baseline"
        );

        let workers = Gauge::with_opts(Opts::new("workers", "Current live worker population").namespace("netbench")).unwrap();
        registry.register(Box::new(workers.clone())).unwrap();

        let response_bytes = Gauge::with_opts(
            Opts::new("response_bytes", "Length of the baseline-setting response, in bytes").namespace("netbench"),
        )
        .unwrap();
        registry.register(Box::new(response_bytes.clone())).unwrap();

        Arc::new(Self {
            start: Instant::now(),
            requests_total,
            requests_failed,
            requests_error,
            requests_aborted,
            requests_blength,
            workers,
            response_bytes,
            response_times: Mutex::new(ResponseTimeSummary::new()),
            response_codes: Mutex::new(HashMap::new()),
            registry,
            tolerance_bits: AtomicU64::new(0.0_f64.to_bits()),
        })
    }

    pub fn inc_requests_total(&self) {
        self.requests_total.inc();
    }
    pub fn inc_requests_failed(&self) {
        self.requests_failed.inc();
    }
    pub fn inc_requests_error(&self) {
        self.requests_error.inc();
    }
    pub fn inc_requests_aborted(&self) {
        self.requests_aborted.inc();
    }
    pub fn inc_requests_blength(&self) {
        self.requests_blength.inc();
    }

    pub fn observe_response_time_ns(&self, nanoseconds: f64) {
        self.response_times.lock().unwrap().observe(nanoseconds);
    }

    pub fn set_workers(&self, n: f64) {
        self.workers.set(n);
    }

    pub fn set_response_bytes(&self, n: f64) {
        self.response_bytes.set(n);
    }

    /// Returns the counter for `code`, creating and registering it on first
    /// use. Creation is serialized by `response_codes`'s mutex with
    /// double-checked presence; the returned handle can be cached by the
    /// caller and incremented lock-free from then on (spec.md §4.1).
    pub fn code_counter(&self, code: u16) -> IntCounter {
        {
            let map = self.response_codes.lock().unwrap();
            if let Some(c) = map.get(&code) {
                return c.clone();
            }
        }
        let mut map = self.response_codes.lock().unwrap();
        map.entry(code)
            .or_insert_with(|| {
                let c = IntCounter::with_opts(
                    Opts::new("response_codes", "Responses observed by status code")
                        .namespace("netbench")
                        .const_label("code", code.to_string()),
                )
                .unwrap();
                // A duplicate registration (same code observed concurrently
                // by two first-use racers) is harmless to ignore — the
                // counter itself isn't used for exposition identity here.
                let _ = self.registry.register(Box::new(c.clone()));
                c
            })
            .clone()
    }

    /// Sets the sanity-check tolerance, clamped to `[0, 1)`. A value `>= 1`
    /// (represented internally as exactly `1.0`) disables the check.
    pub fn set_tolerance(&self, tolerance: f64) {
        let clamped = if tolerance >= 1.0 { 1.0 } else { tolerance.max(0.0) };
        self.tolerance_bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    fn tolerance(&self) -> f64 {
        f64::from_bits(self.tolerance_bits.load(Ordering::Relaxed))
    }

    /// Reads every counter/gauge, computes derived fields, and runs the
    /// sanity check (skipped entirely when tolerance `>= 1`).
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests_total = self.requests_total.get();
        let requests_failed = self.requests_failed.get();
        let requests_error = self.requests_error.get();
        let requests_aborted = self.requests_aborted.get();
        let requests_blength = self.requests_blength.get();
        let workers = self.workers.get();
        let response_bytes = self.response_bytes.get();
        let duration = self.start.elapsed();

        let response_times: HashMap<String, f64> =
            self.response_times.lock().unwrap().snapshot().into_iter().collect();

        let response_codes: HashMap<String, u64> = {
            let map = self.response_codes.lock().unwrap();
            map.iter().map(|(code, c)| (code.to_string(), c.get() as u64)).collect()
        };

        let requests_per_sec = if duration.as_secs_f64() > 0.0 {
            requests_total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        let tolerance = self.tolerance();

        let snapshot = MetricsSnapshot {
            requests_total,
            requests_failed,
            requests_error,
            requests_aborted,
            requests_blength,
            workers,
            response_bytes,
            response_times,
            response_codes,
            duration,
            requests_per_sec,
            tolerance,
        };

        snapshot.sanity_check();
        snapshot
    }

    /// Serializes this registry's counters/gauges to Prometheus text
    /// exposition format, with the quantile summary appended by hand since
    /// the `prometheus` crate has no native Summary type.
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        let mut out = String::from_utf8(buffer).unwrap_or_else(|e| {
            error!(error = %e, "failed to encode metrics as UTF-8");
            String::new()
        });

        let summary = self.response_times.lock().unwrap();
        out.push_str("# HELP netbench_response_times Response latency in nanoseconds.\n");
        out.push_str("# TYPE netbench_response_times summary\n");
        for &q in &QUANTILES {
            let v = summary.quantile(q);
            out.push_str(&format!("netbench_response_times{{quantile=\"{q}\"}} {v}\n"));
        }
        out
    }
}

/// Starts the Prometheus metrics HTTP server, serving `/metrics` until the
/// process exits. Mirrors the teacher's `start_metrics_server`/`metrics_handler`.
pub async fn start_metrics_server(bind: &str, registry: Arc<MetricsRegistry>) {
    let addr = match bind.parse() {
        Ok(a) => a,
        Err(e) => {
            error!(bind, error = %e, "invalid --prometheus-bind address, metrics server disabled");
            return;
        }
    };

    let make_svc = make_service_fn(move |_conn| {
        let registry = registry.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let registry = registry.clone();
                async move { metrics_handler(req, registry).await }
            }))
        }
    });

    let server = Server::bind(&addr).serve(make_svc);
    info!(%addr, "Prometheus metrics server listening");
    if let Err(e) = server.await {
        error!(error = %e, "metrics server error");
    }
}

async fn metrics_handler(
    _req: Request<Body>,
    registry: Arc<MetricsRegistry>,
) -> Result<Response<Body>, hyper::Error> {
    let body = registry.gather_text();
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap())
}

/// A point-in-time read of every metric, returned by [`MetricsRegistry::snapshot`]
/// and handed to the (external) formatter. Field names match spec.md §6's
/// JSON report field list exactly.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_failed: u64,
    pub requests_error: u64,
    #[serde(rename = "requests_failed_bodylength")]
    pub requests_blength: u64,
    pub requests_aborted: u64,
    pub workers: f64,
    pub response_bytes: f64,
    /// Nanoseconds, keyed by quantile label ("0", "0.25", ..., "1"); `-1` if
    /// the quantile has no observations.
    pub response_times: HashMap<String, f64>,
    /// Keyed by decimal status code string.
    pub response_codes: HashMap<String, u64>,
    #[serde(serialize_with = "serialize_duration_secs")]
    pub duration: std::time::Duration,
    pub requests_per_sec: f64,
    pub tolerance: f64,
}

fn serialize_duration_secs<S>(d: &std::time::Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

impl MetricsSnapshot {
    /// Cross-checks the counters for gross skew, per spec.md §3's invariants.
    /// Never fails the run — mismatches within tolerance log at debug,
    /// mismatches beyond it log at warn. Skipped entirely when `tolerance >= 1`.
    fn sanity_check(&self) {
        if self.tolerance >= 1.0 {
            return;
        }

        let non_2xx_codes: u64 = self
            .response_codes
            .iter()
            .filter_map(|(code, count)| {
                let code: u32 = code.parse().ok()?;
                if !(200..=299).contains(&code) {
                    Some(*count)
                } else {
                    None
                }
            })
            .sum();
        let twoxx_codes: u64 = self
            .response_codes
            .iter()
            .filter_map(|(code, count)| {
                let code: u32 = code.parse().ok()?;
                if (200..=299).contains(&code) {
                    Some(*count)
                } else {
                    None
                }
            })
            .sum();

        let expected_failed = self.requests_error + self.requests_blength + self.requests_aborted + non_2xx_codes;
        let expected_total = expected_failed + twoxx_codes;

        let slack = self.tolerance * self.requests_total as f64;

        let failed_delta = (self.requests_failed as f64 - expected_failed as f64).abs();
        let total_delta = (self.requests_total as f64 - expected_total as f64).abs();

        if failed_delta > slack {
            warn!(
                requests_failed = self.requests_failed,
                expected_failed,
                tolerance = self.tolerance,
                "sanity check: requests_failed diverges from its components beyond tolerance"
            );
        } else {
            tracing::debug!(requests_failed = self.requests_failed, expected_failed, "sanity check: requests_failed within tolerance");
        }

        if total_delta > slack {
            warn!(
                requests_total = self.requests_total,
                expected_total,
                tolerance = self.tolerance,
                "sanity check: requests_total diverges from its components beyond tolerance"
            );
        } else {
            tracing::debug!(requests_total = self.requests_total, expected_total, "sanity check: requests_total within tolerance");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_registry_snapshot_is_all_zero() {
        let registry = MetricsRegistry::new();
        let snap = registry.snapshot();
        assert_eq!(snap.requests_total, 0);
        assert_eq!(snap.requests_failed, 0);
        assert_eq!(snap.workers, 0.0);
        assert_eq!(snap.response_times.get("0.5"), Some(&-1.0));
    }

    #[test]
    fn counters_are_monotonic_across_snapshots() {
        let registry = MetricsRegistry::new();
        registry.inc_requests_total();
        let first = registry.snapshot().requests_total;
        registry.inc_requests_total();
        registry.inc_requests_total();
        let second = registry.snapshot().requests_total;
        assert!(second >= first);
        assert_eq!(second, 3);
    }

    #[test]
    fn code_counter_is_idempotent_and_incrementable() {
        let registry = MetricsRegistry::new();
        registry.code_counter(200).inc();
        registry.code_counter(200).inc();
        registry.code_counter(404).inc();
        let snap = registry.snapshot();
        assert_eq!(snap.response_codes.get("200"), Some(&2));
        assert_eq!(snap.response_codes.get("404"), Some(&1));
    }

    #[test]
    fn tolerance_ge_one_disables_sanity_check() {
        let registry = MetricsRegistry::new();
        registry.set_tolerance(1.0);
        registry.inc_requests_total();
        registry.inc_requests_failed();
        // Deliberately inconsistent: failed without any matching component.
        // sanity_check() should not panic and the snapshot should still work.
        let snap = registry.snapshot();
        assert_eq!(snap.tolerance, 1.0);
    }

    #[test]
    fn set_tolerance_clamps_to_0_1_range() {
        let registry = MetricsRegistry::new();
        registry.set_tolerance(-0.5);
        assert_eq!(registry.tolerance(), 0.0);
        registry.set_tolerance(5.0);
        assert_eq!(registry.tolerance(), 1.0);
        registry.set_tolerance(0.2);
        assert_eq!(registry.tolerance(), 0.2);
    }

    #[test]
    fn exposition_text_contains_core_metric_names() {
        let registry = MetricsRegistry::new();
        registry.inc_requests_total();
        let text = registry.gather_text();
        assert!(text.contains("netbench_requests_total"));
        assert!(text.contains("netbench_response_times"));
    }
}
