//! Streaming quantile summary for `response_times`, backed by HdrHistogram —
//! the same library the teacher reaches for (`hdrhistogram`), trimmed to the
//! single latency stream the core needs instead of a per-endpoint LRU of them.

use hdrhistogram::Histogram;
use tracing::warn;

/// The quantile set and target errors the core reports, per spec.md §4.1.
pub const QUANTILES: [f64; 7] = [0.0, 0.25, 0.5, 0.75, 0.9, 0.99, 1.0];

/// Thread-safe streaming quantile estimator over response latencies,
/// expressed in nanoseconds. Caller (the Metrics Registry) owns the mutex.
pub struct ResponseTimeSummary {
    histogram: Histogram<u64>,
}

impl ResponseTimeSummary {
    /// Tracks 1ns to 60s with 3 significant digits, matching the teacher's
    /// `PercentileTracker` bounds (there: 1us-60s) scaled down one order of
    /// magnitude for nanosecond-resolution `response_times`.
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, 60_000_000_000, 3)
            .expect("valid histogram bounds");
        Self { histogram }
    }

    pub fn observe(&mut self, nanoseconds: f64) {
        if !nanoseconds.is_finite() || nanoseconds < 0.0 {
            warn!(nanoseconds, "discarding non-finite/negative latency observation");
            return;
        }
        let clamped = (nanoseconds as u64).clamp(1, 60_000_000_000);
        if let Err(e) = self.histogram.record(clamped) {
            warn!(nanoseconds, error = %e, "failed to record latency in histogram");
        }
    }

    /// Quantile value in nanoseconds, or `-1.0` if no observations exist yet
    /// (spec.md §3/§4.1: "-1 if the quantile has no observations").
    pub fn quantile(&self, q: f64) -> f64 {
        if self.histogram.is_empty() {
            return -1.0;
        }
        let v = self.histogram.value_at_quantile(q) as f64;
        if v.is_nan() {
            -1.0
        } else {
            v
        }
    }

    /// All quantiles in [`QUANTILES`], keyed by their shortest decimal label
    /// (`f64`'s `Display` already yields `"0"`, `"0.5"`, `"1"`, ... — no
    /// trailing-zero trimming needed).
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        QUANTILES.iter().map(|&q| (q.to_string(), self.quantile(q))).collect()
    }
}

impl Default for ResponseTimeSummary {
    fn default() -> Self {
        Self::new()
    }
}
