//! Integration tests exercising the Scaler + Worker + Metrics Registry
//! together against a real local HTTP server, covering the named Scenarios
//! and cross-component properties from this repository's specification.

use std::collections::HashMap;
use std::time::Duration;

use netbench::cli::Cli;
use netbench::config::{HttpOpts, NetOpts, ScalerConfig, TargetUri, WorkerConfig};
use netbench::metrics::MetricsRegistry;
use netbench::scaler::Scaler;
use netbench::shapes::Shape;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn worker_config_for(target: &str) -> std::sync::Arc<WorkerConfig> {
    std::sync::Arc::new(WorkerConfig {
        target: TargetUri::parse(target).unwrap(),
        payload: None,
        http: HttpOpts {
            method: "GET".to_string(),
            headers: HashMap::new(),
            follow_redirects: false,
            timeout: Duration::from_secs(2),
        },
        net: NetOpts { timeout: Duration::from_millis(200) },
        sync: false,
    })
}

/// Scenario 1 — a zero-duration, zero-factor static run produces zero
/// workers and zero requests and exits cleanly.
#[tokio::test]
async fn scenario_1_zero_duration_zero_factor_is_a_clean_noop() {
    let cli = Cli::parse_from([
        "netbench",
        "--target",
        "http://localhost:1/",
        "--duration",
        "0s",
        "--scaler",
        "static",
        "--scaler-factor",
        "0",
    ]);
    let config = cli.into_config().unwrap();
    assert_eq!(config.duration, Duration::ZERO);

    let metrics = MetricsRegistry::new();
    let worker_config = worker_config_for("http://localhost:1/");
    let mut scaler = Scaler::new(config.scaler, worker_config, metrics.clone(), reqwest::Client::new());

    let token = CancellationToken::new();
    let scaler_task = tokio::spawn(async move {
        scaler.run(token).await;
    });

    tokio::time::sleep(config.duration).await;
    scaler_task.abort();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.workers, 0.0);
    assert_eq!(snapshot.requests_total, 0);
}

/// Scenario 2 — a static shape with factor 3 reaches a 3-worker population
/// and accumulates at least 3 requests against a real server within the
/// run window.
#[tokio::test]
async fn scenario_2_static_factor_three_reaches_three_workers() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_string("ok")).mount(&server).await;

    let target = format!("http://{}/", server.address());
    let config = ScalerConfig::new(Shape::Static, Duration::from_millis(200), 3.0, 0, 10).unwrap();
    let metrics = MetricsRegistry::new();
    let worker_config = worker_config_for(&target);
    let mut scaler = Scaler::new(config, worker_config, metrics.clone(), reqwest::Client::new());

    let token = CancellationToken::new();
    let run_token = token.clone();
    let scaler_task = tokio::spawn(async move {
        scaler.run(run_token).await;
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    token.cancel();
    scaler_task.await.unwrap();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.workers, 0.0, "drained after cancellation");
    assert!(snapshot.requests_total >= 3, "expected at least 3 requests, got {}", snapshot.requests_total);
}

/// Scenario 5 — a 404 response bumps `requests_failed` and the 404 code
/// counter, without touching `requests_blength`.
#[tokio::test]
async fn scenario_5_http_404_counts_as_failed_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

    let target = format!("http://{}/", server.address());
    let config = ScalerConfig::new(Shape::Static, Duration::from_millis(100), 1.0, 0, 1).unwrap();
    let metrics = MetricsRegistry::new();
    let worker_config = worker_config_for(&target);
    let mut scaler = Scaler::new(config, worker_config, metrics.clone(), reqwest::Client::new());

    let token = CancellationToken::new();
    let run_token = token.clone();
    let scaler_task = tokio::spawn(async move {
        scaler.run(run_token).await;
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    token.cancel();
    scaler_task.await.unwrap();

    let snapshot = metrics.snapshot();
    assert!(snapshot.requests_failed > 0);
    assert_eq!(snapshot.requests_blength, 0);
    assert!(snapshot.response_codes.get("404").copied().unwrap_or(0) > 0);
}

/// Property 5 — code-counter bookkeeping: the sum of per-code counters never
/// exceeds `requests_total`.
#[tokio::test]
async fn property_5_code_counters_never_exceed_requests_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_string("ok")).mount(&server).await;

    let target = format!("http://{}/", server.address());
    let config = ScalerConfig::new(Shape::Static, Duration::from_millis(100), 2.0, 0, 5).unwrap();
    let metrics = MetricsRegistry::new();
    let worker_config = worker_config_for(&target);
    let mut scaler = Scaler::new(config, worker_config, metrics.clone(), reqwest::Client::new());

    let token = CancellationToken::new();
    let run_token = token.clone();
    let scaler_task = tokio::spawn(async move {
        scaler.run(run_token).await;
    });

    tokio::time::sleep(Duration::from_millis(800)).await;
    token.cancel();
    scaler_task.await.unwrap();

    let snapshot = metrics.snapshot();
    let code_sum: u64 = snapshot.response_codes.values().sum();
    assert!(code_sum <= snapshot.requests_total);
}

/// Property 4 — monotonic counters across a sequence of snapshots.
#[tokio::test]
async fn property_4_counters_are_monotonic_across_a_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_string("ok")).mount(&server).await;

    let target = format!("http://{}/", server.address());
    let config = ScalerConfig::new(Shape::Static, Duration::from_millis(100), 2.0, 0, 5).unwrap();
    let metrics = MetricsRegistry::new();
    let worker_config = worker_config_for(&target);
    let mut scaler = Scaler::new(config, worker_config, metrics.clone(), reqwest::Client::new());

    let token = CancellationToken::new();
    let run_token = token.clone();
    let scaler_task = tokio::spawn(async move {
        scaler.run(run_token).await;
    });

    let mut last = 0u64;
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let total = metrics.snapshot().requests_total;
        assert!(total >= last);
        last = total;
    }

    token.cancel();
    scaler_task.await.unwrap();
}
