//! netbench — a load generator driving a time-varying worker population
//! against a single HTTP or raw-socket target.
//!
//! This binary is the thin Orchestrator (spec.md §4.4): parse CLI, build
//! config, install the signal handler, start the Scaler under a root
//! cancellation + deadline, await drain, snapshot metrics, print the report.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use netbench::cli::Cli;
use netbench::config::{Config, OutputFormat};
use netbench::metrics::MetricsRegistry;
use netbench::scaler::Scaler;
use netbench::{client, logging, metrics, report, signal};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("netbench: {e}");
            return ExitCode::FAILURE;
        }
    };

    run(config).await
}

async fn run(config: Config) -> ExitCode {
    let metrics = MetricsRegistry::new();

    let root_token = CancellationToken::new();
    signal::install(root_token.clone());

    if config.prometheus.enabled {
        let bind = config.prometheus.bind.clone();
        let metrics = metrics.clone();
        tokio::spawn(async move {
            metrics::start_metrics_server(&bind, metrics).await;
        });
    }

    let http_client = match client::build_client(&config.worker.http) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("netbench: failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let worker_config = Arc::new(config.worker);
    let mut scaler = Scaler::new(config.scaler, worker_config, metrics.clone(), http_client);

    let scaler_token = root_token.clone();
    let scaler_task = tokio::spawn(async move {
        scaler.run(scaler_token).await;
    });

    info!(duration = ?config.duration, "netbench run starting");
    tokio::select! {
        _ = tokio::time::sleep(config.duration) => {
            info!("run duration elapsed");
        }
        _ = root_token.cancelled() => {
            info!("run cancelled externally");
        }
    }
    root_token.cancel();

    if let Err(e) = scaler_task.await {
        error!(error = %e, "scaler task ended abnormally");
    }

    let snapshot = metrics.snapshot();
    let rendered = match config.format {
        OutputFormat::Text => report::render_text(&snapshot),
        OutputFormat::Json => match report::render_json(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("netbench: failed to render JSON report: {e}");
                return ExitCode::FAILURE;
            }
        },
    };
    println!("{rendered}");

    ExitCode::SUCCESS
}
