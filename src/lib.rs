//! Core library for netbench: the Metrics Registry, Worker, Scaler, and
//! Shape functions described in this repository's specification, plus the
//! ambient config/CLI/report/logging/signal collaborators around them.
//!
//! Split into a library so the binary (`src/main.rs`) stays a thin
//! Orchestrator and integration tests under `tests/` can exercise the core
//! directly.

pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod percentiles;
pub mod report;
pub mod scaler;
pub mod shapes;
pub mod signal;
pub mod sync;
pub mod utils;
pub mod worker;
