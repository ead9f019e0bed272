//! Process-wide log sink: the external collaborator spec.md §6 names,
//! configured from `LOG_LEVEL`/`LOG_FORMAT` the way the original's zap
//! logger reads them, re-expressed over `tracing`/`tracing-subscriber`.

use std::env;

use tracing_subscriber::EnvFilter;

/// Maps the original's zap level names onto `tracing` levels. `tracing` has
/// no `fatal`/`panic`/`dpanic` levels, so they collapse to `error`.
fn level_from_env() -> &'static str {
    match env::var("LOG_LEVEL").unwrap_or_default().to_ascii_lowercase().as_str() {
        "fatal" | "panic" | "dpanic" | "error" => "error",
        "warn" => "warn",
        "info" => "info",
        "debug" => "debug",
        "trace" => "trace",
        _ => "warn",
    }
}

/// Installs the global `tracing` subscriber. Must be called exactly once,
/// before any component logs.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_from_env()));
    let json = env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
