//! Command-line surface. Parsing and final-output formatting are external
//! collaborators to the core (spec.md §1); this module is their narrow
//! boundary — it turns `std::env::args()` into the typed [`crate::config::Config`]
//! the core actually runs on.

use clap::Parser;

use crate::config::{
    decode_payload, parse_header_pairs, Config, HttpOpts, NetOpts, OutputFormat, PrometheusConfig,
    ScalerConfig, TargetUri, WorkerConfig,
};
use crate::errors::ConfigError;
use crate::shapes::Shape;
use crate::utils::parse_duration_string;

/// netbench — a load generator driving a time-varying worker population
/// against a single HTTP or raw-socket target.
#[derive(Parser, Debug)]
#[command(name = "netbench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drives a scaling population of workers against one target")]
pub struct Cli {
    /// Duration of the benchmark run, e.g. "15m", "90s".
    #[arg(long, default_value = "15m")]
    pub duration: String,

    /// Final report format.
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Target URI to benchmark (scheme://host[:port][/path]).
    /// Supported schemes: http, https, tcp, udp, unix.
    #[arg(long, default_value = "")]
    pub target: String,

    /// Optional base64-encoded payload sent as the request body / socket payload.
    #[arg(long)]
    pub payload: Option<String>,

    /// HTTP method to use.
    #[arg(long = "http-method", default_value = "GET")]
    pub http_method: String,

    /// HTTP header in "Name:Value" form; repeatable.
    #[arg(long = "http-header")]
    pub http_header: Vec<String>,

    /// Follow HTTP redirects instead of returning them as-is.
    #[arg(long = "http-follow")]
    pub http_follow: bool,

    /// Per-request timeout for the HTTP worker.
    #[arg(long = "http-timeout", default_value = "5s")]
    pub http_timeout: String,

    /// Per-request timeout for the Net (TCP/UDP/UNIX) worker.
    #[arg(long = "net-timeout", default_value = "200ms")]
    pub net_timeout: String,

    /// Barrier-synchronize worker pacing (lockstep request issuance).
    #[arg(long)]
    pub sync: bool,

    /// Scaler shape: curve, exponential, linear, logarithmic, sine, static.
    #[arg(long = "scaler", default_value = "curve")]
    pub scaler: String,

    /// Time to wait between scaler adjustments.
    #[arg(long = "scaler-period", default_value = "1m")]
    pub scaler_period: String,

    /// Scaling factor; meaning depends on shape (see --scaler).
    #[arg(long = "scaler-factor", default_value = "1.5")]
    pub scaler_factor: f64,

    /// Minimum worker population (ignored by the static shape).
    #[arg(long = "scaler-min", default_value = "0")]
    pub scaler_min: u64,

    /// Maximum worker population (ignored by the static shape).
    #[arg(long = "scaler-max", default_value = "16")]
    pub scaler_max: u64,

    /// Enable the Prometheus metrics exposition server.
    #[arg(long)]
    pub prometheus: bool,

    /// Address to bind the Prometheus metrics server.
    #[arg(long = "prometheus-bind", default_value = "0.0.0.0:9090")]
    pub prometheus_bind: String,
}

impl Cli {
    /// Validates and converts the parsed flags into a [`Config`]. All
    /// fallible parsing happens here, never inside the core.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let duration = parse_duration_string(&self.duration)
            .map_err(|message| ConfigError::InvalidDuration { field: "duration".to_string(), message })?;
        let format: OutputFormat = self.format.parse()?;

        let target = TargetUri::parse(&self.target)?;
        let payload = decode_payload(self.payload.as_deref())?;
        let headers = parse_header_pairs(&self.http_header)?;

        let http_timeout = parse_duration_string(&self.http_timeout)
            .map_err(|message| ConfigError::InvalidDuration { field: "http-timeout".to_string(), message })?;
        let net_timeout = parse_duration_string(&self.net_timeout)
            .map_err(|message| ConfigError::InvalidDuration { field: "net-timeout".to_string(), message })?;

        let shape: Shape = self.scaler.parse()?;
        let scaler_period = parse_duration_string(&self.scaler_period)
            .map_err(|message| ConfigError::InvalidDuration { field: "scaler-period".to_string(), message })?;
        let scaler = ScalerConfig::new(shape, scaler_period, self.scaler_factor, self.scaler_min, self.scaler_max)?;

        let worker = WorkerConfig {
            target,
            payload,
            http: HttpOpts {
                method: self.http_method,
                headers,
                follow_redirects: self.http_follow,
                timeout: http_timeout,
            },
            net: NetOpts { timeout: net_timeout },
            sync: self.sync,
        };

        Ok(Config {
            duration,
            format,
            scaler,
            worker,
            prometheus: PrometheusConfig { enabled: self.prometheus, bind: self.prometheus_bind },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec!["netbench", "--target", "http://localhost:8080/"]
    }

    #[test]
    fn defaults_produce_a_valid_config() {
        let cli = Cli::parse_from(base_args());
        let config = cli.into_config().unwrap();
        assert_eq!(config.duration, std::time::Duration::from_secs(15 * 60));
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn missing_target_is_fatal() {
        let cli = Cli::parse_from(vec!["netbench"]);
        assert!(matches!(cli.into_config(), Err(ConfigError::MissingTarget)));
    }

    #[test]
    fn repeated_headers_are_collected() {
        let mut args = base_args();
        args.extend(["--http-header", "X-A:1", "--http-header", "X-B:2"]);
        let cli = Cli::parse_from(args);
        let config = cli.into_config().unwrap();
        assert_eq!(config.worker.http.headers.get("X-A").unwrap(), "1");
        assert_eq!(config.worker.http.headers.get("X-B").unwrap(), "2");
    }
}
