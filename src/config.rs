//! Typed configuration for the core, built once from parsed CLI flags and
//! validated before any component starts (see [`crate::cli`]).

use std::collections::HashMap;

use tokio::time::Duration;

use crate::errors::ConfigError;
use crate::shapes::Shape;

/// Top-level configuration for one benchmark run.
#[derive(Debug, Clone)]
pub struct Config {
    pub duration: Duration,
    pub format: OutputFormat,
    pub scaler: ScalerConfig,
    pub worker: WorkerConfig,
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::InvalidFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    pub enabled: bool,
    pub bind: String,
}

/// Configuration for the Scaler: which shape to follow, how often to tick,
/// and the factor/bounds the shape is evaluated against.
#[derive(Debug, Clone)]
pub struct ScalerConfig {
    pub shape: Shape,
    pub period: Duration,
    pub factor: f64,
    pub min: u64,
    pub max: u64,
}

impl ScalerConfig {
    pub fn new(shape: Shape, period: Duration, factor: f64, min: u64, max: u64) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidBounds { min, max });
        }
        Ok(Self { shape, period, factor, min, max })
    }

    /// The effective `(min, max)` clamp for this run: `static` pins both ends
    /// to `factor`, overriding whatever bounds were configured (spec.md §3).
    pub fn effective_bounds(&self) -> (f64, f64) {
        if matches!(self.shape, Shape::Static) {
            (self.factor, self.factor)
        } else {
            (self.min as f64, self.max as f64)
        }
    }
}

/// The wire scheme a [`TargetUri`] resolves to, selecting the worker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScheme {
    Http,
    Https,
    Tcp,
    Udp,
    Unix,
}

impl TargetScheme {
    pub fn is_http(self) -> bool {
        matches!(self, TargetScheme::Http | TargetScheme::Https)
    }
}

/// A parsed `--target` URI, decomposed into scheme and address per
/// spec.md §3 (`WorkerConfig.target: URI`).
#[derive(Debug, Clone)]
pub struct TargetUri {
    pub scheme: TargetScheme,
    /// For HTTP(S): the full URL. For Net: `host:port` (tcp/udp) or the
    /// filesystem path (unix).
    pub address: String,
    pub raw: String,
}

impl TargetUri {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::MissingTarget);
        }
        let (scheme_str, rest) = raw
            .split_once("://")
            .ok_or_else(|| ConfigError::InvalidTarget(raw.to_string(), "missing '://'".to_string()))?;

        let scheme = match scheme_str {
            "http" => TargetScheme::Http,
            "https" => TargetScheme::Https,
            "tcp" => TargetScheme::Tcp,
            "udp" => TargetScheme::Udp,
            "unix" => TargetScheme::Unix,
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        if rest.is_empty() {
            return Err(ConfigError::InvalidTarget(raw.to_string(), "empty address".to_string()));
        }

        let address = if scheme.is_http() {
            raw.to_string()
        } else {
            rest.to_string()
        };

        Ok(Self { scheme, address, raw: raw.to_string() })
    }
}

/// HTTP-specific worker configuration.
#[derive(Debug, Clone)]
pub struct HttpOpts {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub follow_redirects: bool,
    pub timeout: Duration,
}

/// Net (TCP/UDP/UNIX)-specific worker configuration.
#[derive(Debug, Clone)]
pub struct NetOpts {
    pub timeout: Duration,
}

/// Full worker configuration: the target, the decoded payload, and the
/// protocol-specific sub-configs. Only one of `http`/`net` is meaningful,
/// selected by `target.scheme`.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub target: TargetUri,
    pub payload: Option<Vec<u8>>,
    pub http: HttpOpts,
    pub net: NetOpts,
    pub sync: bool,
}

/// Decodes a base64 payload string exactly once, at construction, per
/// spec.md §3. Returns `None` for an empty/absent string.
pub fn decode_payload(b64: Option<&str>) -> Result<Option<Vec<u8>>, ConfigError> {
    use base64::Engine;
    match b64 {
        Some(s) if !s.is_empty() => {
            let bytes = base64::engine::general_purpose::STANDARD.decode(s)?;
            Ok(Some(bytes))
        }
        _ => Ok(None),
    }
}

/// Parses `"Name:Value"` header pairs, same shape as the Go flag package's
/// repeated `-http-header` values.
pub fn parse_header_pairs(pairs: &[String]) -> Result<HashMap<String, String>, ConfigError> {
    let mut headers = HashMap::new();
    for pair in pairs {
        let (name, value) = pair
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidHeader(pair.clone()))?;
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidHeader(pair.clone()));
        }
        headers.insert(name.to_string(), value.to_string());
    }
    Ok(headers)
}
