//! Error taxonomy for the core control loop.
//!
//! A [`WorkerOutcome`] classifies the result of a single `do_one()` attempt;
//! the outer worker frame (see [`crate::worker`]) turns it into counter
//! increments. `ConfigError` covers startup validation, which is fatal.

use thiserror::Error;

/// Classification of a single worker attempt, per the error taxonomy in
/// the core specification. Exactly one counter increment follows from
/// each variant, applied by the caller in [`crate::worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// 2xx (or, for Net workers, a completed read) with a body at or above
    /// `baseline_blen`.
    Success,
    /// A response was received but its status code fell outside `[200,299]`.
    StatusMismatch,
    /// A 2xx/completed response arrived but its body was shorter than
    /// `baseline_blen`.
    BodyLengthMismatch,
    /// Cancellation or a deadline fired while the attempt was in flight.
    Aborted,
    /// Any other transport or protocol failure.
    Error,
}

impl WorkerOutcome {
    /// True for every outcome other than `Success` — drives `requests_failed`.
    pub fn is_failure(self) -> bool {
        !matches!(self, WorkerOutcome::Success)
    }
}

/// Fatal startup configuration errors. Printed to stderr and the process
/// exits non-zero before any core component starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("target URI is required (--target)")]
    MissingTarget,

    #[error("invalid target URI '{0}': {1}")]
    InvalidTarget(String, String),

    #[error("unsupported target scheme '{0}', expected one of: http, https, tcp, udp, unix")]
    UnsupportedScheme(String),

    #[error("invalid scaler shape '{0}', expected one of: curve, exponential, linear, logarithmic, sine, static")]
    InvalidShape(String),

    #[error("invalid duration for {field}: {message}")]
    InvalidDuration { field: String, message: String },

    #[error("invalid header '{0}', expected 'Name:Value'")]
    InvalidHeader(String),

    #[error("invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("scaler-min ({min}) must be <= scaler-max ({max})")]
    InvalidBounds { min: u64, max: u64 },

    #[error("invalid output format '{0}', expected 'text' or 'json'")]
    InvalidFormat(String),
}
