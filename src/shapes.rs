//! Pure shape functions mapping a scaler tick to a target worker population.
//!
//! Kept allocation-free and side-effect-free so the Scaler's hot tick path
//! never has to reason about anything but the returned `f64`; `Scaler`
//! clamps and rounds the result (see [`crate::scaler`]).

use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// One of the six load shapes a [`crate::config::ScalerConfig`] selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Curve,
    Exponential,
    Linear,
    Logarithmic,
    Sine,
    Static,
}

impl FromStr for Shape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "curve" => Ok(Shape::Curve),
            "exponential" | "exp" => Ok(Shape::Exponential),
            "linear" => Ok(Shape::Linear),
            "logarithmic" | "log" => Ok(Shape::Logarithmic),
            "sine" | "sin" => Ok(Shape::Sine),
            "static" => Ok(Shape::Static),
            _ => Err(ConfigError::InvalidShape(s.to_string())),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Shape::Curve => "curve",
            Shape::Exponential => "exponential",
            Shape::Linear => "linear",
            Shape::Logarithmic => "logarithmic",
            Shape::Sine => "sine",
            Shape::Static => "static",
        };
        write!(f, "{s}")
    }
}

/// Evaluates a shape at `step` with the given `factor`, using `max` as the
/// sine shape's amplitude. This is the raw value — callers still need to
/// `abs()`, clamp to `[min, max]`, and round it (see [`crate::scaler::Scaler::reconcile`]).
pub fn evaluate(shape: Shape, step: f64, factor: f64, max: f64) -> f64 {
    match shape {
        Shape::Curve => step.powf(factor),
        Shape::Exponential => step.exp() * factor,
        Shape::Linear => step * factor,
        Shape::Logarithmic => step.ln() * factor,
        Shape::Sine => (step / factor).sin() * max,
        Shape::Static => factor,
    }
}
