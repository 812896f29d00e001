//! Error types shared by windows, detectors and the pipeline.

use thiserror::Error;

/// Errors raised by the scoring engine.
///
/// Zero variance inside a window is not an error; each detector resolves it
/// with its own policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VigilError {
    /// A construction parameter is out of range. Raised eagerly, never clamped.
    #[error("Invalid configuration: {field} - {reason}")]
    Configuration { field: &'static str, reason: String },

    /// A sample that cannot enter the statistics (NaN or infinite).
    #[error("Invalid sample: {value} is not a finite number")]
    InvalidSample { value: f64 },
}

impl VigilError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for scoring-engine operations.
pub type Result<T> = std::result::Result<T, VigilError>;

/// Rejects non-finite samples before they reach any accumulator.
pub(crate) fn ensure_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(VigilError::InvalidSample { value })
    }
}

/// Checks a whole slice so callers can validate before mutating anything.
pub(crate) fn ensure_all_finite(values: &[f64]) -> Result<()> {
    values.iter().try_for_each(|&v| ensure_finite(v).map(|_| ()))
}
