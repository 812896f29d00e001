//! Streaming anomaly detectors.
//!
//! Every variant keeps a [`RollingWindow`] of recent samples and answers one
//! question per sample: does it deviate abnormally from the window? The
//! sample is scored against the window as it stood before the sample arrived
//! and is admitted afterwards, so a value never dilutes its own baseline.
//!
//! | Variant | Warm-up | Zero variance |
//! |---------|---------|---------------|
//! | [`RollingDetector`] | silent until the window is full | any deviation flags |
//! | [`ZScoreDetector`] | silent until the window is full | never flags |
//! | [`AdaptiveDetector`] | none, scores from the first sample | std dev floored at 0.1 |

pub mod adaptive;
pub mod rolling;
pub mod zscore;

pub use adaptive::AdaptiveDetector;
pub use rolling::RollingDetector;
pub use zscore::ZScoreDetector;

use crate::error::{Result, ensure_all_finite};
use crate::window::RollingWindow;

/// Capability set shared by all detector variants.
///
/// Callers drive a detector strictly sequentially; no call overlaps another
/// on the same instance, so implementations carry no locking.
pub trait Detector {
    /// Short stable identifier, e.g. `"z_score"`.
    fn name(&self) -> &'static str;

    /// Seed the detector with historical data before live scoring.
    ///
    /// The default accepts and ignores the history after checking it.
    fn seed(&mut self, history: &[f64]) -> Result<()> {
        ensure_all_finite(history)
    }

    /// Score `value`, then admit it into the window.
    ///
    /// Non-finite input is rejected with `InvalidSample` and leaves the
    /// detector untouched.
    fn detect(&mut self, value: f64) -> Result<bool>;

    fn window(&self) -> &RollingWindow;

    /// Mean of the current window.
    fn mean(&self) -> f64;

    /// Standard deviation of the current window.
    fn std_dev(&self) -> f64;

    /// Current cutoff: a sigma multiple for the fixed variants, the live
    /// z-score threshold for the adaptive one.
    fn threshold(&self) -> f64;

    /// Samples admitted through `seed` and `detect`.
    fn samples_seen(&self) -> u64;

    fn is_warmed_up(&self) -> bool {
        self.window().is_full()
    }
}

/// A detector chosen by configuration.
#[derive(Debug, Clone)]
pub enum AnyDetector {
    Rolling(RollingDetector),
    ZScore(ZScoreDetector),
    Adaptive(AdaptiveDetector),
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $body:expr) => {
        match $self {
            AnyDetector::Rolling($d) => $body,
            AnyDetector::ZScore($d) => $body,
            AnyDetector::Adaptive($d) => $body,
        }
    };
}

impl Detector for AnyDetector {
    fn name(&self) -> &'static str {
        dispatch!(self, d => d.name())
    }

    fn seed(&mut self, history: &[f64]) -> Result<()> {
        dispatch!(self, d => d.seed(history))
    }

    fn detect(&mut self, value: f64) -> Result<bool> {
        dispatch!(self, d => d.detect(value))
    }

    fn window(&self) -> &RollingWindow {
        dispatch!(self, d => d.window())
    }

    fn mean(&self) -> f64 {
        dispatch!(self, d => d.mean())
    }

    fn std_dev(&self) -> f64 {
        dispatch!(self, d => d.std_dev())
    }

    fn threshold(&self) -> f64 {
        dispatch!(self, d => d.threshold())
    }

    fn samples_seen(&self) -> u64 {
        dispatch!(self, d => d.samples_seen())
    }

    fn is_warmed_up(&self) -> bool {
        dispatch!(self, d => d.is_warmed_up())
    }
}

impl From<RollingDetector> for AnyDetector {
    fn from(d: RollingDetector) -> Self {
        Self::Rolling(d)
    }
}

impl From<ZScoreDetector> for AnyDetector {
    fn from(d: ZScoreDetector) -> Self {
        Self::ZScore(d)
    }
}

impl From<AdaptiveDetector> for AnyDetector {
    fn from(d: AdaptiveDetector) -> Self {
        Self::Adaptive(d)
    }
}
