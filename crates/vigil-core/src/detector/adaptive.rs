use tracing::trace;

use crate::config::{check_adaptive, check_window_size};
use crate::detector::Detector;
use crate::error::{Result, ensure_finite};
use crate::window::RollingWindow;

/// Lower bound on the standard deviation used as a z-score divisor.
pub const STD_DEV_FLOOR: f64 = 0.1;

/// Adaptive-threshold detector.
///
/// Scores `z = |x - mean| / max(std_dev, 0.1)` against a threshold that
/// tracks normal traffic by exponential smoothing:
///
/// ```text
/// threshold = max(minimum, (1 - rate) * threshold + rate * z)
/// ```
///
/// The update runs only for samples that were *not* flagged, so a burst of
/// outliers cannot desensitize the detector. There is no warm-up: the very
/// first samples are scored against a nearly empty window and may be flagged.
#[derive(Debug, Clone)]
pub struct AdaptiveDetector {
    window: RollingWindow,
    threshold: f64,
    adaptation_rate: f64,
    minimum_threshold: f64,
    mean: f64,
    std_dev: f64,
    last_z_score: f64,
    samples_seen: u64,
}

impl AdaptiveDetector {
    pub fn new(
        window_size: usize,
        initial_threshold: f64,
        adaptation_rate: f64,
        minimum_threshold: f64,
    ) -> Result<Self> {
        check_window_size(window_size)?;
        check_adaptive(initial_threshold, adaptation_rate, minimum_threshold)?;

        Ok(Self {
            window: RollingWindow::new(window_size)?,
            threshold: initial_threshold,
            adaptation_rate,
            minimum_threshold,
            mean: 0.0,
            std_dev: STD_DEV_FLOOR,
            last_z_score: 0.0,
            samples_seen: 0,
        })
    }

    pub fn adaptation_rate(&self) -> f64 {
        self.adaptation_rate
    }

    pub fn minimum_threshold(&self) -> f64 {
        self.minimum_threshold
    }

    /// Absolute z-score of the most recent sample.
    pub fn last_z_score(&self) -> f64 {
        self.last_z_score
    }

    fn refresh_stats(&mut self) {
        self.mean = self.window.mean();
        self.std_dev = self.window.std_dev().max(STD_DEV_FLOOR);
    }
}

impl Detector for AdaptiveDetector {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    /// Prime the window with the tail of `history`. The threshold is left
    /// alone: it only learns from scored samples.
    fn seed(&mut self, history: &[f64]) -> Result<()> {
        self.window.refill(history)?;
        self.refresh_stats();
        self.samples_seen = history.len() as u64;
        Ok(())
    }

    fn detect(&mut self, value: f64) -> Result<bool> {
        let value = ensure_finite(value)?;

        let z = (value - self.mean).abs() / self.std_dev;
        let is_anomaly = z > self.threshold;
        self.last_z_score = z;

        if !is_anomaly {
            let smoothed =
                (1.0 - self.adaptation_rate) * self.threshold + self.adaptation_rate * z;
            self.threshold = smoothed.max(self.minimum_threshold);
            trace!(z, threshold = self.threshold, "Adapted threshold");
        }

        self.window.push(value)?;
        self.refresh_stats();
        self.samples_seen += 1;

        Ok(is_anomaly)
    }

    fn window(&self) -> &RollingWindow {
        &self.window
    }

    fn mean(&self) -> f64 {
        self.mean
    }

    fn std_dev(&self) -> f64 {
        self.std_dev
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn samples_seen(&self) -> u64 {
        self.samples_seen
    }
}
