use crate::config::{check_positive, check_window_size};
use crate::detector::Detector;
use crate::error::{Result, ensure_finite};
use crate::window::RollingWindow;

/// Fixed-threshold rolling detector.
///
/// Flags `|x - mean| > k * std_dev` using the window's incremental statistics.
/// Silent until the window is full. A zero-variance window makes any
/// deviation at all anomalous, since the right-hand side collapses to zero.
#[derive(Debug, Clone)]
pub struct RollingDetector {
    window: RollingWindow,
    threshold_multiplier: f64,
    mean: f64,
    std_dev: f64,
    samples_seen: u64,
}

impl RollingDetector {
    pub fn new(window_size: usize, threshold_multiplier: f64) -> Result<Self> {
        check_window_size(window_size)?;
        check_positive("threshold_multiplier", threshold_multiplier)?;

        Ok(Self {
            window: RollingWindow::new(window_size)?,
            threshold_multiplier,
            mean: 0.0,
            std_dev: 0.0,
            samples_seen: 0,
        })
    }

    pub fn threshold_multiplier(&self) -> f64 {
        self.threshold_multiplier
    }

    fn refresh_stats(&mut self) {
        self.mean = self.window.mean();
        self.std_dev = self.window.std_dev();
    }
}

impl Detector for RollingDetector {
    fn name(&self) -> &'static str {
        "rolling"
    }

    /// Replace the window with the tail of `history`.
    fn seed(&mut self, history: &[f64]) -> Result<()> {
        self.window.refill(history)?;
        self.refresh_stats();
        self.samples_seen = history.len() as u64;
        Ok(())
    }

    fn detect(&mut self, value: f64) -> Result<bool> {
        let value = ensure_finite(value)?;

        let is_anomaly = self.window.is_full()
            && (value - self.mean).abs() > self.threshold_multiplier * self.std_dev;

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
        self.threshold_multiplier
    }

    fn samples_seen(&self) -> u64 {
        self.samples_seen
    }
}
