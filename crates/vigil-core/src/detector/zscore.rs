use crate::config::{check_positive, check_window_size};
use crate::detector::Detector;
use crate::error::{Result, ensure_finite};
use crate::window::RollingWindow;

/// Z-score detector.
///
/// Statistics are recomputed from the window contents on every call (two-pass,
/// Bessel-corrected sample standard deviation) instead of read from running
/// accumulators. Silent until the window is full. Zero variance defines the
/// z-score as 0, so a constant window never produces an anomaly.
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    window: RollingWindow,
    threshold_multiplier: f64,
    mean: f64,
    std_dev: f64,
    last_z_score: f64,
    samples_seen: u64,
}

impl ZScoreDetector {
    pub fn new(window_size: usize, threshold_multiplier: f64) -> Result<Self> {
        check_window_size(window_size)?;
        check_positive("threshold_multiplier", threshold_multiplier)?;

        Ok(Self {
            window: RollingWindow::new(window_size)?,
            threshold_multiplier,
            mean: 0.0,
            std_dev: 0.0,
            last_z_score: 0.0,
            samples_seen: 0,
        })
    }

    /// Signed z-score of the most recent scored sample (0 during warm-up).
    pub fn last_z_score(&self) -> f64 {
        self.last_z_score
    }

    fn refresh_stats(&mut self) {
        let (mean, std_dev) = sample_stats(&self.window);
        self.mean = mean;
        self.std_dev = std_dev;
    }
}

/// Mean and sample standard deviation; the deviation is 0 below two samples.
///
/// Deviations are taken relative to the oldest sample first, so a window of
/// identical values yields exactly zero spread.
fn sample_stats(window: &RollingWindow) -> (f64, f64) {
    let n = window.len();
    let Some(anchor) = window.iter().next() else {
        return (0.0, 0.0);
    };

    let offset = window.iter().map(|x| x - anchor).sum::<f64>() / n as f64;
    let mean = anchor + offset;
    if n < 2 {
        return (mean, 0.0);
    }

    let ss = window
        .iter()
        .map(|x| {
            let d = x - anchor - offset;
            d * d
        })
        .sum::<f64>();
    (mean, (ss / (n - 1) as f64).sqrt())
}

impl Detector for ZScoreDetector {
    fn name(&self) -> &'static str {
        "z_score"
    }

    fn seed(&mut self, history: &[f64]) -> Result<()> {
        self.window.refill(history)?;
        self.refresh_stats();
        self.samples_seen = history.len() as u64;
        Ok(())
    }

    fn detect(&mut self, value: f64) -> Result<bool> {
        let value = ensure_finite(value)?;

        let is_anomaly = if self.window.is_full() {
            let (mean, std_dev) = sample_stats(&self.window);
            self.last_z_score = if std_dev > 0.0 {
                (value - mean) / std_dev
            } else {
                0.0
            };
            self.last_z_score.abs() > self.threshold_multiplier
        } else {
            self.last_z_score = 0.0;
            false
        };

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_is_silent() {
        let mut det = ZScoreDetector::new(4, 1.0).unwrap();
        for v in [0.0, 100.0, -100.0, 1e6] {
            assert!(!det.detect(v).unwrap());
        }
    }

    #[test]
    fn test_zero_variance_never_flags() {
        let mut det = ZScoreDetector::new(5, 3.5).unwrap();
        for _ in 0..5 {
            det.detect(7.0).unwrap();
        }
        assert!(!det.detect(7.0).unwrap());
        assert!(!det.detect(1e9).unwrap());
        assert_eq!(det.last_z_score(), 0.0);
    }

    #[test]
    fn test_signed_z_score() {
        let mut det = ZScoreDetector::new(4, 2.0).unwrap();
        det.seed(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        // mean 2.5, sample std sqrt(5/3)
        let std = (5.0f64 / 3.0).sqrt();
        assert!((det.std_dev() - std).abs() < 1e-12);

        assert!(det.detect(-2.0).unwrap());
        assert!((det.last_z_score() - (-4.5 / std)).abs() < 1e-12);
    }

    #[test]
    fn test_sample_stats_small_windows() {
        let mut window = RollingWindow::new(3).unwrap();
        assert_eq!(sample_stats(&window), (0.0, 0.0));
        window.push(5.0).unwrap();
        assert_eq!(sample_stats(&window), (5.0, 0.0));
        window.push(7.0).unwrap();
        let (mean, std) = sample_stats(&window);
        assert_eq!(mean, 6.0);
        assert!((std - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_capacity_one_never_flags() {
        let mut det = ZScoreDetector::new(1, 0.5).unwrap();
        for v in [1.0, 50.0, -50.0, 3.0] {
            assert!(!det.detect(v).unwrap());
        }
    }
}
