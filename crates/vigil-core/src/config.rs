//! Detector and pipeline configuration.
//!
//! Configurations deserialize from JSON (or any serde format) with per-field
//! defaults, e.g. `{"kind": "adaptive", "window_size": 150}`. Validation is
//! strict: an out-of-range value is a `Configuration` error, never clamped.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::detector::{AdaptiveDetector, AnyDetector, RollingDetector, ZScoreDetector};
use crate::error::{Result, VigilError};

pub const DEFAULT_WINDOW_SIZE: usize = 100;
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 3.5;
pub const DEFAULT_INITIAL_THRESHOLD: f64 = 3.2;
pub const DEFAULT_ADAPTATION_RATE: f64 = 0.05;
pub const DEFAULT_MINIMUM_THRESHOLD: f64 = 3.0;

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_threshold_multiplier() -> f64 {
    DEFAULT_THRESHOLD_MULTIPLIER
}

fn default_initial_threshold() -> f64 {
    DEFAULT_INITIAL_THRESHOLD
}

fn default_adaptation_rate() -> f64 {
    DEFAULT_ADAPTATION_RATE
}

fn default_minimum_threshold() -> f64 {
    DEFAULT_MINIMUM_THRESHOLD
}

/// Detector variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Rolling,
    ZScore,
    Adaptive,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 3] = [Self::Rolling, Self::ZScore, Self::Adaptive];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rolling => "rolling",
            Self::ZScore => "z_score",
            Self::Adaptive => "adaptive",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Rolling => "Fixed sigma multiple over incremental window stats",
            Self::ZScore => "Z-score over the window, zero variance never flags",
            Self::Adaptive => "Self-tuning z-score threshold, no warm-up",
        }
    }
}

/// Configuration for one detector, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorConfig {
    Rolling {
        #[serde(default = "default_window_size")]
        window_size: usize,
        #[serde(default = "default_threshold_multiplier")]
        threshold_multiplier: f64,
    },
    ZScore {
        #[serde(default = "default_window_size")]
        window_size: usize,
        #[serde(default = "default_threshold_multiplier")]
        threshold_multiplier: f64,
    },
    Adaptive {
        #[serde(default = "default_window_size")]
        window_size: usize,
        #[serde(default = "default_initial_threshold")]
        initial_threshold: f64,
        #[serde(default = "default_adaptation_rate")]
        adaptation_rate: f64,
        #[serde(default = "default_minimum_threshold")]
        minimum_threshold: f64,
    },
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::for_kind(DetectorKind::Adaptive)
    }
}

impl DetectorConfig {
    /// Defaults for the given variant.
    pub fn for_kind(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::Rolling => Self::Rolling {
                window_size: DEFAULT_WINDOW_SIZE,
                threshold_multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            },
            DetectorKind::ZScore => Self::ZScore {
                window_size: DEFAULT_WINDOW_SIZE,
                threshold_multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            },
            DetectorKind::Adaptive => Self::Adaptive {
                window_size: DEFAULT_WINDOW_SIZE,
                initial_threshold: DEFAULT_INITIAL_THRESHOLD,
                adaptation_rate: DEFAULT_ADAPTATION_RATE,
                minimum_threshold: DEFAULT_MINIMUM_THRESHOLD,
            },
        }
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::Rolling { .. } => DetectorKind::Rolling,
            Self::ZScore { .. } => DetectorKind::ZScore,
            Self::Adaptive { .. } => DetectorKind::Adaptive,
        }
    }

    pub fn window_size(&self) -> usize {
        match *self {
            Self::Rolling { window_size, .. }
            | Self::ZScore { window_size, .. }
            | Self::Adaptive { window_size, .. } => window_size,
        }
    }

    /// Same configuration with a different window size.
    pub fn with_window_size(mut self, size: usize) -> Self {
        match &mut self {
            Self::Rolling { window_size, .. }
            | Self::ZScore { window_size, .. }
            | Self::Adaptive { window_size, .. } => *window_size = size,
        }
        self
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Rolling {
                window_size,
                threshold_multiplier,
            }
            | Self::ZScore {
                window_size,
                threshold_multiplier,
            } => {
                check_window_size(window_size)?;
                check_positive("threshold_multiplier", threshold_multiplier)
            }
            Self::Adaptive {
                window_size,
                initial_threshold,
                adaptation_rate,
                minimum_threshold,
            } => {
                check_window_size(window_size)?;
                check_adaptive(initial_threshold, adaptation_rate, minimum_threshold)
            }
        }
    }

    /// Construct the configured detector.
    pub fn build(&self) -> Result<AnyDetector> {
        let detector = match *self {
            Self::Rolling {
                window_size,
                threshold_multiplier,
            } => RollingDetector::new(window_size, threshold_multiplier)?.into(),
            Self::ZScore {
                window_size,
                threshold_multiplier,
            } => ZScoreDetector::new(window_size, threshold_multiplier)?.into(),
            Self::Adaptive {
                window_size,
                initial_threshold,
                adaptation_rate,
                minimum_threshold,
            } => AdaptiveDetector::new(
                window_size,
                initial_threshold,
                adaptation_rate,
                minimum_threshold,
            )?
            .into(),
        };
        Ok(detector)
    }
}

pub(crate) fn check_window_size(window_size: usize) -> Result<()> {
    if window_size == 0 {
        return Err(VigilError::config("window_size", "must be at least 1"));
    }
    Ok(())
}

pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(VigilError::config(
            field,
            format!("must be a positive finite number, got {}", value),
        ));
    }
    Ok(())
}

pub(crate) fn check_adaptive(
    initial_threshold: f64,
    adaptation_rate: f64,
    minimum_threshold: f64,
) -> Result<()> {
    check_positive("initial_threshold", initial_threshold)?;
    check_positive("minimum_threshold", minimum_threshold)?;
    if !(0.0..=1.0).contains(&adaptation_rate) {
        return Err(VigilError::config(
            "adaptation_rate",
            format!("must lie in [0, 1], got {}", adaptation_rate),
        ));
    }
    if initial_threshold < minimum_threshold {
        return Err(VigilError::config(
            "initial_threshold",
            format!(
                "{} is below minimum_threshold {}",
                initial_threshold, minimum_threshold
            ),
        ));
    }
    Ok(())
}

/// Pacing and budget for the stream pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stop after this many ticks; `None` runs until the sink closes.
    #[serde(default)]
    pub max_ticks: Option<u64>,
    /// Delay between ticks in the async runner.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_ticks: None,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
