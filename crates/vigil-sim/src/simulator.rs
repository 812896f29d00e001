//! Synthetic data stream with labelled outlier injection.
//!
//! Each sample is `base + trend·t + seasonal·sin(2πt/period) + noise`, and
//! with probability `anomaly_probability` an outlier of `±U(1,3)·noise_level`
//! is added on top. Injected samples are labelled so detection quality can be
//! measured against ground truth.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use vigil_core::{Result, VigilError};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoiseModel {
    /// `noise_level · (U(0,1) - 0.5)`
    #[default]
    Uniform,
    /// Zero-mean normal with the same variance as the uniform model.
    Gaussian,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub base_value: f64,
    pub noise_level: f64,
    pub seasonal_factor: f64,
    pub trend_factor: f64,
    /// Samples per seasonal cycle; 0 disables the seasonal term.
    pub cycle_period: u64,
    pub anomaly_probability: f64,
    pub noise: NoiseModel,
    /// Fixed RNG seed for reproducible streams.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_value: 100.0,
            noise_level: 10.0,
            seasonal_factor: 20.0,
            trend_factor: 0.01,
            cycle_period: 1000,
            anomaly_probability: 0.01,
            noise: NoiseModel::Uniform,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("base_value", self.base_value),
            ("noise_level", self.noise_level),
            ("seasonal_factor", self.seasonal_factor),
            ("trend_factor", self.trend_factor),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(invalid(field, format!("must be finite, got {}", value)));
            }
        }
        if self.noise_level < 0.0 {
            return Err(invalid("noise_level", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.anomaly_probability) {
            return Err(invalid(
                "anomaly_probability",
                format!("must lie in [0, 1], got {}", self.anomaly_probability),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> VigilError {
    VigilError::Configuration {
        field,
        reason: reason.into(),
    }
}

/// One generated point.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time: u64,
    pub value: f64,
    /// Whether an outlier was injected at this point.
    pub injected: bool,
}

/// Infinite producer of samples. Iterating yields bare values; use
/// [`DataStreamSimulator::next_sample`] to keep the ground-truth label.
pub struct DataStreamSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    gaussian: Normal<f64>,
    time: u64,
}

impl DataStreamSimulator {
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let sigma = config.noise_level / 12f64.sqrt();
        let gaussian = Normal::new(0.0, sigma)
            .map_err(|e| invalid("noise_level", e.to_string()))?;

        Ok(Self {
            config,
            rng,
            gaussian,
            time: 0,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Time index of the next sample.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Noise-free level at time `t` (base + trend + season).
    pub fn expected_value(&self, t: u64) -> f64 {
        let c = &self.config;
        let t = t as f64;
        let season = if c.cycle_period == 0 {
            0.0
        } else {
            c.seasonal_factor * (2.0 * PI * t / c.cycle_period as f64).sin()
        };
        c.base_value + c.trend_factor * t + season
    }

    pub fn next_sample(&mut self) -> Sample {
        let time = self.time;
        let noise = match self.config.noise {
            NoiseModel::Uniform => self.config.noise_level * (self.rng.random::<f64>() - 0.5),
            NoiseModel::Gaussian => self.gaussian.sample(&mut self.rng),
        };
        let mut value = self.expected_value(time) + noise;

        let injected = self.rng.random_bool(self.config.anomaly_probability);
        if injected {
            let sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
            value += sign * self.rng.random_range(1.0..3.0) * self.config.noise_level;
        }

        self.time += 1;
        Sample {
            time,
            value,
            injected,
        }
    }
}

impl Iterator for DataStreamSimulator {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_sample().value)
    }
}
