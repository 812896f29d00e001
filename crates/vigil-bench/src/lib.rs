//! Benchmark suite for the vigil detectors.
//!
//! Replays one seeded simulator stream through every configured detector and
//! scores the verdicts against the simulator's injection labels:
//! - Precision, Recall, F1-Score per detector
//! - Per-sample latency (p50, p95, p99)
//! - Throughput (samples per second)

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use vigil_core::{Detector, DetectorConfig, DetectorKind, Result};
use vigil_sim::{DataStreamSimulator, Sample, SimulatorConfig};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub name: String,
    /// Samples scored per detector.
    pub points: usize,
    /// Samples used to seed each detector before scoring starts.
    pub warmup: usize,
    pub detectors: Vec<DetectorConfig>,
    pub simulator: SimulatorConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            name: "Default Benchmark".to_string(),
            points: 10_000,
            warmup: 0,
            detectors: DetectorKind::ALL
                .into_iter()
                .map(DetectorConfig::for_kind)
                .collect(),
            simulator: SimulatorConfig {
                seed: Some(42),
                ..SimulatorConfig::default()
            },
        }
    }
}

impl BenchmarkConfig {
    /// Override the window size of every detector.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.detectors = self
            .detectors
            .into_iter()
            .map(|d| d.with_window_size(window_size))
            .collect();
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DetectorMetrics {
    pub name: String,
    pub window_size: usize,
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub trigger_count: u64,
    pub final_threshold: f64,
    pub latency_micros: LatencyMetrics,
    pub throughput_eps: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LatencyMetrics {
    pub p50_micros: f64,
    pub p95_micros: f64,
    pub p99_micros: f64,
    pub avg_micros: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BenchmarkResults {
    pub config: String,
    pub total_events: u64,
    pub total_anomaly_events: u64,
    pub detector_metrics: Vec<DetectorMetrics>,
}

/// Runs every configured detector over the same labelled stream.
#[derive(Default)]
pub struct BenchmarkRunner {
    latencies: Vec<u64>,
}

impl BenchmarkRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&mut self, config: &BenchmarkConfig) -> Result<BenchmarkResults> {
        let mut simulator = DataStreamSimulator::new(config.simulator.clone())?;
        let history: Vec<f64> = simulator.by_ref().take(config.warmup).collect();
        let stream: Vec<Sample> = (0..config.points).map(|_| simulator.next_sample()).collect();
        let anomaly_events = stream.iter().filter(|s| s.injected).count() as u64;

        info!(
            benchmark = %config.name,
            points = config.points,
            injected = anomaly_events,
            detectors = config.detectors.len(),
            "Running benchmark"
        );

        let mut detector_metrics = Vec::with_capacity(config.detectors.len());
        for detector_config in &config.detectors {
            let metrics = self.run_detector(detector_config, &history, &stream)?;
            debug!(
                detector = %metrics.name,
                f1 = metrics.f1_score,
                p99_micros = metrics.latency_micros.p99_micros,
                "Detector finished"
            );
            detector_metrics.push(metrics);
        }

        Ok(BenchmarkResults {
            config: config.name.clone(),
            total_events: stream.len() as u64,
            total_anomaly_events: anomaly_events,
            detector_metrics,
        })
    }

    fn run_detector(
        &mut self,
        config: &DetectorConfig,
        history: &[f64],
        stream: &[Sample],
    ) -> Result<DetectorMetrics> {
        let mut detector = config.build()?;
        detector.seed(history)?;

        let mut dm = DetectorMetrics {
            name: detector.name().to_string(),
            window_size: config.window_size(),
            ..Default::default()
        };

        self.latencies.clear();
        self.latencies.reserve(stream.len());
        let started = Instant::now();

        for sample in stream {
            let start = Instant::now();
            let flagged = detector.detect(sample.value)?;
            self.latencies.push(start.elapsed().as_nanos() as u64);

            match (flagged, sample.injected) {
                (true, true) => dm.true_positives += 1,
                (true, false) => dm.false_positives += 1,
                (false, true) => dm.false_negatives += 1,
                (false, false) => dm.true_negatives += 1,
            }
        }

        let elapsed = started.elapsed();
        let (p, r, f) = calculate_metrics(dm.true_positives, dm.false_positives, dm.false_negatives);
        dm.precision = p;
        dm.recall = r;
        dm.f1_score = f;
        dm.trigger_count = dm.true_positives + dm.false_positives;
        dm.final_threshold = detector.threshold();
        dm.latency_micros = latency_metrics(&mut self.latencies);
        dm.throughput_eps = throughput(stream.len(), elapsed);
        Ok(dm)
    }

    pub fn print_results(&self, results: &BenchmarkResults) {
        println!("Benchmark: {}", results.config);
        println!(
            "Samples: {} | Injected anomalies: {}",
            results.total_events, results.total_anomaly_events
        );
        println!();
        println!(
            "{:10} {:>6} {:>6} {:>6} {:>6} {:>8} {:>8} {:>7} {:>9} {:>9} {:>12}",
            "detector", "TP", "FP", "FN", "TN", "prec", "recall", "F1", "p50 µs", "p99 µs", "EPS"
        );
        for m in &results.detector_metrics {
            println!(
                "{:10} {:>6} {:>6} {:>6} {:>6} {:>7.1}% {:>7.1}% {:>7.3} {:>9.3} {:>9.3} {:>12.0}",
                m.name,
                m.true_positives,
                m.false_positives,
                m.false_negatives,
                m.true_negatives,
                m.precision * 100.0,
                m.recall * 100.0,
                m.f1_score,
                m.latency_micros.p50_micros,
                m.latency_micros.p99_micros,
                m.throughput_eps
            );
        }
    }

    /// Pretty JSON array of every scenario's results, as written by `--output`.
    pub fn export_json(&self, results: &[BenchmarkResults]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(results)
    }
}

/// Calculate precision, recall, f1 from confusion matrix values
pub fn calculate_metrics(tp: u64, fp: u64, fn_: u64) -> (f64, f64, f64) {
    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };
    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

/// Percentiles over per-sample latencies given in nanoseconds. Sorts in place.
pub fn latency_metrics(nanos: &mut [u64]) -> LatencyMetrics {
    if nanos.is_empty() {
        return LatencyMetrics::default();
    }
    nanos.sort_unstable();

    let len = nanos.len();
    let micros = |n: u64| n as f64 / 1_000.0;
    LatencyMetrics {
        p50_micros: micros(nanos[len / 2]),
        p95_micros: micros(nanos[len * 95 / 100]),
        p99_micros: micros(nanos[len * 99 / 100]),
        avg_micros: micros(nanos.iter().sum::<u64>()) / len as f64,
    }
}

fn throughput(events: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { events as f64 / secs } else { 0.0 }
}

/// Predefined benchmark setups
pub mod scenarios {
    use super::*;

    /// Default stream: trend, season and 1% outliers.
    pub fn standard() -> BenchmarkConfig {
        BenchmarkConfig {
            name: "Standard Stream".to_string(),
            ..Default::default()
        }
    }

    /// Flat signal with frequent outliers, which stresses window contamination.
    pub fn contaminated() -> BenchmarkConfig {
        BenchmarkConfig {
            name: "Contaminated Flat Stream".to_string(),
            simulator: SimulatorConfig {
                seasonal_factor: 0.0,
                trend_factor: 0.0,
                anomaly_probability: 0.05,
                seed: Some(42),
                ..SimulatorConfig::default()
            },
            ..Default::default()
        }
    }

    /// Small run for a quick sanity check.
    pub fn quick() -> BenchmarkConfig {
        BenchmarkConfig {
            name: "Quick Validation".to_string(),
            points: 1_000,
            ..Default::default()
        }
    }
}
