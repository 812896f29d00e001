//! Stream pipeline: producer -> detector -> sink.
//!
//! The pipeline pulls one sample per tick from a producer (any
//! `Iterator<Item = f64>`), scores it, and hands `(value, is_anomaly, tick)` to
//! a [`Sink`]. Consumption is strictly sequential. Cancellation is cooperative:
//! the sink's `is_closed` flag is polled at the top of every tick, so a run
//! never stops halfway through one.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::detector::Detector;
use crate::error::Result;

/// Receiver of per-sample verdicts, e.g. a live chart or a log writer.
pub trait Sink {
    /// Buffer one scored sample.
    fn update(&mut self, value: f64, is_anomaly: bool, timestamp: u64);

    /// Present buffered samples. Called once per tick, after `update`.
    fn render(&mut self) {}

    /// Set by the sink's owner to stop the pipeline at the next tick.
    fn is_closed(&self) -> bool;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn update(&mut self, value: f64, is_anomaly: bool, timestamp: u64) {
        (**self).update(value, is_anomaly, timestamp)
    }

    fn render(&mut self) {
        (**self).render()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// One scored sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub timestamp: u64,
    pub value: f64,
    pub is_anomaly: bool,
}

/// Sink that keeps every verdict in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    verdicts: Vec<Verdict>,
    renders: usize,
    close_after: Option<usize>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report closed once `n` verdicts have been received.
    pub fn closing_after(n: usize) -> Self {
        Self {
            close_after: Some(n),
            ..Self::default()
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.is_anomaly)
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn into_verdicts(self) -> Vec<Verdict> {
        self.verdicts
    }
}

impl Sink for MemorySink {
    fn update(&mut self, value: f64, is_anomaly: bool, timestamp: u64) {
        self.verdicts.push(Verdict {
            timestamp,
            value,
            is_anomaly,
        });
    }

    fn render(&mut self) {
        self.renders += 1;
    }

    fn is_closed(&self) -> bool {
        self.closed || self.close_after.is_some_and(|n| self.verdicts.len() >= n)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    BudgetExhausted,
    SinkClosed,
    SourceExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BudgetExhausted => "tick budget exhausted",
            Self::SinkClosed => "sink closed",
            Self::SourceExhausted => "source exhausted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub ticks: u64,
    pub anomalies: u64,
    pub stop_reason: StopReason,
}

pub struct StreamPipeline<D, P, S> {
    detector: D,
    producer: P,
    sink: S,
    config: PipelineConfig,
    tick: u64,
    anomalies: u64,
}

impl<D, P, S> StreamPipeline<D, P, S>
where
    D: Detector,
    P: Iterator<Item = f64>,
    S: Sink,
{
    pub fn new(detector: D, producer: P, sink: S, config: PipelineConfig) -> Self {
        Self {
            detector,
            producer,
            sink,
            config,
            tick: 0,
            anomalies: 0,
        }
    }

    /// Next tick to be assigned.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (D, P, S) {
        (self.detector, self.producer, self.sink)
    }

    /// Run one tick. Returns `None` when the producer has nothing left.
    pub fn step(&mut self) -> Result<Option<Verdict>> {
        let Some(value) = self.producer.next() else {
            return Ok(None);
        };

        let is_anomaly = self.detector.detect(value)?;
        let verdict = Verdict {
            timestamp: self.tick,
            value,
            is_anomaly,
        };

        self.sink.update(value, is_anomaly, self.tick);
        debug!(tick = self.tick, value, is_anomaly, "Scored sample");
        if is_anomaly {
            self.anomalies += 1;
            warn!(
                tick = self.tick,
                value,
                mean = self.detector.mean(),
                std_dev = self.detector.std_dev(),
                "Anomaly detected"
            );
        }
        self.sink.render();
        self.tick += 1;

        Ok(Some(verdict))
    }

    /// Process the stream as fast as the producer yields, without pacing.
    pub fn run_blocking(&mut self) -> Result<PipelineSummary> {
        let reason = loop {
            if let Some(reason) = self.pending_stop() {
                break reason;
            }
            if self.step()?.is_none() {
                break StopReason::SourceExhausted;
            }
        };
        Ok(self.finish(reason))
    }

    /// Process the stream, sleeping `tick_interval` between ticks.
    pub async fn run(&mut self) -> Result<PipelineSummary> {
        let interval = self.config.tick_interval();
        let reason = loop {
            if let Some(reason) = self.pending_stop() {
                break reason;
            }
            if self.step()?.is_none() {
                break StopReason::SourceExhausted;
            }
            if self.budget_exhausted() {
                continue;
            }
            if !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
        };
        Ok(self.finish(reason))
    }

    fn budget_exhausted(&self) -> bool {
        self.config.max_ticks.is_some_and(|max| self.tick >= max)
    }

    fn pending_stop(&self) -> Option<StopReason> {
        if self.budget_exhausted() {
            Some(StopReason::BudgetExhausted)
        } else if self.sink.is_closed() {
            Some(StopReason::SinkClosed)
        } else {
            None
        }
    }

    fn finish(&self, stop_reason: StopReason) -> PipelineSummary {
        info!(
            ticks = self.tick,
            anomalies = self.anomalies,
            detector = self.detector.name(),
            reason = %stop_reason,
            "Stream processing stopped."
        );
        PipelineSummary {
            ticks: self.tick,
            anomalies: self.anomalies,
            stop_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{RollingDetector, ZScoreDetector};
    use crate::error::VigilError;

    fn unpaced(max_ticks: Option<u64>) -> PipelineConfig {
        PipelineConfig {
            max_ticks,
            tick_interval_ms: 0,
        }
    }

    #[test]
    fn test_budget_stops_run() {
        let det = ZScoreDetector::new(5, 3.0).unwrap();
        let source = std::iter::repeat(1.0);
        let mut pipeline = StreamPipeline::new(det, source, MemorySink::new(), unpaced(Some(12)));

        let summary = pipeline.run_blocking().unwrap();
        assert_eq!(summary.ticks, 12);
        assert_eq!(summary.stop_reason, StopReason::BudgetExhausted);
        assert_eq!(pipeline.sink().verdicts().len(), 12);
        assert_eq!(pipeline.sink().render_count(), 12);
    }

    #[test]
    fn test_timestamps_count_from_zero() {
        let det = RollingDetector::new(3, 3.0).unwrap();
        let mut pipeline = StreamPipeline::new(
            det,
            vec![1.0, 2.0, 3.0].into_iter(),
            MemorySink::new(),
            unpaced(None),
        );

        let summary = pipeline.run_blocking().unwrap();
        assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
        let stamps: Vec<u64> = pipeline.sink().verdicts().iter().map(|v| v.timestamp).collect();
        assert_eq!(stamps, vec![0, 1, 2]);
    }

    #[test]
    fn test_closed_sink_is_polled_before_each_tick() {
        let det = RollingDetector::new(3, 3.0).unwrap();
        let mut sink = MemorySink::closing_after(4);
        let mut pipeline =
            StreamPipeline::new(det, std::iter::repeat(5.0), &mut sink, unpaced(None));

        let summary = pipeline.run_blocking().unwrap();
        assert_eq!(summary.stop_reason, StopReason::SinkClosed);
        assert_eq!(summary.ticks, 4);
        drop(pipeline);
        assert_eq!(sink.verdicts().len(), 4);

        sink.close();
        let det = RollingDetector::new(3, 3.0).unwrap();
        let mut pipeline = StreamPipeline::new(det, std::iter::repeat(5.0), sink, unpaced(None));
        assert_eq!(pipeline.run_blocking().unwrap().ticks, 0);
    }

    #[test]
    fn test_invalid_sample_propagates() {
        let det = RollingDetector::new(3, 3.0).unwrap();
        let source = vec![1.0, f64::NAN, 2.0].into_iter();
        let mut pipeline = StreamPipeline::new(det, source, MemorySink::new(), unpaced(None));

        let err = pipeline.run_blocking().unwrap_err();
        assert!(matches!(err, VigilError::InvalidSample { .. }));
        assert_eq!(pipeline.sink().verdicts().len(), 1);
        assert_eq!(pipeline.tick(), 1);
    }

    #[test]
    fn test_anomalies_counted() {
        let det = RollingDetector::new(4, 2.0).unwrap();
        let source = vec![1.0, 1.0, 1.0, 1.0, 9.0, 1.0].into_iter();
        let mut pipeline = StreamPipeline::new(det, source, MemorySink::new(), unpaced(None));

        let summary = pipeline.run_blocking().unwrap();
        assert_eq!(summary.anomalies, 1);
        let flagged: Vec<u64> = pipeline.sink().anomalies().map(|v| v.timestamp).collect();
        assert_eq!(flagged, vec![4]);
    }

    #[tokio::test]
    async fn test_async_run_matches_blocking() {
        let source: Vec<f64> = (0..30).map(|i| (i % 7) as f64).collect();

        let mut blocking = StreamPipeline::new(
            ZScoreDetector::new(5, 1.5).unwrap(),
            source.clone().into_iter(),
            MemorySink::new(),
            unpaced(Some(25)),
        );
        blocking.run_blocking().unwrap();

        let config = PipelineConfig {
            max_ticks: Some(25),
            tick_interval_ms: 1,
        };
        let mut paced = StreamPipeline::new(
            ZScoreDetector::new(5, 1.5).unwrap(),
            source.into_iter(),
            MemorySink::new(),
            config,
        );
        let summary = paced.run().await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::BudgetExhausted);
        assert_eq!(paced.sink().verdicts(), blocking.sink().verdicts());
    }
}
