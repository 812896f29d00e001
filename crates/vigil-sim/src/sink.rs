//! Console front end for the live pipeline.
//!
//! Keeps the most recent `max_points` verdicts (the visible range of a
//! scrolling chart) and writes each new one as it is rendered. The sink reports
//! closed once its cancellation token fires, or when the output stream breaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use vigil_core::{Sink, Verdict};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Pretty,
    JsonLines,
}

#[derive(Serialize)]
struct Record {
    timestamp: u64,
    value: f64,
    is_anomaly: bool,
    observed_at: DateTime<Utc>,
}

pub struct ConsoleSink<W: Write> {
    writer: W,
    format: OutputFormat,
    visible: VecDeque<Verdict>,
    max_points: usize,
    unrendered: usize,
    cancel: CancellationToken,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W, format: OutputFormat, max_points: usize) -> Self {
        Self {
            writer,
            format,
            visible: VecDeque::with_capacity(max_points.min(4096)),
            max_points: max_points.max(1),
            unrendered: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that closes this sink when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Verdicts currently in view, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &Verdict> {
        self.visible.iter()
    }

    pub fn visible_anomalies(&self) -> usize {
        self.visible.iter().filter(|v| v.is_anomaly).count()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn write_pending(&mut self, verdicts: Vec<Verdict>) -> std::io::Result<()> {
        for verdict in verdicts {
            self.write_verdict(verdict)?;
        }
        self.writer.flush()
    }

    fn write_verdict(&mut self, verdict: Verdict) -> std::io::Result<()> {
        let now = Utc::now();
        match self.format {
            OutputFormat::Pretty => {
                let marker = if verdict.is_anomaly { "  [ANOMALY]" } else { "" };
                writeln!(
                    self.writer,
                    "{} t={:>6} value={:>10.3}{}",
                    now.format("%H:%M:%S%.3f"),
                    verdict.timestamp,
                    verdict.value,
                    marker
                )
            }
            OutputFormat::JsonLines => {
                let record = Record {
                    timestamp: verdict.timestamp,
                    value: verdict.value,
                    is_anomaly: verdict.is_anomaly,
                    observed_at: now,
                };
                let line = serde_json::to_string(&record).map_err(std::io::Error::other)?;
                writeln!(self.writer, "{}", line)
            }
        }
    }
}

impl<W: Write> Sink for ConsoleSink<W> {
    fn update(&mut self, value: f64, is_anomaly: bool, timestamp: u64) {
        if self.visible.len() == self.max_points {
            self.visible.pop_front();
        }
        self.visible.push_back(Verdict {
            timestamp,
            value,
            is_anomaly,
        });
        self.unrendered = (self.unrendered + 1).min(self.visible.len());
    }

    fn render(&mut self) {
        if self.cancel.is_cancelled() || self.unrendered == 0 {
            return;
        }

        let start = self.visible.len() - self.unrendered;
        let pending: Vec<Verdict> = self.visible.range(start..).copied().collect();
        self.unrendered = 0;

        if let Err(e) = self.write_pending(pending) {
            warn!(error = %e, "Output stream failed, closing sink");
            self.cancel.cancel();
        }
    }

    fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_output_marks_anomalies() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Pretty, 10);
        sink.update(101.5, false, 0);
        sink.render();
        sink.update(180.0, true, 1);
        sink.render();

        let out = String::from_utf8(sink.into_writer()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("t=     0"));
        assert!(!lines[0].contains("[ANOMALY]"));
        assert!(lines[1].contains("value=   180.000"));
        assert!(lines[1].ends_with("[ANOMALY]"));
    }

    #[test]
    fn test_json_lines_output() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::JsonLines, 10);
        sink.update(1.0, false, 0);
        sink.update(2.0, true, 1);
        sink.render();

        let out = String::from_utf8(sink.into_writer()).unwrap();
        let rows: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["timestamp"], 1);
        assert_eq!(rows[1]["is_anomaly"], true);
        assert!(rows[0]["observed_at"].is_string());
    }

    #[test]
    fn test_visible_range_is_bounded() {
        let mut sink = ConsoleSink::new(std::io::sink(), OutputFormat::Pretty, 3);
        for t in 0..10 {
            sink.update(t as f64, t % 4 == 0, t);
            sink.render();
        }
        let times: Vec<u64> = sink.visible().map(|v| v.timestamp).collect();
        assert_eq!(times, vec![7, 8, 9]);
        assert_eq!(sink.visible_anomalies(), 1);
    }

    #[test]
    fn test_cancel_closes_sink() {
        let sink = ConsoleSink::new(std::io::sink(), OutputFormat::Pretty, 3);
        let token = sink.cancel_token();
        assert!(!sink.is_closed());
        token.cancel();
        assert!(sink.is_closed());
    }

    #[test]
    fn test_broken_writer_closes_sink() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut sink = ConsoleSink::new(Broken, OutputFormat::Pretty, 3);
        sink.update(1.0, false, 0);
        sink.render();
        assert!(sink.is_closed());
    }
}
