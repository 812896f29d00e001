//! # vigil-core - Streaming Anomaly Scoring
//!
//! Real-time, per-sample anomaly verdicts over a bounded window of recent
//! history.
//!
//! ```text
//! producer ──► StreamPipeline ──► Detector::detect(x) ──► Sink::update
//!                                     │
//!                                     └── RollingWindow (O(1) push/evict)
//! ```
//!
//! - [`window::RollingWindow`]: ring buffer with incremental mean/variance.
//! - [`detector`]: the [`Detector`] trait and its three variants (fixed
//!   threshold, z-score, adaptive threshold), selected through
//!   [`DetectorConfig`].
//! - [`pipeline`]: the sequential producer → detector → sink loop, paced
//!   (`run`) or unpaced (`run_blocking`).
//!
//! ## Quick Start
//!
//! ```rust
//! use vigil_core::{Detector, DetectorConfig};
//!
//! let mut detector = DetectorConfig::Rolling {
//!     window_size: 5,
//!     threshold_multiplier: 3.5,
//! }
//! .build()
//! .unwrap();
//!
//! for _ in 0..5 {
//!     assert!(!detector.detect(10.0).unwrap()); // warm-up
//! }
//! assert!(detector.detect(100.0).unwrap());
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod pipeline;
pub mod window;

pub use config::{DetectorConfig, DetectorKind, PipelineConfig};
pub use detector::{AdaptiveDetector, AnyDetector, Detector, RollingDetector, ZScoreDetector};
pub use error::{Result, VigilError};
pub use pipeline::{MemorySink, PipelineSummary, Sink, StopReason, StreamPipeline, Verdict};
pub use window::RollingWindow;
