//! # vigil-sim - Simulated Streams for vigil-core
//!
//! The collaborators around the scoring engine:
//!
//! - [`DataStreamSimulator`]: infinite producer of trend + season + noise
//!   samples with labelled outlier injection. Implements
//!   `Iterator<Item = f64>`, which is all the pipeline asks of a producer.
//! - [`ConsoleSink`]: scrolling console view of the verdict stream, closed
//!   through a `CancellationToken`.
//! - [`logging`]: tracing subscriber setup for the binaries.
//!
//! ```rust
//! use vigil_sim::{DataStreamSimulator, SimulatorConfig};
//!
//! let config = SimulatorConfig { seed: Some(42), ..SimulatorConfig::default() };
//! let mut sim = DataStreamSimulator::new(config).unwrap();
//! let sample = sim.next_sample();
//! assert_eq!(sample.time, 0);
//! ```

pub mod logging;
pub mod simulator;
pub mod sink;

pub use simulator::{DataStreamSimulator, NoiseModel, Sample, SimulatorConfig};
pub use sink::{ConsoleSink, OutputFormat};
