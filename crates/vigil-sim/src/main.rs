//! vigil-sim - Real-time anomaly detection over a simulated stream
//!
//! Usage:
//!   vigil-sim run --detector adaptive --window 150 --threshold 3.2 --adaptation-rate 0.05
//!   vigil-sim run --detector z-score --points 5000 --tick-ms 0 --format json-lines
//!   vigil-sim run --config detector.json --debug
//!   vigil-sim list

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use vigil_core::{
    Detector, DetectorConfig, DetectorKind, PipelineConfig, StreamPipeline, VigilError,
};
use vigil_sim::{ConsoleSink, DataStreamSimulator, OutputFormat, SimulatorConfig, logging};

#[derive(Parser)]
#[command(name = "vigil-sim")]
#[command(about = "Real-time anomaly detection over a simulated data stream")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream simulated samples through a detector
    Run(RunArgs),

    /// List available detector variants
    List,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Detector variant
    #[arg(short, long, value_enum, default_value = "adaptive")]
    detector: DetectorArg,

    /// Window size for the detector
    #[arg(short, long, default_value = "100")]
    window: usize,

    /// Sigma multiple (rolling, z-score) or initial threshold (adaptive)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Adaptation rate for the adaptive detector
    #[arg(long)]
    adaptation_rate: Option<f64>,

    /// Threshold floor for the adaptive detector
    #[arg(long)]
    minimum_threshold: Option<f64>,

    /// Load the detector configuration from a JSON file instead
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed the detector with this many samples before scoring
    #[arg(long, default_value = "0")]
    warmup: usize,

    /// Stop after this many samples (runs until Ctrl+C when omitted)
    #[arg(short = 'n', long)]
    points: Option<u64>,

    /// Delay between samples in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    format: FormatArg,

    /// Samples kept in view by the console sink
    #[arg(long, default_value = "1000")]
    max_points: usize,

    /// Probability of injecting an outlier per sample
    #[arg(long, default_value = "0.01")]
    anomaly_probability: f64,

    /// RNG seed for a reproducible stream
    #[arg(long)]
    seed: Option<u64>,

    /// Log every sample at DEBUG into anomaly_detection_debug.log
    #[arg(long)]
    debug: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DetectorArg {
    Rolling,
    ZScore,
    Adaptive,
}

impl From<DetectorArg> for DetectorKind {
    fn from(arg: DetectorArg) -> Self {
        match arg {
            DetectorArg::Rolling => DetectorKind::Rolling,
            DetectorArg::ZScore => DetectorKind::ZScore,
            DetectorArg::Adaptive => DetectorKind::Adaptive,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Pretty,
    JsonLines,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pretty => OutputFormat::Pretty,
            FormatArg::JsonLines => OutputFormat::JsonLines,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::List => {
            run_list();
            ExitCode::SUCCESS
        }
    }
}

async fn run(args: RunArgs) -> ExitCode {
    if let Err(e) = logging::init_tracing(args.debug) {
        eprintln!("Failed to open {}: {}", logging::DEBUG_LOG_FILE, e);
        return ExitCode::FAILURE;
    }

    let detector_config = match detector_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run_pipeline(&args, detector_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_pipeline(args: &RunArgs, detector_config: DetectorConfig) -> Result<(), VigilError> {
    let mut detector = detector_config.build()?;

    let mut simulator = DataStreamSimulator::new(SimulatorConfig {
        anomaly_probability: args.anomaly_probability,
        seed: args.seed,
        ..SimulatorConfig::default()
    })?;

    if args.warmup > 0 {
        let history: Vec<f64> = simulator.by_ref().take(args.warmup).collect();
        detector.seed(&history)?;
        info!(samples = history.len(), "Seeded detector with history.");
    }

    let sink = ConsoleSink::new(std::io::stdout(), args.format.into(), args.max_points);
    let token = sink.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping after the current sample.");
            token.cancel();
        }
    });

    info!(
        detector = detector.name(),
        window = detector.window().capacity(),
        threshold = detector.threshold(),
        "Starting real-time anomaly detection."
    );
    info!("Press Ctrl+C to stop.");

    let pipeline_config = PipelineConfig {
        max_ticks: args.points,
        tick_interval_ms: args.tick_ms,
    };
    let mut pipeline = StreamPipeline::new(detector, simulator, sink, pipeline_config);
    let summary = pipeline.run().await?;

    let ratio = summary.anomalies as f64 / summary.ticks.max(1) as f64 * 100.0;
    info!(
        ticks = summary.ticks,
        anomalies = summary.anomalies,
        anomaly_ratio = format!("{:.2}%", ratio),
        final_threshold = pipeline.detector().threshold(),
        "Done."
    );
    Ok(())
}

fn detector_config(args: &RunArgs) -> Result<DetectorConfig, String> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => config_from_args(args),
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<DetectorConfig, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&raw).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn config_from_args(args: &RunArgs) -> DetectorConfig {
    let mut config = DetectorConfig::for_kind(args.detector.into());
    match &mut config {
        DetectorConfig::Rolling {
            window_size,
            threshold_multiplier,
        }
        | DetectorConfig::ZScore {
            window_size,
            threshold_multiplier,
        } => {
            *window_size = args.window;
            if let Some(t) = args.threshold {
                *threshold_multiplier = t;
            }
        }
        DetectorConfig::Adaptive {
            window_size,
            initial_threshold,
            adaptation_rate,
            minimum_threshold,
        } => {
            *window_size = args.window;
            if let Some(t) = args.threshold {
                *initial_threshold = t;
            }
            if let Some(r) = args.adaptation_rate {
                *adaptation_rate = r;
            }
            if let Some(m) = args.minimum_threshold {
                *minimum_threshold = m;
            }
        }
    }
    config
}

fn run_list() {
    println!("Available detectors:");
    for kind in DetectorKind::ALL {
        println!("  {:10} {}", kind.name(), kind.description());
    }
    println!("\nUsage: vigil-sim run --detector <DETECTOR> [--window N] [--threshold T]");
}
