//! vigil-bench - Detection quality and latency benchmarks
//!
//! Usage:
//!   vigil-bench run                       # Standard stream, all detectors
//!   vigil-bench run --scenario contaminated --window 50
//!   vigil-bench run-all --output results.json
//!   vigil-bench quick

use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use tracing::{error, info};

use vigil_bench::{BenchmarkConfig, BenchmarkResults, BenchmarkRunner, scenarios};
use vigil_sim::logging;

#[derive(Parser)]
#[command(name = "vigil-bench")]
#[command(about = "Benchmark suite for vigil anomaly detectors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file for JSON results
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Result format on stdout
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one benchmark scenario
    Run {
        #[arg(short, long, value_enum, default_value = "standard")]
        scenario: Scenario,

        /// Samples scored per detector
        #[arg(short = 'n', long)]
        points: Option<usize>,

        /// Window size for every detector
        #[arg(short, long)]
        window: Option<usize>,

        /// Samples used to seed each detector first
        #[arg(long)]
        warmup: Option<usize>,

        /// RNG seed for the stream
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run every scenario
    RunAll,

    /// Quick validation run
    Quick,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Standard,
    Contaminated,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_tracing(false) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    let configs = match cli.command {
        Commands::Run {
            scenario,
            points,
            window,
            warmup,
            seed,
        } => {
            let mut config = match scenario {
                Scenario::Standard => scenarios::standard(),
                Scenario::Contaminated => scenarios::contaminated(),
            };
            if let Some(points) = points {
                config.points = points;
            }
            if let Some(warmup) = warmup {
                config.warmup = warmup;
            }
            if seed.is_some() {
                config.simulator.seed = seed;
            }
            if let Some(window) = window {
                config = config.with_window_size(window);
            }
            vec![config]
        }
        Commands::RunAll => vec![scenarios::standard(), scenarios::contaminated()],
        Commands::Quick => vec![scenarios::quick()],
    };

    match run_benchmarks(&configs, cli.format, cli.output.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_benchmarks(
    configs: &[BenchmarkConfig],
    format: Format,
    output: Option<&str>,
) -> Result<(), String> {
    let mut runner = BenchmarkRunner::new();
    let mut all_results: Vec<BenchmarkResults> = Vec::with_capacity(configs.len());

    for config in configs {
        let results = runner.run(config).map_err(|e| e.to_string())?;
        if format == Format::Table {
            runner.print_results(&results);
            println!();
        }
        all_results.push(results);
    }

    let json = runner.export_json(&all_results).map_err(|e| e.to_string())?;
    if format == Format::Json {
        println!("{}", json);
    }
    if let Some(path) = output {
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))?;
        info!(path, "Results saved");
    }
    Ok(())
}
