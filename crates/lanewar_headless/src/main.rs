//! Headless lane battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Single match, JSON lines on stdout
//! cargo run -p lanewar_headless -- run --difficulty normal --strategy balanced --seed 7
//!
//! # Batch of seeds in parallel
//! cargo run -p lanewar_headless -- batch --strategy rush --count 1000 --output results/rush.json
//!
//! # Same seed several times, compare results
//! cargo run -p lanewar_headless -- verify --seed 12345 --runs 5
//!
//! # Validate a catalog file, or print the built-in one
//! cargo run -p lanewar_headless -- catalog crates/lanewar_core/data/catalog.ron
//! cargo run -p lanewar_headless -- catalog --dump
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lanewar_core::prelude::{Catalog, DifficultyId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lanewar_headless::{
    batch::{default_output_path, run_batch, verify_determinism, BatchConfig},
    runner::{MatchConfig, MatchRunner, RunnerError},
    strategies::Strategy,
};

#[derive(Parser)]
#[command(name = "lanewar_headless")]
#[command(about = "Headless lane battle runner for strategy and balance testing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Catalog RON file (defaults to the built-in catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match
    Run {
        /// Opponent difficulty (easy, normal, hard)
        #[arg(short, long, default_value = "normal")]
        difficulty: DifficultyId,

        /// Preset name (idle, rush, turtle, balanced) or strategy RON file
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Update limit (0 = until a base falls)
        #[arg(long, default_value = "36000")]
        max_ticks: u64,

        /// Emit a frame every N updates (0 = only start and result)
        #[arg(long, default_value = "0")]
        frame_every: u64,

        /// Write JSON lines here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of seeds for balance testing
    Batch {
        /// Opponent difficulty (easy, normal, hard)
        #[arg(short, long, default_value = "normal")]
        difficulty: DifficultyId,

        /// Preset name or strategy RON file
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Number of matches
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Update limit per match (0 = until a base falls)
        #[arg(long, default_value = "36000")]
        max_ticks: u64,

        /// Results JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed several times
    Verify {
        /// Opponent difficulty (easy, normal, hard)
        #[arg(short, long, default_value = "normal")]
        difficulty: DifficultyId,

        /// Preset name or strategy RON file
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Validate a catalog file or print the built-in catalog
    Catalog {
        /// Catalog RON file to validate
        path: Option<PathBuf>,

        /// Print the built-in catalog as RON
        #[arg(long)]
        dump: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries match output, so logs go to stderr.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<ExitCode, RunnerError> {
    match cli.command {
        Commands::Run {
            difficulty,
            strategy,
            seed,
            max_ticks,
            frame_every,
            output,
        } => {
            let runner = load_runner(cli.catalog.as_deref())?;
            let config = MatchConfig {
                difficulty,
                seed,
                max_ticks,
                strategy: Strategy::resolve(&strategy)?,
                frame_every,
            };
            cmd_run(&runner, &config, output.as_deref())
        }
        Commands::Batch {
            difficulty,
            strategy,
            count,
            parallel,
            seed,
            max_ticks,
            output,
        } => {
            let runner = load_runner(cli.catalog.as_deref())?;
            let mut config = BatchConfig::new(difficulty, Strategy::resolve(&strategy)?, count)
                .with_seed(seed)
                .with_max_ticks(max_ticks);
            config.parallel_games = parallel;
            cmd_batch(&runner, config, output)
        }
        Commands::Verify {
            difficulty,
            strategy,
            seed,
            runs,
        } => {
            let runner = load_runner(cli.catalog.as_deref())?;
            let config = BatchConfig::new(difficulty, Strategy::resolve(&strategy)?, 1);
            cmd_verify(&runner, &config, seed, runs)
        }
        Commands::Catalog { path, dump } => cmd_catalog(path.or(cli.catalog).as_deref(), dump),
    }
}

fn load_runner(path: Option<&Path>) -> Result<MatchRunner, RunnerError> {
    let catalog = match path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };
    Ok(MatchRunner::new(Arc::new(catalog)))
}

/// Play one match.
fn cmd_run(
    runner: &MatchRunner,
    config: &MatchConfig,
    output: Option<&Path>,
) -> Result<ExitCode, RunnerError> {
    let metrics = match output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            runner.run_with_output(config, &mut out)?
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            runner.run_with_output(config, &mut out)?
        }
    };

    eprintln!(
        "{:?} after {} ticks ({:.1}s match time), player killed {}, opponent bought {}",
        metrics.outcome,
        metrics.duration_ticks,
        metrics.duration_ms / 1000.0,
        metrics.player.total_killed(),
        metrics.opponent.total_spawned()
    );
    Ok(ExitCode::SUCCESS)
}

/// Run a batch and save the results.
fn cmd_batch(
    runner: &MatchRunner,
    config: BatchConfig,
    output: Option<PathBuf>,
) -> Result<ExitCode, RunnerError> {
    let output = output.unwrap_or_else(|| default_output_path(&config));
    let results = run_batch(runner, config);
    results.save(&output)?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", summary.total_games);
    if !results.errors.is_empty() {
        eprintln!("Matches FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} matches/sec",
        f64::from(summary.total_games) / results.duration_seconds.max(0.001)
    );
    eprintln!(
        "Player wins: {} ({:.1}%), losses: {}, timeouts: {}",
        summary.victories,
        summary.player_win_rate * 100.0,
        summary.defeats,
        summary.timeouts
    );
    eprintln!(
        "Match length: mean {:.0}, min {}, max {} ticks",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );
    if let Some(tick) = summary.avg_opponent_evolve_tick {
        eprintln!(
            "Opponent evolved in {:.0}% of matches, mean tick {:.0}",
            summary.opponent_evolve_rate * 100.0,
            tick
        );
    }
    for error in results.errors.iter().take(10) {
        eprintln!("  Match {} (seed {}): {}", error.game_index, error.seed, error.message);
    }
    eprintln!("\nResults saved to: {}", output.display());

    Ok(if results.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Replay one seed and compare.
fn cmd_verify(
    runner: &MatchRunner,
    config: &BatchConfig,
    seed: u64,
    runs: u32,
) -> Result<ExitCode, RunnerError> {
    tracing::info!(seed, runs, "Verifying determinism");
    if verify_determinism(runner, config, seed, runs)? {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        Ok(ExitCode::FAILURE)
    }
}

/// Validate or dump a catalog.
fn cmd_catalog(path: Option<&Path>, dump: bool) -> Result<ExitCode, RunnerError> {
    let catalog = match path {
        Some(path) => {
            let catalog = Catalog::load(path)?;
            eprintln!(
                "OK: {} ({} units, {} upgrades, {} difficulties)",
                path.display(),
                catalog.units.len(),
                catalog.upgrades.len(),
                catalog.difficulties.len()
            );
            catalog
        }
        None => Catalog::builtin(),
    };

    if dump || path.is_none() {
        println!("{}", catalog.to_ron_string()?);
    }
    Ok(ExitCode::SUCCESS)
}
