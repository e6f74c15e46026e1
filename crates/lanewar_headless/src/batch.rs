//! Batch match runner for balance testing.
//!
//! Runs many seeds of the same matchup in parallel using rayon. Every match
//! owns its own session; only the catalog is shared.

use std::path::{Path, PathBuf};
use std::time::Instant;

use lanewar_core::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, MatchMetrics};
use crate::runner::{MatchConfig, MatchRunner, RunnerError, DEFAULT_MAX_TICKS};
use crate::strategies::Strategy;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Opponent difficulty.
    pub difficulty: DifficultyId,
    /// Player strategy.
    pub strategy: Strategy,
    /// Number of matches to run.
    pub game_count: u32,
    /// Seed of the first match; match `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Maximum updates per match (0 = until a base falls).
    pub max_ticks: u64,
    /// Worker threads (0 = rayon default).
    pub parallel_games: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyId::Normal,
            strategy: Strategy::default(),
            game_count: 100,
            seed_start: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            parallel_games: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a matchup.
    #[must_use]
    pub fn new(difficulty: DifficultyId, strategy: Strategy, game_count: u32) -> Self {
        Self {
            difficulty,
            strategy,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the per-match update limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    fn match_config(&self, seed: u64) -> MatchConfig {
        MatchConfig {
            difficulty: self.difficulty,
            seed,
            max_ticks: self.max_ticks,
            strategy: self.strategy.clone(),
            frame_every: 0,
        }
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual match metrics, in seed order.
    pub games: Vec<MatchMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Matches that failed to run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), RunnerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// A match that failed to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Run a batch of matches.
pub fn run_batch(runner: &MatchRunner, config: BatchConfig) -> BatchResults {
    let start = Instant::now();

    info!(
        games = config.game_count,
        difficulty = %config.difficulty,
        strategy = %config.strategy.name,
        "Starting batch run"
    );

    let play_all = || -> Vec<Result<MatchMetrics, BatchError>> {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                runner.run(&config.match_config(seed)).map_err(|e| {
                    warn!(game = i, seed, error = %e, "Match failed");
                    BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    };

    let results = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(play_all),
            Err(e) => {
                warn!(error = %e, "Could not build thread pool, using the global one");
                play_all()
            }
        }
    } else {
        play_all()
    };

    let mut games = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => games.push(metrics),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        failed = errors.len(),
        win_rate = summary.player_win_rate,
        "Batch complete in {:.1}s",
        duration_seconds
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same seed `runs` times and check every run ends identically.
pub fn verify_determinism(
    runner: &MatchRunner,
    config: &BatchConfig,
    seed: u64,
    runs: u32,
) -> Result<bool, RunnerError> {
    let match_config = config.match_config(seed);
    let first = runner.run(&match_config)?;
    for run in 1..runs {
        let again = runner.run(&match_config)?;
        if again != first {
            debug!(
                run,
                expected = first.final_state_hash,
                actual = again.final_state_hash,
                "Run diverged"
            );
            return Ok(false);
        }
    }
    Ok(true)
}

/// Default location for batch output.
#[must_use]
pub fn default_output_path(config: &BatchConfig) -> PathBuf {
    PathBuf::from("results").join(format!(
        "{}_{}_{}.json",
        config.difficulty,
        config.strategy.name.to_ascii_lowercase(),
        config.seed_start
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(strategy: Strategy, count: u32) -> BatchConfig {
        BatchConfig::new(DifficultyId::Normal, strategy, count).with_max_ticks(600)
    }

    #[test]
    fn test_batch_config_builder() {
        let config = short(Strategy::rush(), 5).with_seed(12345);
        assert_eq!(config.game_count, 5);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.match_config(12346).seed, 12346);
    }

    #[test]
    fn test_run_batch_small() {
        let runner = MatchRunner::builtin();
        let results = run_batch(&runner, short(Strategy::rush(), 6).with_seed(10));

        assert_eq!(results.games.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 6);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_parallelism_does_not_change_results() {
        let runner = MatchRunner::builtin();
        let mut config = short(Strategy::balanced(), 4);
        let serial = {
            config.parallel_games = 1;
            run_batch(&runner, config.clone()).games
        };
        config.parallel_games = 3;
        assert_eq!(run_batch(&runner, config).games, serial);
    }

    #[test]
    fn test_verify_determinism() {
        let runner = MatchRunner::builtin();
        assert!(verify_determinism(&runner, &short(Strategy::turtle(), 1), 77, 3).unwrap());
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(&short(Strategy::rush(), 1).with_seed(3));
        assert_eq!(path, PathBuf::from("results/normal_rush_3.json"));
    }
}
