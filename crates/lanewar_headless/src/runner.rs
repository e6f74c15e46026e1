//! Single-match runner.
//!
//! Plays one match of a scripted [`Strategy`] against the automated
//! opponent using fixed-length updates, optionally streaming JSON-lines
//! [`Record`]s to a writer.

use std::io::Write;
use std::sync::Arc;

use lanewar_core::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{MatchMetrics, MetricsCollector};
use crate::protocol::Record;
use crate::strategies::{Strategy, StrategyError, StrategyExecutor};

/// Updates in ten minutes of match time.
pub const DEFAULT_MAX_TICKS: u64 = 10 * 60 * TICK_RATE as u64;

/// Errors from running a match.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Catalog or session setup failed.
    #[error(transparent)]
    Game(#[from] GameError),
    /// The strategy could not be loaded.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    /// Writing output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
    /// Encoding output failed.
    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Opponent difficulty.
    pub difficulty: DifficultyId,
    /// RNG seed.
    pub seed: u64,
    /// Stop after this many updates (0 = until a base falls).
    pub max_ticks: u64,
    /// Player strategy.
    pub strategy: Strategy,
    /// Emit a frame every N updates (0 = never).
    #[serde(default)]
    pub frame_every: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyId::Normal,
            seed: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            strategy: Strategy::default(),
            frame_every: 0,
        }
    }
}

/// Runs headless matches against a shared catalog.
#[derive(Debug, Clone)]
pub struct MatchRunner {
    catalog: Arc<Catalog>,
}

impl MatchRunner {
    /// Runner over an already validated catalog.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Runner over the built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(Arc::new(Catalog::builtin()))
    }

    /// Catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Play a match to completion without output.
    pub fn run(&self, config: &MatchConfig) -> Result<MatchMetrics, RunnerError> {
        self.play(config, None)
    }

    /// Play a match, writing JSON lines to `out`.
    pub fn run_with_output<W: Write>(
        &self,
        config: &MatchConfig,
        out: &mut W,
    ) -> Result<MatchMetrics, RunnerError> {
        self.play(config, Some(out as &mut dyn Write))
    }

    fn play(
        &self,
        config: &MatchConfig,
        mut out: Option<&mut dyn Write>,
    ) -> Result<MatchMetrics, RunnerError> {
        let mut sim =
            Simulation::with_shared_catalog(Arc::clone(&self.catalog), config.difficulty, config.seed)?;
        let mut executor = StrategyExecutor::new(config.strategy.clone());
        let mut collector = MetricsCollector::new(config.seed, config.difficulty, executor.name());

        tracing::info!(
            seed = config.seed,
            difficulty = %config.difficulty,
            strategy = executor.name(),
            "Starting headless match"
        );

        if let Some(out) = out.as_deref_mut() {
            let start = Record::Start {
                seed: config.seed,
                difficulty: config.difficulty,
                strategy: executor.name().to_string(),
            };
            out.write_all(start.to_json_line()?.as_bytes())?;
        }

        loop {
            let tick = sim.session().tick();
            if config.max_ticks > 0 && tick >= config.max_ticks {
                break;
            }

            while let Some(command) = executor.next_command(sim.session()) {
                match sim.try_apply(command.clone()) {
                    Ok(()) => collector.on_player_command(&command, tick),
                    Err(reason) => {
                        tracing::warn!(%reason, ?command, "Strategy issued a rejected command");
                        break;
                    }
                }
            }

            let Some(events) = sim.step() else {
                break;
            };
            collector.on_tick(&events);

            if let Some(out) = out.as_deref_mut() {
                if config.frame_every > 0 && events.tick % config.frame_every == 0 {
                    let frame = Record::Frame {
                        tick: events.tick,
                        snapshot: sim.snapshot(),
                        events,
                    };
                    out.write_all(frame.to_json_line()?.as_bytes())?;
                }
            }

            if sim.phase().is_terminal() {
                break;
            }
        }

        let metrics = collector.finalize(sim.session());
        tracing::info!(
            seed = metrics.seed,
            outcome = ?metrics.outcome,
            ticks = metrics.duration_ticks,
            "Headless match finished"
        );

        if let Some(out) = out.as_deref_mut() {
            let result = Record::Result {
                metrics: metrics.clone(),
            };
            out.write_all(result.to_json_line()?.as_bytes())?;
            out.flush()?;
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Outcome;

    #[test]
    fn test_idle_player_loses_to_opponent() {
        let runner = MatchRunner::builtin();
        let config = MatchConfig {
            difficulty: DifficultyId::Hard,
            seed: 4,
            max_ticks: 0,
            strategy: Strategy::idle(),
            frame_every: 0,
        };
        let metrics = runner.run(&config).unwrap();
        assert_eq!(metrics.outcome, Outcome::Defeat);
        assert_eq!(metrics.player.total_spawned(), 0);
        assert!(metrics.opponent.total_spawned() > 0);
        assert_eq!(metrics.player.final_base_health, 0.0);
    }

    #[test]
    fn test_timeout_respects_limit() {
        let runner = MatchRunner::builtin();
        let config = MatchConfig {
            max_ticks: 90,
            strategy: Strategy::rush(),
            ..Default::default()
        };
        let metrics = runner.run(&config).unwrap();
        assert_eq!(metrics.outcome, Outcome::Timeout);
        assert_eq!(metrics.duration_ticks, 90);
        // 100 starting gold buys six warriors up front.
        assert!(metrics.player.units_spawned["warrior"] >= 6);
    }

    #[test]
    fn test_same_config_same_result() {
        let runner = MatchRunner::builtin();
        let config = MatchConfig {
            seed: 99,
            max_ticks: 3600,
            strategy: Strategy::balanced(),
            ..Default::default()
        };
        assert_eq!(runner.run(&config).unwrap(), runner.run(&config).unwrap());
    }

    #[test]
    fn test_output_lines() {
        let runner = MatchRunner::builtin();
        let config = MatchConfig {
            max_ticks: 120,
            frame_every: 60,
            ..Default::default()
        };
        let mut out = Vec::new();
        runner.run_with_output(&config, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let records: Vec<Record> = text.lines().map(|l| Record::from_json(l).unwrap()).collect();
        assert_eq!(records.len(), 4);
        assert!(matches!(records[0], Record::Start { .. }));
        assert!(matches!(records[1], Record::Frame { tick: 60, .. }));
        assert!(matches!(records[2], Record::Frame { tick: 120, .. }));
        assert!(matches!(records[3], Record::Result { .. }));
    }
}
