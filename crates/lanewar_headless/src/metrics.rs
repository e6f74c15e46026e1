//! Match metrics collection for balance analysis.
//!
//! [`MetricsCollector`] folds each update's [`TickEvents`] into a
//! [`MatchMetrics`] record; [`BatchSummary`] aggregates many records.

use std::collections::BTreeMap;

use lanewar_core::prelude::*;
use serde::{Deserialize, Serialize};

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The opponent's base fell.
    Victory,
    /// The player's base fell.
    Defeat,
    /// The update limit was reached first.
    #[default]
    Timeout,
}

/// Per-side totals for one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Units bought, by archetype.
    pub units_spawned: BTreeMap<String, u32>,
    /// Own units that died, by archetype.
    pub units_lost: BTreeMap<String, u32>,
    /// Enemy units killed, by archetype.
    pub units_killed: BTreeMap<String, u32>,
    /// Of those kills, how many a cannon landed.
    pub cannon_kills: u32,
    /// Gold earned from kills.
    pub kill_rewards: f64,
    /// Damage dealt to the enemy base.
    pub base_damage_dealt: f64,
    /// Update on which the side evolved.
    pub evolved_at_tick: Option<u64>,
    /// Upgrades owned at the end.
    pub upgrades: Vec<String>,
    /// Base health at the end, clamped for display.
    pub final_base_health: f64,
    /// Gold on hand at the end.
    pub final_gold: f64,
}

impl SideMetrics {
    fn record_spawn(&mut self, archetype: &str) {
        *self.units_spawned.entry(archetype.to_string()).or_default() += 1;
    }

    /// Total units bought.
    #[must_use]
    pub fn total_spawned(&self) -> u32 {
        self.units_spawned.values().sum()
    }

    /// Total enemy units killed.
    #[must_use]
    pub fn total_killed(&self) -> u32 {
        self.units_killed.values().sum()
    }
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Seed the match ran with.
    pub seed: u64,
    /// Difficulty played.
    pub difficulty: Option<DifficultyId>,
    /// Player strategy name.
    pub strategy: String,
    /// Updates run.
    pub duration_ticks: u64,
    /// Match clock at the end, in milliseconds.
    pub duration_ms: f64,
    /// Result.
    pub outcome: Outcome,
    /// Player totals.
    pub player: SideMetrics,
    /// Opponent totals.
    pub opponent: SideMetrics,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl MatchMetrics {
    fn side_mut(&mut self, side: Side) -> &mut SideMetrics {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }
}

/// Tracks events during a match.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: MatchMetrics,
}

impl MetricsCollector {
    /// Create a new collector.
    #[must_use]
    pub fn new(seed: u64, difficulty: DifficultyId, strategy: &str) -> Self {
        Self {
            metrics: MatchMetrics {
                seed,
                difficulty: Some(difficulty),
                strategy: strategy.to_string(),
                ..Default::default()
            },
        }
    }

    /// Record a player command that was applied before update `tick`.
    pub fn on_player_command(&mut self, command: &Command, tick: u64) {
        match command {
            Command::SpawnUnit { archetype, side } => {
                self.metrics.side_mut(*side).record_spawn(archetype);
            }
            Command::Evolve { side } => {
                self.metrics.side_mut(*side).evolved_at_tick.get_or_insert(tick);
            }
            _ => {}
        }
    }

    /// Fold one update's events in.
    pub fn on_tick(&mut self, events: &TickEvents) {
        for kill in &events.kills {
            let killer = self.metrics.side_mut(kill.victim_side.opposing());
            *killer.units_killed.entry(kill.archetype.clone()).or_default() += 1;
            killer.kill_rewards += kill.reward.to_num::<f64>();
            if kill.source == KillSource::Cannon {
                killer.cannon_kills += 1;
            }
            *self
                .metrics
                .side_mut(kill.victim_side)
                .units_lost
                .entry(kill.archetype.clone())
                .or_default() += 1;
        }

        for hit in &events.base_hits {
            self.metrics.side_mut(hit.side.opposing()).base_damage_dealt += hit.damage.to_num::<f64>();
        }

        match &events.opponent_action {
            Some(OpponentAction::Buy { archetype, .. }) => self.metrics.opponent.record_spawn(archetype),
            Some(OpponentAction::Evolve) => {
                self.metrics.opponent.evolved_at_tick.get_or_insert(events.tick);
            }
            None => {}
        }
    }

    /// Current metrics.
    #[must_use]
    pub fn current(&self) -> &MatchMetrics {
        &self.metrics
    }

    /// Read the end state off the session and return the record.
    #[must_use]
    pub fn finalize(mut self, session: &GameSession) -> MatchMetrics {
        self.metrics.duration_ticks = session.tick();
        self.metrics.duration_ms = session.stats().elapsed_time_ms.to_num::<f64>();
        self.metrics.outcome = match session.phase() {
            MatchPhase::Victory => Outcome::Victory,
            MatchPhase::Defeat => Outcome::Defeat,
            MatchPhase::Playing => Outcome::Timeout,
        };
        for side in [Side::Player, Side::Opponent] {
            let base = session.base(side);
            let record = self.metrics.side_mut(side);
            record.upgrades = base.upgrades.iter().cloned().collect();
            record.final_base_health = base.display_health().to_num::<f64>();
            record.final_gold = base.gold.to_num::<f64>();
        }
        self.metrics.final_state_hash = session.state_hash();
        self.metrics
    }
}

/// Summary statistics across many matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches played.
    pub total_games: u32,
    /// Player victories.
    pub victories: u32,
    /// Player defeats.
    pub defeats: u32,
    /// Matches that hit the update limit.
    pub timeouts: u32,
    /// Victories over all matches.
    pub player_win_rate: f64,
    /// Mean match length in updates.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,
    /// Mean opponent units killed by the player.
    pub avg_player_kills: f64,
    /// Mean units the opponent bought.
    pub avg_opponent_spawns: f64,
    /// Fraction of matches in which the opponent evolved.
    pub opponent_evolve_rate: f64,
    /// Mean update of the opponent's evolution, where it happened.
    pub avg_opponent_evolve_tick: Option<f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of match metrics.
    #[must_use]
    pub fn from_games(games: &[MatchMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let count = games.len() as f64;
        let mut summary = Self {
            total_games: games.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut kills = 0u64;
        let mut spawns = 0u64;
        let mut evolve_ticks = Vec::new();

        for game in games {
            match game.outcome {
                Outcome::Victory => summary.victories += 1,
                Outcome::Defeat => summary.defeats += 1,
                Outcome::Timeout => summary.timeouts += 1,
            }
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);
            kills += u64::from(game.player.total_killed());
            spawns += u64::from(game.opponent.total_spawned());
            if let Some(tick) = game.opponent.evolved_at_tick {
                evolve_ticks.push(tick);
            }
        }

        summary.player_win_rate = f64::from(summary.victories) / count;
        summary.avg_duration_ticks = duration_sum as f64 / count;
        summary.avg_player_kills = kills as f64 / count;
        summary.avg_opponent_spawns = spawns as f64 / count;
        summary.opponent_evolve_rate = evolve_ticks.len() as f64 / count;
        if !evolve_ticks.is_empty() {
            let sum: u64 = evolve_ticks.iter().sum();
            summary.avg_opponent_evolve_tick = Some(sum as f64 / evolve_ticks.len() as f64);
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanewar_core::session::{BaseHit, KillEvent};

    fn kill(victim_side: Side, archetype: &str, source: KillSource) -> KillEvent {
        KillEvent {
            victim: UnitId(9),
            victim_side,
            archetype: archetype.to_string(),
            reward: Fixed::from_num(15),
            source,
        }
    }

    #[test]
    fn test_kills_credit_both_sides() {
        let mut collector = MetricsCollector::new(1, DifficultyId::Normal, "Rush");
        collector.on_tick(&TickEvents {
            tick: 5,
            kills: vec![
                kill(Side::Opponent, "warrior", KillSource::Unit),
                kill(Side::Opponent, "archer", KillSource::Cannon),
                kill(Side::Player, "warrior", KillSource::Unit),
            ],
            ..Default::default()
        });

        let m = collector.current();
        assert_eq!(m.player.total_killed(), 2);
        assert_eq!(m.player.cannon_kills, 1);
        assert!((m.player.kill_rewards - 30.0).abs() < 1e-9);
        assert_eq!(m.opponent.units_lost.get("archer"), Some(&1));
        assert_eq!(m.player.units_lost.get("warrior"), Some(&1));
        assert_eq!(m.opponent.total_killed(), 1);
    }

    #[test]
    fn test_base_hits_and_opponent_actions() {
        let mut collector = MetricsCollector::new(1, DifficultyId::Hard, "Idle");
        collector.on_tick(&TickEvents {
            tick: 40,
            base_hits: vec![BaseHit {
                side: Side::Player,
                attacker: UnitId(3),
                damage: Fixed::from_num(5),
            }],
            opponent_action: Some(OpponentAction::Buy {
                archetype: "knight".to_string(),
                bucket: CostBucket::High,
            }),
            ..Default::default()
        });
        collector.on_tick(&TickEvents {
            tick: 41,
            opponent_action: Some(OpponentAction::Evolve),
            ..Default::default()
        });

        let m = collector.current();
        assert!((m.opponent.base_damage_dealt - 5.0).abs() < 1e-9);
        assert_eq!(m.opponent.units_spawned.get("knight"), Some(&1));
        assert_eq!(m.opponent.evolved_at_tick, Some(41));
    }

    #[test]
    fn test_player_commands_recorded() {
        let mut collector = MetricsCollector::new(1, DifficultyId::Easy, "Balanced");
        collector.on_player_command(&Command::spawn("warrior"), 0);
        collector.on_player_command(&Command::spawn("warrior"), 3);
        collector.on_player_command(&Command::Evolve { side: Side::Player }, 90);
        collector.on_player_command(&Command::Evolve { side: Side::Player }, 95);
        collector.on_player_command(&Command::upgrade("wall"), 100);

        let m = collector.current();
        assert_eq!(m.player.units_spawned.get("warrior"), Some(&2));
        assert_eq!(m.player.evolved_at_tick, Some(90));
    }

    #[test]
    fn test_batch_summary() {
        let game = |outcome, ticks, evolved| MatchMetrics {
            outcome,
            duration_ticks: ticks,
            opponent: SideMetrics {
                evolved_at_tick: evolved,
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = BatchSummary::from_games(&[
            game(Outcome::Victory, 1000, None),
            game(Outcome::Defeat, 2000, Some(600)),
            game(Outcome::Victory, 3000, Some(800)),
            game(Outcome::Timeout, 6000, None),
        ]);

        assert_eq!(summary.total_games, 4);
        assert_eq!(summary.victories, 2);
        assert_eq!(summary.timeouts, 1);
        assert!((summary.player_win_rate - 0.5).abs() < 1e-9);
        assert!((summary.avg_duration_ticks - 3000.0).abs() < 1e-9);
        assert_eq!(summary.min_duration_ticks, 1000);
        assert_eq!(summary.max_duration_ticks, 6000);
        assert!((summary.opponent_evolve_rate - 0.5).abs() < 1e-9);
        assert_eq!(summary.avg_opponent_evolve_tick, Some(700.0));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }
}
