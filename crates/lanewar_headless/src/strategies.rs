//! Scripted player strategies for headless matches.
//!
//! A strategy is a build order followed by an optional repeating unit
//! cycle. Units are named by cost bucket so one order works in both ages.

use std::collections::VecDeque;
use std::path::Path;

use lanewar_core::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// A complete player strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Steps executed in order; a step that cannot be afforded yet blocks
    /// the ones behind it.
    pub build_order: Vec<BuildOrderItem>,
    /// Buckets bought round-robin once the build order is done.
    #[serde(default)]
    pub cycle: Vec<CostBucket>,
    /// Evolve as soon as gold allows, ahead of anything queued.
    #[serde(default)]
    pub evolve_when_affordable: bool,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl Strategy {
    /// Names accepted by [`Strategy::preset`].
    pub const PRESETS: [&'static str; 4] = ["idle", "rush", "turtle", "balanced"];

    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Look up a built-in strategy by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "idle" => Some(Self::idle()),
            "rush" => Some(Self::rush()),
            "turtle" => Some(Self::turtle()),
            "balanced" => Some(Self::balanced()),
            _ => None,
        }
    }

    /// A preset name, or else a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, StrategyError> {
        match Self::preset(name_or_path) {
            Some(strategy) => Ok(strategy),
            None => Self::load(name_or_path),
        }
    }

    /// Never buys anything. Baseline for how long the opponent needs.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            name: "Idle".to_string(),
            description: "Buys nothing".to_string(),
            build_order: Vec::new(),
            cycle: Vec::new(),
            evolve_when_affordable: false,
        }
    }

    /// Cheapest unit, every time it is affordable.
    #[must_use]
    pub fn rush() -> Self {
        Self {
            name: "Rush".to_string(),
            description: "Floods the lane with cheap units".to_string(),
            build_order: Vec::new(),
            cycle: vec![CostBucket::Low],
            evolve_when_affordable: false,
        }
    }

    /// Fortify first, then hold with mid-cost units.
    #[must_use]
    pub fn turtle() -> Self {
        Self {
            name: "Turtle".to_string(),
            description: "Cannons and wall before any army".to_string(),
            build_order: vec![
                BuildOrderItem::Unit(CostBucket::Low),
                BuildOrderItem::Upgrade("cannon".to_string()),
                BuildOrderItem::Upgrade("wall".to_string()),
                BuildOrderItem::Upgrade("heavy_cannon".to_string()),
            ],
            cycle: vec![CostBucket::Mid],
            evolve_when_affordable: false,
        }
    }

    /// Early screen, evolve, then a mixed army.
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            name: "Balanced".to_string(),
            description: "Screen, evolve, then mixed army".to_string(),
            build_order: vec![
                BuildOrderItem::Unit(CostBucket::Low),
                BuildOrderItem::Unit(CostBucket::Mid),
                BuildOrderItem::Evolve,
                BuildOrderItem::Upgrade("cannon".to_string()),
            ],
            cycle: vec![CostBucket::Low, CostBucket::Mid, CostBucket::High],
            evolve_when_affordable: false,
        }
    }
}

/// A single step of a build order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildOrderItem {
    /// Buy the archetype in this bucket for the current age.
    Unit(CostBucket),
    /// Buy an upgrade.
    Upgrade(String),
    /// Evolve to the second age.
    Evolve,
    /// Hold until the player has this much gold.
    WaitForGold(i64),
    /// Hold until this update.
    WaitForTick(u64),
}

/// Runtime state for following a strategy through one match.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    strategy: Strategy,
    queue: VecDeque<BuildOrderItem>,
    cycle_index: usize,
}

impl StrategyExecutor {
    /// Create a new executor for a strategy.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        let queue = strategy.build_order.iter().cloned().collect();
        Self {
            strategy,
            queue,
            cycle_index: 0,
        }
    }

    /// Strategy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.strategy.name
    }

    /// Fraction of the build order completed.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let total = self.strategy.build_order.len();
        if total == 0 {
            1.0
        } else {
            (total - self.queue.len()) as f64 / total as f64
        }
    }

    /// The command to issue before the next update, if any.
    ///
    /// Only returns commands the session would accept right now. A step
    /// that can never succeed (unknown id, already owned, already evolved)
    /// is dropped; one that is merely unaffordable waits.
    pub fn next_command(&mut self, session: &GameSession) -> Option<Command> {
        if session.phase().is_terminal() {
            return None;
        }

        if self.strategy.evolve_when_affordable && session.check_evolve(Side::Player).is_ok() {
            return Some(Command::Evolve { side: Side::Player });
        }

        while let Some(item) = self.queue.front() {
            let command = match item {
                BuildOrderItem::WaitForGold(amount) => {
                    if session.base(Side::Player).gold < Fixed::from_num(*amount) {
                        return None;
                    }
                    self.queue.pop_front();
                    continue;
                }
                BuildOrderItem::WaitForTick(tick) => {
                    if session.tick() < *tick {
                        return None;
                    }
                    self.queue.pop_front();
                    continue;
                }
                BuildOrderItem::Unit(bucket) => match unit_command(session, *bucket) {
                    Some(command) => command,
                    None => {
                        self.queue.pop_front();
                        continue;
                    }
                },
                BuildOrderItem::Upgrade(upgrade) => Command::upgrade(upgrade.as_str()),
                BuildOrderItem::Evolve => Command::Evolve { side: Side::Player },
            };

            return match session.check_command(&command) {
                Ok(()) => {
                    self.queue.pop_front();
                    Some(command)
                }
                Err(CommandError::InsufficientGold { .. }) => None,
                Err(reason) => {
                    tracing::debug!(strategy = %self.strategy.name, %reason, "Dropping build step");
                    self.queue.pop_front();
                    continue;
                }
            };
        }

        self.next_cycle_command(session)
    }

    fn next_cycle_command(&mut self, session: &GameSession) -> Option<Command> {
        if self.strategy.cycle.is_empty() {
            return None;
        }
        let bucket = self.strategy.cycle[self.cycle_index % self.strategy.cycle.len()];
        let command = unit_command(session, bucket)?;
        session.check_command(&command).ok()?;
        self.cycle_index += 1;
        Some(command)
    }
}

fn unit_command(session: &GameSession, bucket: CostBucket) -> Option<Command> {
    let age = session.base(Side::Player).age;
    session
        .catalog()
        .archetype_for(age, bucket)
        .map(|unit| Command::spawn(unit.id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn session_with_gold(gold: i32) -> GameSession {
        let mut catalog = Catalog::builtin();
        for row in &mut catalog.difficulties {
            row.ai_buy_chance = 0.0;
        }
        let mut session = GameSession::new(Arc::new(catalog), DifficultyId::Normal, 0).unwrap();
        session.base_mut(Side::Player).gold = Fixed::from_num(gold);
        session
    }

    #[test]
    fn test_presets_resolve() {
        for name in Strategy::PRESETS {
            assert!(Strategy::preset(name).is_some(), "{name}");
        }
        assert_eq!(Strategy::resolve("RUSH").unwrap().name, "Rush");
        assert!(matches!(
            Strategy::resolve("no_such_strategy.ron"),
            Err(StrategyError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_ron_roundtrip() {
        let strategy = Strategy::turtle();
        let text = ron::to_string(&strategy).unwrap();
        assert_eq!(Strategy::from_ron_str(&text).unwrap(), strategy);
    }

    #[test]
    fn test_parse_minimal_ron() {
        let strategy = Strategy::from_ron_str(
            r#"(name: "Cheap", build_order: [WaitForGold(50), Unit(Low)], cycle: [High])"#,
        )
        .unwrap();
        assert_eq!(strategy.build_order.len(), 2);
        assert!(!strategy.evolve_when_affordable);
    }

    #[test]
    fn test_idle_never_acts() {
        let session = session_with_gold(10_000);
        let mut executor = StrategyExecutor::new(Strategy::idle());
        assert_eq!(executor.next_command(&session), None);
        assert_eq!(executor.progress(), 1.0);
    }

    #[test]
    fn test_rush_buys_cheapest_of_age() {
        let mut session = session_with_gold(100);
        let mut executor = StrategyExecutor::new(Strategy::rush());
        assert_eq!(executor.next_command(&session), Some(Command::spawn("warrior")));

        session.base_mut(Side::Player).age = Age::Second;
        assert_eq!(
            executor.next_command(&session),
            Some(Command::spawn("heavy_swordsman"))
        );
    }

    #[test]
    fn test_unaffordable_step_waits() {
        let mut session = session_with_gold(0);
        let mut executor = StrategyExecutor::new(Strategy::turtle());
        assert_eq!(executor.next_command(&session), None);

        session.base_mut(Side::Player).gold = Fixed::from_num(15);
        assert_eq!(executor.next_command(&session), Some(Command::spawn("warrior")));
        // Cannon costs 200.
        assert_eq!(executor.next_command(&session), None);
        assert_eq!(executor.progress(), 0.25);
    }

    #[test]
    fn test_impossible_step_is_dropped() {
        let mut session = session_with_gold(1000);
        session.base_mut(Side::Player).upgrades.insert("cannon".to_string());
        let mut executor = StrategyExecutor::new(Strategy {
            name: "Dup".to_string(),
            description: String::new(),
            build_order: vec![
                BuildOrderItem::Upgrade("cannon".to_string()),
                BuildOrderItem::Upgrade("moat".to_string()),
                BuildOrderItem::Upgrade("heavy_cannon".to_string()),
            ],
            cycle: Vec::new(),
            evolve_when_affordable: false,
        });
        assert_eq!(
            executor.next_command(&session),
            Some(Command::upgrade("heavy_cannon"))
        );
    }

    #[test]
    fn test_wait_for_tick_blocks() {
        let session = session_with_gold(1000);
        let mut executor = StrategyExecutor::new(Strategy {
            name: "Late".to_string(),
            description: String::new(),
            build_order: vec![BuildOrderItem::WaitForTick(10), BuildOrderItem::Evolve],
            cycle: Vec::new(),
            evolve_when_affordable: false,
        });
        assert_eq!(executor.next_command(&session), None);
    }

    #[test]
    fn test_evolve_when_affordable_jumps_queue() {
        let session = session_with_gold(150);
        let mut strategy = Strategy::rush();
        strategy.evolve_when_affordable = true;
        let mut executor = StrategyExecutor::new(strategy);
        assert_eq!(
            executor.next_command(&session),
            Some(Command::Evolve { side: Side::Player })
        );
    }
}
