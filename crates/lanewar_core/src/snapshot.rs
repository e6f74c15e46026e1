//! Owned read-only view of a match for presentation layers.

use serde::{Deserialize, Serialize};

use crate::components::{Age, Base, MatchPhase, MatchStats, Projectile, Side, Unit};
use crate::data::DifficultyId;
use crate::math::{fixed_serde, Fixed};
use crate::session::GameSession;

/// Presentation view of one base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSnapshot {
    /// Owning side.
    pub side: Side,
    /// Health clamped to `0..=max_health`.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Health cap.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Spendable gold.
    #[serde(with = "fixed_serde")]
    pub gold: Fixed,
    /// Lifetime earnings (opponent only).
    #[serde(with = "fixed_serde")]
    pub accumulated_gold: Fixed,
    /// Current age.
    pub age: Age,
    /// Upgrades bought, sorted.
    pub upgrades: Vec<String>,
    /// Installed cannons.
    pub cannons: usize,
}

impl BaseSnapshot {
    fn capture(base: &Base) -> Self {
        Self {
            side: base.side,
            health: base.display_health(),
            max_health: base.max_health,
            gold: base.gold,
            accumulated_gold: base.accumulated_gold,
            age: base.age,
            upgrades: base.upgrades.iter().cloned().collect(),
            cannons: base.cannons.len(),
        }
    }
}

/// Everything a renderer or HUD needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Updates run so far.
    pub tick: u64,
    /// Match phase.
    pub phase: MatchPhase,
    /// Difficulty in effect.
    pub difficulty: DifficultyId,
    /// Player base.
    pub player_base: BaseSnapshot,
    /// Opponent base.
    pub enemy_base: BaseSnapshot,
    /// Live units in id order.
    pub units: Vec<Unit>,
    /// Projectiles in flight.
    pub projectiles: Vec<Projectile>,
    /// Match statistics.
    pub stats: MatchStats,
}

impl GameSnapshot {
    /// Copy the presentation-relevant state out of `session`.
    #[must_use]
    pub fn capture(session: &GameSession) -> Self {
        Self {
            tick: session.tick(),
            phase: session.phase(),
            difficulty: session.difficulty().id,
            player_base: BaseSnapshot::capture(session.base(Side::Player)),
            enemy_base: BaseSnapshot::capture(session.base(Side::Opponent)),
            units: session.roster().iter().cloned().collect(),
            projectiles: session.projectiles().to_vec(),
            stats: *session.stats(),
        }
    }

    /// Live units of one side.
    pub fn units_of(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.side == side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::Catalog;

    #[test]
    fn test_snapshot_clamps_health() {
        let mut session =
            GameSession::new(Arc::new(Catalog::builtin()), DifficultyId::Normal, 5).unwrap();
        session.base_mut(Side::Opponent).health = Fixed::from_num(-12);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.enemy_base.health, Fixed::ZERO);
        assert_eq!(snapshot.player_base.health, Fixed::from_num(100));
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let mut session =
            GameSession::new(Arc::new(Catalog::builtin()), DifficultyId::Easy, 5).unwrap();
        session.try_spawn_unit("archer", Side::Player).unwrap();
        let snapshot = session.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"archetype\":\"archer\""));
        assert!(json.contains("\"phase\":\"playing\""));

        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.units.len(), 1);
        assert_eq!(back.units_of(Side::Player).count(), 1);
    }
}
