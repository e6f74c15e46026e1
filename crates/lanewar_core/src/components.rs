//! Game state records.
//!
//! Components are plain data: bases, units, projectiles and the match
//! bookkeeping around them. Behavior lives in the phase modules.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, option_fixed_serde, Fixed, Vec2Fixed};

/// Which end of the lane a base, unit or projectile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Human-controlled side, left end of the lane.
    Player,
    /// Automated opponent, right end of the lane.
    Opponent,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opposing(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Opponent => f.write_str("opponent"),
        }
    }
}

/// Armament tier of a side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Age {
    /// Starting age.
    #[default]
    First,
    /// Reached by evolving; final.
    Second,
}

impl Age {
    /// Numeric age (1 or 2).
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Combat style. Cosmetic: both classes resolve combat identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorClass {
    /// Close-quarters unit.
    Melee,
    /// Long-range unit.
    Ranged,
}

/// What a unit did on its last update, for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// Advancing along the lane.
    #[default]
    Walking,
    /// Holding position against a unit or base in range.
    Attacking,
}

/// Stable unit identifier, assigned in spawn order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Stable projectile identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProjectileId(pub u32);

/// A live unit instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Owning side.
    pub side: Side,
    /// Catalog archetype this unit was spawned from.
    pub archetype: String,
    /// Position along the lane.
    #[serde(with = "fixed_serde")]
    pub position: Fixed,
    /// Current health (pending damage is tracked by the roster).
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Health at spawn.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Damage per attack.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Maximum lane distance at which the unit can attack.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Distance moved per update.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Minimum time between attacks in milliseconds.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown_ms: Fixed,
    /// Match time of the last attack, `None` before the first.
    #[serde(with = "option_fixed_serde")]
    pub last_attack_ms: Option<Fixed>,
    /// Combat style.
    pub behavior: BehaviorClass,
    /// Gold paid to the killer's side.
    #[serde(with = "fixed_serde")]
    pub reward: Fixed,
    /// What the unit did on its last update.
    pub state: UnitState,
}

impl Unit {
    /// Check whether the attack cooldown has elapsed at `now_ms`.
    #[must_use]
    pub fn can_attack(&self, now_ms: Fixed) -> bool {
        match self.last_attack_ms {
            Some(last) => now_ms - last >= self.attack_cooldown_ms,
            None => true,
        }
    }
}

/// A defensive emplacement installed by a cannon upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cannon {
    /// Upgrade that installed this cannon.
    pub upgrade: String,
    /// Damage per projectile.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Firing range measured along the lane from the emplacement.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Minimum time between shots in milliseconds.
    #[serde(with = "fixed_serde")]
    pub cooldown_ms: Fixed,
    /// Projectile travel per update.
    #[serde(with = "fixed_serde")]
    pub projectile_speed: Fixed,
    /// Match time of the last shot, `None` before the first.
    #[serde(with = "option_fixed_serde")]
    pub last_fired_ms: Option<Fixed>,
}

impl Cannon {
    /// Check whether the cannon may fire at `now_ms`.
    #[must_use]
    pub fn is_ready(&self, now_ms: Fixed) -> bool {
        match self.last_fired_ms {
            Some(last) => now_ms - last >= self.cooldown_ms,
            None => true,
        }
    }
}

/// One side's base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    /// Owning side.
    pub side: Side,
    /// Current health. Drops below zero only on the defeating hit.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Health cap; raised by the wall upgrade.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Spendable gold.
    #[serde(with = "fixed_serde")]
    pub gold: Fixed,
    /// Lifetime gold earned. Only advanced for the automated side, where it
    /// gates evolution.
    #[serde(with = "fixed_serde")]
    pub accumulated_gold: Fixed,
    /// Current armament tier.
    pub age: Age,
    /// Upgrade ids bought so far.
    pub upgrades: BTreeSet<String>,
    /// Installed cannons in purchase order.
    pub cannons: Vec<Cannon>,
}

impl Base {
    /// Create a fresh base.
    #[must_use]
    pub fn new(side: Side, max_health: Fixed, gold: Fixed) -> Self {
        Self {
            side,
            health: max_health,
            max_health,
            gold,
            accumulated_gold: Fixed::ZERO,
            age: Age::First,
            upgrades: BTreeSet::new(),
            cannons: Vec::new(),
        }
    }

    /// Health clamped to `0..=max_health` for display.
    #[must_use]
    pub fn display_health(&self) -> Fixed {
        self.health.clamp(Fixed::ZERO, self.max_health)
    }

    /// Check whether the base has fallen.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.health <= Fixed::ZERO
    }

    /// Check whether an upgrade was bought.
    #[must_use]
    pub fn has_upgrade(&self, upgrade: &str) -> bool {
        self.upgrades.contains(upgrade)
    }
}

/// A cannon shot in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique identifier.
    pub id: ProjectileId,
    /// Side whose cannon fired it.
    pub side: Side,
    /// Current position.
    pub position: Vec2Fixed,
    /// Unit locked at launch; never re-targeted.
    pub target: UnitId,
    /// Target's last known position.
    pub aim_point: Vec2Fixed,
    /// Travel per update.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage applied on impact.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
}

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Match in progress.
    #[default]
    Playing,
    /// The opponent's base fell.
    Victory,
    /// The player's base fell.
    Defeat,
}

impl MatchPhase {
    /// Check whether the match has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Playing)
    }

    /// Terminal phase for the match when `fallen`'s base is destroyed.
    #[must_use]
    pub const fn for_fallen_base(fallen: Side) -> Self {
        match fallen {
            Side::Opponent => Self::Victory,
            Side::Player => Self::Defeat,
        }
    }
}

/// Counters for the current match. Only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchStats {
    /// Match clock in milliseconds.
    #[serde(with = "fixed_serde")]
    pub elapsed_time_ms: Fixed,
    /// Discrete updates run.
    pub ticks: u64,
    /// Gold the player earned (income plus kill rewards).
    #[serde(with = "fixed_serde")]
    pub gold_generated_by_player: Fixed,
    /// Opponent units killed by the player's units or cannons.
    pub enemies_killed_by_player: u32,
    /// Player units killed by the opponent.
    pub units_lost_by_player: u32,
    /// Units the player spawned.
    pub player_units_spawned: u32,
    /// Units the opponent spawned.
    pub opponent_units_spawned: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_health_clamps() {
        let mut base = Base::new(Side::Player, Fixed::from_num(100), Fixed::ZERO);
        base.health = Fixed::from_num(-5);
        assert_eq!(base.display_health(), Fixed::ZERO);
        assert!(base.is_destroyed());

        base.health = Fixed::from_num(80);
        base.max_health = Fixed::from_num(150);
        assert_eq!(base.display_health(), Fixed::from_num(80));
    }

    #[test]
    fn test_phase_for_fallen_base() {
        assert_eq!(MatchPhase::for_fallen_base(Side::Opponent), MatchPhase::Victory);
        assert_eq!(MatchPhase::for_fallen_base(Side::Player), MatchPhase::Defeat);
        assert!(!MatchPhase::Playing.is_terminal());
        assert!(MatchPhase::Defeat.is_terminal());
    }

    #[test]
    fn test_side_opposing() {
        assert_eq!(Side::Player.opposing(), Side::Opponent);
        assert_eq!(Side::Opponent.opposing(), Side::Player);
    }
}
