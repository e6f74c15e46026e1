//! Unit archetype definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::{Age, BehaviorClass};
use crate::math::{fixed_serde, Fixed};

/// Price bracket of an archetype within its age.
///
/// The automated opponent samples a bucket first and then looks up the
/// archetype for its current age, so every age offers one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CostBucket {
    /// Cheapest archetype of the age.
    Low,
    /// Middle archetype of the age.
    Mid,
    /// Most expensive archetype of the age.
    High,
}

impl CostBucket {
    /// All buckets, cheapest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Mid, Self::High];
}

impl fmt::Display for CostBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Mid => f.write_str("mid"),
            Self::High => f.write_str("high"),
        }
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "warrior",
///     name: "Warrior",
///     age: First,
///     bucket: Low,
///     behavior: Melee,
///     cost: 15.0,
///     health: 30.0,
///     damage: 5.0,
///     range: 30.0,
///     speed: 1.5,
///     attack_cooldown_ms: 1000.0,
///     reward: 10.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier used by spawn commands.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Age in which the archetype can be spawned.
    pub age: Age,

    /// Price bracket within the age.
    pub bucket: CostBucket,

    /// Combat style (cosmetic).
    pub behavior: BehaviorClass,

    /// Gold cost to spawn.
    #[serde(with = "fixed_serde")]
    pub cost: Fixed,

    /// Health at spawn, before difficulty scaling.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,

    /// Damage per attack.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,

    /// Engagement range in lane units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,

    /// Distance moved per update.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,

    /// Milliseconds between attacks.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown_ms: Fixed,

    /// Gold paid to whoever kills it.
    #[serde(with = "fixed_serde")]
    pub reward: Fixed,
}

impl UnitData {
    /// Check if this archetype can be spawned by a side in `age`.
    #[must_use]
    pub fn available_in(&self, age: Age) -> bool {
        self.age == age
    }
}
