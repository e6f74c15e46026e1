//! Difficulty profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Difficulty identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyId {
    /// Slow opponent economy, late evolution.
    Easy,
    /// Default.
    Normal,
    /// Fast opponent economy, early evolution, tougher units.
    Hard,
}

impl DifficultyId {
    /// All difficulties, easiest first.
    pub const ALL: [Self; 3] = [Self::Easy, Self::Normal, Self::Hard];

    /// Lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for DifficultyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown difficulty '{s}' (expected easy, normal or hard)"))
    }
}

/// Tuning row for one difficulty. Selected once per match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyData {
    /// Which difficulty this row configures.
    pub id: DifficultyId,

    /// Display name.
    pub name: String,

    /// Multiplier on the base gold rate for the automated side.
    #[serde(with = "fixed_serde")]
    pub gold_rate_multiplier: Fixed,

    /// Cooldown the opponent waits after each purchase, in milliseconds.
    #[serde(with = "fixed_serde")]
    pub ai_buy_delay_ms: Fixed,

    /// Lifetime gold the opponent needs before it evolves.
    #[serde(with = "fixed_serde")]
    pub ai_evolve_threshold: Fixed,

    /// Multiplier on the health of units the opponent spawns.
    #[serde(with = "fixed_serde")]
    pub enemy_hp_multiplier: Fixed,

    /// Probability per update that an off-cooldown opponent tries to buy.
    pub ai_buy_chance: f64,
}
