//! Discrete commands fed to the simulation by presentation or tooling.

use serde::{Deserialize, Serialize};

use crate::components::Side;
use crate::data::DifficultyId;

/// A command applied atomically between updates.
///
/// Commands that fail validation are no-ops when applied through
/// [`Simulation::apply`](crate::simulation::Simulation::apply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Buy and spawn a unit for a side.
    SpawnUnit {
        /// Archetype id.
        archetype: String,
        /// Spawning side.
        side: Side,
    },
    /// Buy an upgrade for the player.
    BuyUpgrade {
        /// Upgrade id.
        upgrade: String,
    },
    /// Buy an upgrade for an explicit side.
    BuyUpgradeFor {
        /// Buying side.
        side: Side,
        /// Upgrade id.
        upgrade: String,
    },
    /// Evolve a side to the second age.
    Evolve {
        /// Evolving side.
        side: Side,
    },
    /// Discard the current match and start one at this difficulty.
    StartMatch {
        /// Difficulty of the new match.
        difficulty: DifficultyId,
    },
    /// Discard the current match and restart it with the same settings.
    ResetMatch,
}

impl Command {
    /// Player spawn shorthand.
    #[must_use]
    pub fn spawn(archetype: impl Into<String>) -> Self {
        Self::SpawnUnit {
            archetype: archetype.into(),
            side: Side::Player,
        }
    }

    /// Player upgrade shorthand.
    #[must_use]
    pub fn upgrade(upgrade: impl Into<String>) -> Self {
        Self::BuyUpgrade {
            upgrade: upgrade.into(),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SpawnUnit { .. } => "spawn_unit",
            Self::BuyUpgrade { .. } | Self::BuyUpgradeFor { .. } => "buy_upgrade",
            Self::Evolve { .. } => "evolve",
            Self::StartMatch { .. } => "start_match",
            Self::ResetMatch => "reset_match",
        }
    }
}
