//! Base upgrade definitions.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// What buying an upgrade does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeEffect {
    /// Raise the base's maximum health. Current health is left alone.
    Wall {
        /// Added to `max_health`.
        #[serde(with = "fixed_serde")]
        hp_bonus: Fixed,
    },
    /// Install an independent cannon emplacement.
    Cannon {
        /// Damage per projectile.
        #[serde(with = "fixed_serde")]
        damage: Fixed,
        /// Lane distance from the emplacement within which it fires.
        #[serde(with = "fixed_serde")]
        range: Fixed,
        /// Milliseconds between shots.
        #[serde(with = "fixed_serde")]
        cooldown_ms: Fixed,
        /// Projectile travel per update.
        #[serde(with = "fixed_serde")]
        projectile_speed: Fixed,
    },
}

/// Data-driven upgrade definition. Each upgrade can be bought once per side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeData {
    /// Unique string identifier used by purchase commands.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Gold cost.
    #[serde(with = "fixed_serde")]
    pub cost: Fixed,

    /// Upgrade that has to be owned first, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,

    /// Effect applied on purchase.
    pub effect: UpgradeEffect,
}
