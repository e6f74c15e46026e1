//! The full game catalog: archetypes plus arena, economy and opponent tuning.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CostBucket, DifficultyData, DifficultyId, UnitData, UpgradeData, UpgradeEffect};
use crate::components::{Age, BehaviorClass, Side};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Arena geometry in screen units. The lane runs along x; y grows downward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Arena width.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Arena height.
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
    /// Height of the lane units walk on.
    #[serde(with = "fixed_serde")]
    pub ground_y: Fixed,
    /// Where player units appear.
    #[serde(with = "fixed_serde")]
    pub player_spawn_x: Fixed,
    /// Where opponent units appear.
    #[serde(with = "fixed_serde")]
    pub opponent_spawn_x: Fixed,
    /// Front edge of the player's base (facing the lane).
    #[serde(with = "fixed_serde")]
    pub player_base_front_x: Fixed,
    /// Front edge of the opponent's base (facing the lane).
    #[serde(with = "fixed_serde")]
    pub opponent_base_front_x: Fixed,
    /// Horizontal position of the player's cannon emplacement.
    #[serde(with = "fixed_serde")]
    pub player_cannon_x: Fixed,
    /// Horizontal position of the opponent's cannon emplacement.
    #[serde(with = "fixed_serde")]
    pub opponent_cannon_x: Fixed,
    /// Height of both cannon emplacements.
    #[serde(with = "fixed_serde")]
    pub cannon_y: Fixed,
    /// A projectile closer than this to its target hits.
    #[serde(with = "fixed_serde")]
    pub projectile_hit_radius: Fixed,
}

impl ArenaConfig {
    /// Lane position where `side` spawns units.
    #[must_use]
    pub fn spawn_x(&self, side: Side) -> Fixed {
        match side {
            Side::Player => self.player_spawn_x,
            Side::Opponent => self.opponent_spawn_x,
        }
    }

    /// Front edge of `side`'s base.
    #[must_use]
    pub fn base_front_x(&self, side: Side) -> Fixed {
        match side {
            Side::Player => self.player_base_front_x,
            Side::Opponent => self.opponent_base_front_x,
        }
    }

    /// Where `side`'s cannons fire from.
    #[must_use]
    pub fn cannon_position(&self, side: Side) -> Vec2Fixed {
        let x = match side {
            Side::Player => self.player_cannon_x,
            Side::Opponent => self.opponent_cannon_x,
        };
        Vec2Fixed::new(x, self.cannon_y)
    }

    /// 2D point of a unit standing at lane position `x`.
    #[must_use]
    pub fn ground_point(&self, x: Fixed) -> Vec2Fixed {
        Vec2Fixed::new(x, self.ground_y)
    }
}

/// Starting resources and shared prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Gold each side starts with.
    #[serde(with = "fixed_serde")]
    pub starting_gold: Fixed,
    /// Starting base health and cap.
    #[serde(with = "fixed_serde")]
    pub base_max_health: Fixed,
    /// Player income per second; the opponent's is scaled by difficulty.
    #[serde(with = "fixed_serde")]
    pub gold_rate_per_second: Fixed,
    /// Price of evolving to the second age.
    #[serde(with = "fixed_serde")]
    pub evolution_cost: Fixed,
}

/// Relative weights of the opponent's purchase buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PurchaseWeights {
    /// Weight of the cheapest archetype.
    pub low: f64,
    /// Weight of the middle archetype.
    pub mid: f64,
    /// Weight of the most expensive archetype.
    pub high: f64,
}

impl PurchaseWeights {
    /// Weights in [`CostBucket::ALL`] order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.low, self.mid, self.high]
    }
}

/// Automated opponent tunables shared by every difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentConfig {
    /// Bucket weights for unit purchases.
    pub purchase_weights: PurchaseWeights,
    /// Whether kill rewards count toward the evolution threshold.
    #[serde(default = "default_kills_count")]
    pub kills_count_toward_evolution: bool,
}

const fn default_kills_count() -> bool {
    true
}

/// All static game data, loaded once and shared read-only by every match.
///
/// # Example
///
/// ```
/// use lanewar_core::data::{Catalog, DifficultyId};
///
/// let catalog = Catalog::builtin();
/// assert!(catalog.validate().is_ok());
/// assert_eq!(catalog.unit("warrior").unwrap().cost.to_num::<i32>(), 15);
/// assert!(catalog.difficulty(DifficultyId::Hard).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Arena geometry.
    pub arena: ArenaConfig,
    /// Starting resources and prices.
    pub economy: EconomyConfig,
    /// Automated opponent tunables.
    pub opponent: OpponentConfig,
    /// Unit archetypes.
    pub units: Vec<UnitData>,
    /// Base upgrades.
    pub upgrades: Vec<UpgradeData>,
    /// Difficulty rows.
    pub difficulties: Vec<DifficultyData>,
}

impl Catalog {
    /// Parse and validate a catalog from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let catalog: Self = ron::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read, parse and validate a catalog file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GameError::CatalogRead {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_ron_str(&text)?;
        tracing::info!(
            path = %path.display(),
            units = catalog.units.len(),
            upgrades = catalog.upgrades.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Pretty-printed RON for this catalog.
    pub fn to_ron_string(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::new().struct_names(true);
        ron::ser::to_string_pretty(self, config)
            .map_err(|e| GameError::InvalidCatalog(format!("cannot serialize catalog: {e}")))
    }

    /// Look up a unit archetype.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&UnitData> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Look up an upgrade.
    #[must_use]
    pub fn upgrade(&self, id: &str) -> Option<&UpgradeData> {
        self.upgrades.iter().find(|u| u.id == id)
    }

    /// Look up a difficulty row.
    pub fn difficulty(&self, id: DifficultyId) -> Result<&DifficultyData> {
        self.difficulties
            .iter()
            .find(|d| d.id == id)
            .ok_or(GameError::UnknownDifficulty(id))
    }

    /// The archetype sold in `bucket` during `age`.
    #[must_use]
    pub fn archetype_for(&self, age: Age, bucket: CostBucket) -> Option<&UnitData> {
        self.units
            .iter()
            .find(|u| u.age == age && u.bucket == bucket)
    }

    /// Archetypes spawnable in `age`, cheapest bucket first.
    #[must_use]
    pub fn units_for_age(&self, age: Age) -> Vec<&UnitData> {
        CostBucket::ALL
            .iter()
            .filter_map(|&bucket| self.archetype_for(age, bucket))
            .collect()
    }

    /// Check internal consistency.
    ///
    /// Every age must sell exactly one archetype per bucket, all stats must
    /// be in range, every difficulty must be present, and upgrade
    /// prerequisites must name existing upgrades.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GameError::InvalidCatalog(msg));

        let mut ids = BTreeSet::new();
        for unit in &self.units {
            if !ids.insert(unit.id.as_str()) {
                return invalid(format!("duplicate unit id '{}'", unit.id));
            }
            if unit.health <= Fixed::ZERO {
                return invalid(format!("unit '{}' must have positive health", unit.id));
            }
            if unit.range <= Fixed::ZERO {
                return invalid(format!("unit '{}' must have positive range", unit.id));
            }
            if unit.cost <= Fixed::ZERO {
                return invalid(format!("unit '{}' must have a positive cost", unit.id));
            }
            let negatives = [
                unit.damage,
                unit.speed,
                unit.attack_cooldown_ms,
                unit.reward,
            ];
            if negatives.iter().any(|v| *v < Fixed::ZERO) {
                return invalid(format!("unit '{}' has a negative stat", unit.id));
            }
        }

        for age in [Age::First, Age::Second] {
            for bucket in CostBucket::ALL {
                let count = self
                    .units
                    .iter()
                    .filter(|u| u.age == age && u.bucket == bucket)
                    .count();
                if count != 1 {
                    return invalid(format!(
                        "age {age} must have exactly one {bucket} archetype, found {count}"
                    ));
                }
            }
        }

        let mut upgrade_ids = BTreeSet::new();
        for upgrade in &self.upgrades {
            if !upgrade_ids.insert(upgrade.id.as_str()) {
                return invalid(format!("duplicate upgrade id '{}'", upgrade.id));
            }
            if upgrade.cost < Fixed::ZERO {
                return invalid(format!("upgrade '{}' has a negative cost", upgrade.id));
            }
            match &upgrade.effect {
                UpgradeEffect::Wall { hp_bonus } if *hp_bonus < Fixed::ZERO => {
                    return invalid(format!("upgrade '{}' lowers max health", upgrade.id));
                }
                UpgradeEffect::Cannon {
                    range,
                    projectile_speed,
                    cooldown_ms,
                    ..
                } if *range <= Fixed::ZERO
                    || *projectile_speed <= Fixed::ZERO
                    || *cooldown_ms < Fixed::ZERO =>
                {
                    return invalid(format!("cannon '{}' has invalid stats", upgrade.id));
                }
                _ => {}
            }
        }
        for upgrade in &self.upgrades {
            if let Some(required) = &upgrade.requires {
                if !upgrade_ids.contains(required.as_str()) || *required == upgrade.id {
                    return invalid(format!(
                        "upgrade '{}' requires unknown upgrade '{required}'",
                        upgrade.id
                    ));
                }
            }
        }

        for id in DifficultyId::ALL {
            let rows = self.difficulties.iter().filter(|d| d.id == id).count();
            if rows != 1 {
                return invalid(format!("difficulty '{id}' must appear once, found {rows}"));
            }
        }
        for row in &self.difficulties {
            if !(0.0..=1.0).contains(&row.ai_buy_chance) {
                return invalid(format!("difficulty '{}' buy chance outside 0..=1", row.id));
            }
            if row.gold_rate_multiplier < Fixed::ZERO
                || row.enemy_hp_multiplier <= Fixed::ZERO
                || row.ai_buy_delay_ms < Fixed::ZERO
            {
                return invalid(format!("difficulty '{}' has invalid multipliers", row.id));
            }
        }

        let weights = self.opponent.purchase_weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0
        {
            return invalid("purchase weights must be non-negative with a positive sum".into());
        }

        let arena = &self.arena;
        if arena.player_base_front_x >= arena.opponent_base_front_x {
            return invalid("player base must sit left of the opponent base".into());
        }
        if arena.projectile_hit_radius < Fixed::ZERO {
            return invalid("projectile hit radius must not be negative".into());
        }
        if self.economy.base_max_health <= Fixed::ZERO || self.economy.starting_gold < Fixed::ZERO {
            return invalid("bases need positive health and non-negative gold".into());
        }

        Ok(())
    }

    /// The shipped catalog.
    ///
    /// Mirrors `data/catalog.ron`.
    #[must_use]
    pub fn builtin() -> Self {
        let f = |v: f64| Fixed::from_num(v);

        let unit = |id: &str,
                    name: &str,
                    age: Age,
                    bucket: CostBucket,
                    behavior: BehaviorClass,
                    stats: [f64; 7]| {
            let [cost, health, damage, range, speed, attack_cooldown_ms, reward] = stats;
            UnitData {
                id: id.to_string(),
                name: name.to_string(),
                age,
                bucket,
                behavior,
                cost: f(cost),
                health: f(health),
                damage: f(damage),
                range: f(range),
                speed: f(speed),
                attack_cooldown_ms: f(attack_cooldown_ms),
                reward: f(reward),
            }
        };

        use BehaviorClass::{Melee, Ranged};
        use CostBucket::{High, Low, Mid};

        // [cost, health, damage, range, speed, cooldown_ms, reward]
        let units = vec![
            unit("warrior", "Warrior", Age::First, Low, Melee, [15.0, 30.0, 5.0, 30.0, 1.5, 1000.0, 10.0]),
            unit("archer", "Archer", Age::First, Mid, Ranged, [20.0, 20.0, 4.0, 150.0, 2.0, 1200.0, 15.0]),
            unit("knight", "Knight", Age::First, High, Melee, [40.0, 50.0, 8.0, 30.0, 2.0, 1000.0, 25.0]),
            unit("heavy_swordsman", "Heavy Swordsman", Age::Second, Low, Melee, [40.0, 60.0, 10.0, 30.0, 1.5, 1000.0, 40.0]),
            unit("crossbowman", "Crossbowman", Age::Second, Mid, Ranged, [50.0, 40.0, 8.0, 180.0, 1.5, 1500.0, 50.0]),
            unit("dragon_knight", "Dragon Knight", Age::Second, High, Melee, [80.0, 100.0, 15.0, 35.0, 2.0, 1000.0, 80.0]),
        ];

        let upgrades = vec![
            UpgradeData {
                id: "wall".to_string(),
                name: "Reinforced Wall".to_string(),
                cost: f(150.0),
                requires: None,
                effect: UpgradeEffect::Wall { hp_bonus: f(50.0) },
            },
            UpgradeData {
                id: "cannon".to_string(),
                name: "Defensive Cannon".to_string(),
                cost: f(200.0),
                requires: None,
                effect: UpgradeEffect::Cannon {
                    damage: f(15.0),
                    range: f(250.0),
                    cooldown_ms: f(3000.0),
                    projectile_speed: f(8.0),
                },
            },
            UpgradeData {
                id: "heavy_cannon".to_string(),
                name: "Heavy Cannon".to_string(),
                cost: f(350.0),
                requires: Some("cannon".to_string()),
                effect: UpgradeEffect::Cannon {
                    damage: f(25.0),
                    range: f(320.0),
                    cooldown_ms: f(2500.0),
                    projectile_speed: f(10.0),
                },
            },
        ];

        let difficulty = |id: DifficultyId, name: &str, stats: [f64; 4], ai_buy_chance: f64| {
            let [gold_rate, buy_delay, evolve_threshold, hp_multiplier] = stats;
            DifficultyData {
                id,
                name: name.to_string(),
                gold_rate_multiplier: f(gold_rate),
                ai_buy_delay_ms: f(buy_delay),
                ai_evolve_threshold: f(evolve_threshold),
                enemy_hp_multiplier: f(hp_multiplier),
                ai_buy_chance,
            }
        };

        // [gold_rate_multiplier, buy_delay_ms, evolve_threshold, hp_multiplier]
        let difficulties = vec![
            difficulty(DifficultyId::Easy, "Easy", [0.5, 3000.0, 250.0, 1.0], 0.008),
            difficulty(DifficultyId::Normal, "Normal", [0.8, 2000.0, 200.0, 1.0], 0.01),
            difficulty(DifficultyId::Hard, "Hard", [1.2, 500.0, 150.0, 1.2], 0.02),
        ];

        Self {
            arena: ArenaConfig {
                width: f(1200.0),
                height: f(400.0),
                ground_y: f(350.0),
                player_spawn_x: f(100.0),
                opponent_spawn_x: f(1100.0),
                player_base_front_x: f(130.0),
                opponent_base_front_x: f(1070.0),
                player_cannon_x: f(90.0),
                opponent_cannon_x: f(1110.0),
                cannon_y: f(190.0),
                projectile_hit_radius: f(10.0),
            },
            economy: EconomyConfig {
                starting_gold: f(100.0),
                base_max_health: f(100.0),
                gold_rate_per_second: f(1.0),
                evolution_cost: f(150.0),
            },
            opponent: OpponentConfig {
                purchase_weights: PurchaseWeights {
                    low: 0.5,
                    mid: 0.3,
                    high: 0.2,
                },
                kills_count_toward_evolution: true,
            },
            units,
            upgrades,
            difficulties,
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
