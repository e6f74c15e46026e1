//! Gold income, kill rewards and purchases.
//!
//! Everything here works on a single [`Base`]; the session decides which
//! side is paying or earning.

use crate::components::{Age, Base, Cannon, MatchStats};
use crate::data::{DifficultyData, EconomyConfig, UpgradeData, UpgradeEffect};
use crate::error::CommandError;
use crate::math::Fixed;
use crate::simulation::TICK_RATE;

/// Per-second gold income of both sides for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeRates {
    /// Player income per second.
    pub player: Fixed,
    /// Opponent income per second.
    pub opponent: Fixed,
}

impl IncomeRates {
    /// Player gets the base rate; the opponent's is scaled by difficulty.
    #[must_use]
    pub fn new(economy: &EconomyConfig, difficulty: &DifficultyData) -> Self {
        Self {
            player: economy.gold_rate_per_second,
            opponent: economy.gold_rate_per_second * difficulty.gold_rate_multiplier,
        }
    }

    /// Gold earned per discrete update at `rate_per_second`.
    #[must_use]
    pub fn per_tick(rate_per_second: Fixed) -> Fixed {
        rate_per_second / Fixed::from_num(TICK_RATE)
    }
}

/// Add one update's income to both bases.
pub fn accrue(player: &mut Base, opponent: &mut Base, rates: IncomeRates, stats: &mut MatchStats) {
    let player_income = IncomeRates::per_tick(rates.player);
    player.gold += player_income;
    stats.gold_generated_by_player += player_income;

    let opponent_income = IncomeRates::per_tick(rates.opponent);
    opponent.gold += opponent_income;
    opponent.accumulated_gold += opponent_income;
}

/// Pay a kill reward to `base`.
///
/// `track_lifetime` also advances `accumulated_gold`, which is only done for
/// the automated side.
pub fn credit_kill(base: &mut Base, reward: Fixed, track_lifetime: bool) {
    base.gold += reward;
    if track_lifetime {
        base.accumulated_gold += reward;
    }
}

fn insufficient(required: Fixed, available: Fixed) -> CommandError {
    CommandError::InsufficientGold {
        required: required.to_num::<i64>(),
        available: available.to_num::<i64>(),
    }
}

/// Check that `base` can pay `cost`.
pub fn check_affordable(base: &Base, cost: Fixed) -> Result<(), CommandError> {
    if base.gold >= cost {
        Ok(())
    } else {
        Err(insufficient(cost, base.gold))
    }
}

/// Check whether `base` may evolve.
pub fn check_evolve(base: &Base, cost: Fixed) -> Result<(), CommandError> {
    if base.age != Age::First {
        return Err(CommandError::AlreadyEvolved(base.side));
    }
    check_affordable(base, cost)
}

/// Pay for and apply evolution.
pub fn evolve(base: &mut Base, cost: Fixed) -> Result<(), CommandError> {
    check_evolve(base, cost)?;
    base.gold -= cost;
    base.age = Age::Second;
    tracing::debug!(side = %base.side, "Base evolved");
    Ok(())
}

/// Check whether `base` may buy `upgrade`.
pub fn check_upgrade(base: &Base, upgrade: &UpgradeData) -> Result<(), CommandError> {
    if base.has_upgrade(&upgrade.id) {
        return Err(CommandError::AlreadyPurchased(upgrade.id.clone()));
    }
    if let Some(required) = &upgrade.requires {
        if !base.has_upgrade(required) {
            return Err(CommandError::MissingPrerequisite {
                upgrade: upgrade.id.clone(),
                requires: required.clone(),
            });
        }
    }
    check_affordable(base, upgrade.cost)
}

/// Pay for `upgrade` and apply its effect.
///
/// Walls raise `max_health` only; current health is untouched. Cannons
/// install a new emplacement that fires independently of earlier ones.
pub fn buy_upgrade(base: &mut Base, upgrade: &UpgradeData) -> Result<(), CommandError> {
    check_upgrade(base, upgrade)?;
    base.gold -= upgrade.cost;
    base.upgrades.insert(upgrade.id.clone());

    match &upgrade.effect {
        UpgradeEffect::Wall { hp_bonus } => {
            base.max_health += *hp_bonus;
        }
        UpgradeEffect::Cannon {
            damage,
            range,
            cooldown_ms,
            projectile_speed,
        } => base.cannons.push(Cannon {
            upgrade: upgrade.id.clone(),
            damage: *damage,
            range: *range,
            cooldown_ms: *cooldown_ms,
            projectile_speed: *projectile_speed,
            last_fired_ms: None,
        }),
    }

    tracing::debug!(side = %base.side, upgrade = %upgrade.id, "Upgrade purchased");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Side;
    use crate::data::{Catalog, DifficultyId};

    fn base(gold: i32) -> Base {
        Base::new(Side::Player, Fixed::from_num(100), Fixed::from_num(gold))
    }

    #[test]
    fn test_accrual_per_tick() {
        let catalog = Catalog::builtin();
        let normal = catalog.difficulty(DifficultyId::Normal).unwrap();
        let rates = IncomeRates::new(&catalog.economy, normal);

        let mut player = base(0);
        let mut opponent = Base::new(Side::Opponent, Fixed::from_num(100), Fixed::ZERO);
        let mut stats = MatchStats::default();
        for _ in 0..TICK_RATE {
            accrue(&mut player, &mut opponent, rates, &mut stats);
        }

        let epsilon = Fixed::from_num(0.0001);
        assert!((player.gold - Fixed::ONE).abs() < epsilon);
        assert!((opponent.gold - Fixed::from_num(0.8)).abs() < epsilon);
        assert_eq!(opponent.gold, opponent.accumulated_gold);
        assert_eq!(player.accumulated_gold, Fixed::ZERO);
        assert_eq!(stats.gold_generated_by_player, player.gold);
    }

    #[test]
    fn test_evolve_once() {
        let mut b = base(300);
        let cost = Fixed::from_num(150);
        evolve(&mut b, cost).unwrap();
        assert_eq!(b.age, Age::Second);
        assert_eq!(b.gold, Fixed::from_num(150));

        assert_eq!(evolve(&mut b, cost), Err(CommandError::AlreadyEvolved(Side::Player)));
        assert_eq!(b.gold, Fixed::from_num(150));
    }

    #[test]
    fn test_evolve_unaffordable() {
        let mut b = base(149);
        let err = evolve(&mut b, Fixed::from_num(150)).unwrap_err();
        assert_eq!(
            err,
            CommandError::InsufficientGold {
                required: 150,
                available: 149
            }
        );
        assert_eq!(b.age, Age::First);
    }

    #[test]
    fn test_wall_raises_max_only() {
        let catalog = Catalog::builtin();
        let mut b = base(200);
        b.health = Fixed::from_num(80);

        buy_upgrade(&mut b, catalog.upgrade("wall").unwrap()).unwrap();
        assert_eq!(b.health, Fixed::from_num(80));
        assert_eq!(b.max_health, Fixed::from_num(150));
        assert_eq!(b.gold, Fixed::from_num(50));

        let again = buy_upgrade(&mut b, catalog.upgrade("wall").unwrap());
        assert_eq!(again, Err(CommandError::AlreadyPurchased("wall".into())));
    }

    #[test]
    fn test_heavy_cannon_needs_cannon() {
        let catalog = Catalog::builtin();
        let mut b = base(1000);
        let heavy = catalog.upgrade("heavy_cannon").unwrap();

        assert!(matches!(
            buy_upgrade(&mut b, heavy),
            Err(CommandError::MissingPrerequisite { .. })
        ));
        buy_upgrade(&mut b, catalog.upgrade("cannon").unwrap()).unwrap();
        buy_upgrade(&mut b, heavy).unwrap();

        assert_eq!(b.cannons.len(), 2);
        assert_eq!(b.cannons[1].upgrade, "heavy_cannon");
        assert_eq!(b.gold, Fixed::from_num(450));
    }

    #[test]
    fn test_credit_kill_lifetime_flag() {
        let mut b = base(0);
        credit_kill(&mut b, Fixed::from_num(25), false);
        assert_eq!(b.gold, Fixed::from_num(25));
        assert_eq!(b.accumulated_gold, Fixed::ZERO);

        credit_kill(&mut b, Fixed::from_num(10), true);
        assert_eq!(b.accumulated_gold, Fixed::from_num(10));
    }
}
