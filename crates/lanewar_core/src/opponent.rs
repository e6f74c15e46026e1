//! Automated opponent policy.
//!
//! [`OpponentBrain::decide`] is a pure decision over plain data plus a
//! seeded RNG: it returns what the opponent wants to do this update and the
//! session carries it out. Evolution takes priority over buying.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Age, Base, Side};
use crate::data::{Catalog, CostBucket, DifficultyData, PurchaseWeights};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::session::{GameSession, TickEvents};

/// What the opponent did on an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentAction {
    /// Paid to reach the second age.
    Evolve,
    /// Bought a unit.
    Buy {
        /// Archetype id.
        archetype: String,
        /// Bucket it was drawn from.
        bucket: CostBucket,
    },
}

/// Opponent decision state: the purchase cooldown and the bucket sampler.
#[derive(Debug, Clone)]
pub struct OpponentBrain {
    buy_cooldown_ms: Fixed,
    sampler: WeightedIndex<f64>,
}

impl OpponentBrain {
    /// Create a brain whose first purchase waits `initial_cooldown_ms`.
    pub fn new(weights: &PurchaseWeights, initial_cooldown_ms: Fixed) -> Result<Self> {
        let sampler = WeightedIndex::new(weights.as_array())
            .map_err(|e| GameError::InvalidCatalog(format!("purchase weights: {e}")))?;
        Ok(Self {
            buy_cooldown_ms: initial_cooldown_ms,
            sampler,
        })
    }

    /// Remaining purchase cooldown.
    #[must_use]
    pub fn buy_cooldown_ms(&self) -> Fixed {
        self.buy_cooldown_ms
    }

    /// Decide this update's action for `base`.
    ///
    /// `elapsed_ms` is the length of the update and drains the purchase
    /// cooldown. A successful buy decision resets the cooldown to the
    /// difficulty's delay. A drawn archetype the base cannot afford is
    /// dropped and the cooldown stays expired.
    pub fn decide<R: Rng>(
        &mut self,
        base: &Base,
        catalog: &Catalog,
        difficulty: &DifficultyData,
        elapsed_ms: Fixed,
        rng: &mut R,
    ) -> Option<OpponentAction> {
        if base.age == Age::First
            && base.accumulated_gold >= difficulty.ai_evolve_threshold
            && base.gold >= catalog.economy.evolution_cost
        {
            return Some(OpponentAction::Evolve);
        }

        self.buy_cooldown_ms = (self.buy_cooldown_ms - elapsed_ms).max(Fixed::ZERO);
        if self.buy_cooldown_ms > Fixed::ZERO {
            return None;
        }

        if !rng.gen_bool(difficulty.ai_buy_chance) {
            return None;
        }

        let bucket = CostBucket::ALL[self.sampler.sample(rng)];
        let unit = catalog.archetype_for(base.age, bucket)?;
        if base.gold < unit.cost {
            return None;
        }

        self.buy_cooldown_ms = difficulty.ai_buy_delay_ms;
        Some(OpponentAction::Buy {
            archetype: unit.id.clone(),
            bucket,
        })
    }
}

/// Run the opponent for one update and carry out its decision.
pub(crate) fn run(session: &mut GameSession, elapsed_ms: Fixed, events: &mut TickEvents) {
    let action = session.brain.decide(
        &session.opponent,
        &session.catalog,
        &session.difficulty,
        elapsed_ms,
        &mut session.rng,
    );

    let Some(action) = action else {
        return;
    };

    let outcome = match &action {
        OpponentAction::Evolve => session.try_evolve(Side::Opponent).map(|()| {
            tracing::debug!(tick = session.stats.ticks, "Opponent evolved");
        }),
        OpponentAction::Buy { archetype, bucket } => session
            .try_spawn_unit(archetype, Side::Opponent)
            .map(|id| {
                tracing::debug!(%archetype, %bucket, %id, "Opponent bought unit");
                events.spawned.push(id);
            }),
    };

    match outcome {
        Ok(()) => events.opponent_action = Some(action),
        Err(error) => tracing::warn!(%error, ?action, "Opponent decision could not be applied"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DifficultyId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup(chance: f64) -> (Catalog, DifficultyData, OpponentBrain, ChaCha8Rng) {
        let catalog = Catalog::builtin();
        let mut difficulty = catalog.difficulty(DifficultyId::Normal).unwrap().clone();
        difficulty.ai_buy_chance = chance;
        let brain = OpponentBrain::new(&catalog.opponent.purchase_weights, Fixed::ZERO).unwrap();
        (catalog, difficulty, brain, ChaCha8Rng::seed_from_u64(11))
    }

    fn opponent_base(gold: i32, accumulated: i32) -> Base {
        let mut base = Base::new(Side::Opponent, Fixed::from_num(100), Fixed::from_num(gold));
        base.accumulated_gold = Fixed::from_num(accumulated);
        base
    }

    #[test]
    fn test_evolve_preempts_buying() {
        let (catalog, difficulty, mut brain, mut rng) = setup(1.0);
        let base = opponent_base(150, 200);
        let action = brain.decide(&base, &catalog, &difficulty, Fixed::from_num(16), &mut rng);
        assert_eq!(action, Some(OpponentAction::Evolve));
    }

    #[test]
    fn test_no_evolve_below_threshold() {
        let (catalog, difficulty, mut brain, mut rng) = setup(0.0);
        let base = opponent_base(500, 199);
        assert_eq!(brain.decide(&base, &catalog, &difficulty, Fixed::ONE, &mut rng), None);
    }

    #[test]
    fn test_buy_resets_cooldown() {
        let (catalog, difficulty, mut brain, mut rng) = setup(1.0);
        let base = opponent_base(1000, 0);

        let action = brain.decide(&base, &catalog, &difficulty, Fixed::from_num(16), &mut rng);
        let Some(OpponentAction::Buy { archetype, bucket }) = action else {
            panic!("expected a purchase, got {action:?}");
        };
        let unit = catalog.unit(&archetype).unwrap();
        assert_eq!(unit.age, Age::First);
        assert_eq!(unit.bucket, bucket);
        assert_eq!(brain.buy_cooldown_ms(), difficulty.ai_buy_delay_ms);

        // Still cooling down.
        let next = brain.decide(&base, &catalog, &difficulty, Fixed::from_num(16), &mut rng);
        assert_eq!(next, None);
    }

    #[test]
    fn test_unaffordable_draw_is_discarded() {
        let (catalog, difficulty, mut brain, mut rng) = setup(1.0);
        let broke = opponent_base(0, 0);
        for _ in 0..20 {
            let action = brain.decide(&broke, &catalog, &difficulty, Fixed::from_num(16), &mut rng);
            assert_eq!(action, None);
        }
        assert_eq!(brain.buy_cooldown_ms(), Fixed::ZERO);
    }

    #[test]
    fn test_second_age_buys_second_age_units() {
        let (catalog, difficulty, mut brain, mut rng) = setup(1.0);
        let mut base = opponent_base(1000, 0);
        base.age = Age::Second;
        let Some(OpponentAction::Buy { archetype, .. }) =
            brain.decide(&base, &catalog, &difficulty, Fixed::ONE, &mut rng)
        else {
            panic!("expected a purchase");
        };
        assert_eq!(catalog.unit(&archetype).unwrap().age, Age::Second);
    }

    #[test]
    fn test_bucket_weights_roughly_hold() {
        let (catalog, difficulty, _, mut rng) = setup(1.0);
        let base = opponent_base(10_000, 0);
        let mut counts = [0u32; 3];
        for _ in 0..3000 {
            let mut brain =
                OpponentBrain::new(&catalog.opponent.purchase_weights, Fixed::ZERO).unwrap();
            if let Some(OpponentAction::Buy { bucket, .. }) =
                brain.decide(&base, &catalog, &difficulty, Fixed::ONE, &mut rng)
            {
                counts[bucket as usize] += 1;
            }
        }
        // 50/30/20 split with generous slack.
        assert!(counts[0] > 1300 && counts[0] < 1700, "{counts:?}");
        assert!(counts[1] > 750 && counts[1] < 1050, "{counts:?}");
        assert!(counts[2] > 450 && counts[2] < 750, "{counts:?}");
    }

    #[test]
    fn test_zero_weights_rejected() {
        let weights = PurchaseWeights {
            low: 0.0,
            mid: 0.0,
            high: 0.0,
        };
        assert!(OpponentBrain::new(&weights, Fixed::ZERO).is_err());
    }
}
