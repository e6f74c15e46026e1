//! Authoritative match state and the discrete update.
//!
//! A [`GameSession`] owns both bases, the unit roster, projectiles, stats
//! and the opponent's RNG. [`GameSession::step`] is the only thing that
//! advances time; commands go through the `try_*` methods between updates.
//!
//! # Update order
//!
//! 1. **Accrual** - income for both bases
//! 2. **Opponent** - evolve or buy
//! 3. **Projectiles** - cannon fire, then flight and impact
//! 4. **Units** - target acquisition, attacks and movement in id order
//! 5. **Pruning** - commit the damage ledger and drop the dead
//! 6. **Terminal check**

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::components::{
    Base, MatchPhase, MatchStats, Projectile, ProjectileId, Side, Unit, UnitId, UnitState,
};
use crate::data::{Catalog, DifficultyData, DifficultyId, UnitData};
use crate::economy::{self, IncomeRates};
use crate::error::{CommandError, Result};
use crate::math::Fixed;
use crate::opponent::{OpponentAction, OpponentBrain};
use crate::roster::UnitRoster;
use crate::snapshot::GameSnapshot;
use crate::{combat, opponent, projectiles};

/// What dealt a killing blow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSource {
    /// A unit's attack.
    Unit,
    /// A cannon projectile.
    Cannon,
}

/// A unit killed during an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    /// The unit that died.
    pub victim: UnitId,
    /// Side the victim belonged to.
    pub victim_side: Side,
    /// Victim's archetype.
    pub archetype: String,
    /// Gold paid to the killer's side.
    #[serde(with = "crate::math::fixed_serde")]
    pub reward: Fixed,
    /// Unit or cannon.
    pub source: KillSource,
}

/// Damage dealt to a base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseHit {
    /// Side whose base was hit.
    pub side: Side,
    /// Attacking unit.
    pub attacker: UnitId,
    /// Damage dealt.
    #[serde(with = "crate::math::fixed_serde")]
    pub damage: Fixed,
}

/// Events generated during one update.
///
/// Presentation layers use these for effects and sounds; the headless
/// runner aggregates them into metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Update number this batch belongs to (0 if no update ran).
    pub tick: u64,
    /// Units spawned by the opponent during the update.
    pub spawned: Vec<UnitId>,
    /// Units killed, in the order the killing blows landed.
    pub kills: Vec<KillEvent>,
    /// Units removed when the damage ledger was committed.
    pub removed: Vec<UnitId>,
    /// Projectiles launched.
    pub projectiles_fired: Vec<ProjectileId>,
    /// Projectiles that hit their target.
    pub projectile_hits: Vec<ProjectileId>,
    /// Projectiles dropped because their target was gone. Orphans are
    /// noticed on the update after their target dies.
    pub projectiles_expired: Vec<ProjectileId>,
    /// Damage dealt to bases.
    pub base_hits: Vec<BaseHit>,
    /// What the opponent did, if anything.
    pub opponent_action: Option<OpponentAction>,
    /// Set on the update that ended the match.
    pub phase_change: Option<MatchPhase>,
}

/// The authoritative state of one match.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) difficulty: DifficultyData,
    rates: IncomeRates,
    pub(crate) player: Base,
    pub(crate) opponent: Base,
    pub(crate) roster: UnitRoster,
    pub(crate) projectiles: Vec<Projectile>,
    next_projectile_id: u32,
    pub(crate) stats: MatchStats,
    pub(crate) phase: MatchPhase,
    pub(crate) brain: OpponentBrain,
    pub(crate) rng: ChaCha8Rng,
    seed: u64,
}

impl GameSession {
    /// Start a fresh match.
    ///
    /// # Errors
    ///
    /// Fails if the catalog is inconsistent or lacks `difficulty`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use lanewar_core::prelude::*;
    ///
    /// let session = GameSession::new(Arc::new(Catalog::builtin()), DifficultyId::Normal, 42)?;
    /// assert_eq!(session.phase(), MatchPhase::Playing);
    /// assert_eq!(session.base(Side::Player).gold.to_num::<i32>(), 100);
    /// # Ok::<(), GameError>(())
    /// ```
    pub fn new(catalog: Arc<Catalog>, difficulty: DifficultyId, seed: u64) -> Result<Self> {
        catalog.validate()?;
        let difficulty = catalog.difficulty(difficulty)?.clone();
        let economy = &catalog.economy;
        let brain = OpponentBrain::new(
            &catalog.opponent.purchase_weights,
            difficulty.ai_buy_delay_ms,
        )?;

        tracing::info!(difficulty = %difficulty.id, seed, "Match started");

        Ok(Self {
            rates: IncomeRates::new(economy, &difficulty),
            player: Base::new(Side::Player, economy.base_max_health, economy.starting_gold),
            opponent: Base::new(Side::Opponent, economy.base_max_health, economy.starting_gold),
            roster: UnitRoster::new(),
            projectiles: Vec::new(),
            next_projectile_id: 1,
            stats: MatchStats::default(),
            phase: MatchPhase::Playing,
            brain,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            difficulty,
            catalog,
        })
    }

    /// Shared catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Difficulty row in effect.
    #[must_use]
    pub fn difficulty(&self) -> &DifficultyData {
        &self.difficulty
    }

    /// Seed of the opponent's RNG.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Match statistics.
    #[must_use]
    pub const fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Updates run so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.stats.ticks
    }

    /// One side's base.
    #[must_use]
    pub fn base(&self, side: Side) -> &Base {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    /// Mutable access to a base, for scenario setup and tooling.
    pub fn base_mut(&mut self, side: Side) -> &mut Base {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }

    /// Unit roster.
    #[must_use]
    pub fn roster(&self) -> &UnitRoster {
        &self.roster
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Owned read-only view for presentation.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(self)
    }

    /// Run one discrete update of `elapsed_ms`.
    ///
    /// Does nothing once the match has ended.
    pub fn step(&mut self, elapsed_ms: Fixed) -> TickEvents {
        let mut events = TickEvents::default();
        if self.phase.is_terminal() {
            return events;
        }

        self.stats.ticks += 1;
        self.stats.elapsed_time_ms += elapsed_ms;
        let now = self.stats.elapsed_time_ms;
        events.tick = self.stats.ticks;

        economy::accrue(&mut self.player, &mut self.opponent, self.rates, &mut self.stats);
        opponent::run(self, elapsed_ms, &mut events);
        projectiles::fire_cannons(self, now, &mut events);
        projectiles::advance_projectiles(self, &mut events);
        combat::resolve_units(self, now, &mut events);

        events.removed = self.roster.commit().into_iter().map(|u| u.id).collect();

        if self.phase.is_terminal() {
            tracing::info!(
                phase = ?self.phase,
                tick = self.stats.ticks,
                elapsed_ms = %self.stats.elapsed_time_ms,
                "Match ended"
            );
        }

        tracing::trace!(
            tick = self.stats.ticks,
            units = self.roster.len(),
            projectiles = self.projectiles.len(),
            kills = events.kills.len(),
            "Update complete"
        );

        events
    }

    /// Validate any command against this match without changing anything.
    ///
    /// Start and reset replace the session, so only the difficulty of a
    /// start is checked.
    pub fn check_command(&self, command: &Command) -> std::result::Result<(), CommandError> {
        match command {
            Command::SpawnUnit { archetype, side } => self.check_spawn(archetype, *side),
            Command::BuyUpgrade { upgrade } => self.check_upgrade(Side::Player, upgrade),
            Command::BuyUpgradeFor { side, upgrade } => self.check_upgrade(*side, upgrade),
            Command::Evolve { side } => self.check_evolve(*side),
            Command::StartMatch { difficulty } => self
                .catalog
                .difficulty(*difficulty)
                .map(|_| ())
                .map_err(|_| CommandError::UnknownDifficulty(*difficulty)),
            Command::ResetMatch => Ok(()),
        }
    }

    /// Validate a unit purchase without changing anything.
    pub fn check_spawn(&self, archetype: &str, side: Side) -> std::result::Result<(), CommandError> {
        self.ensure_playing()?;
        let data = self.unit_data(archetype)?;
        let base = self.base(side);
        if !data.available_in(base.age) {
            return Err(CommandError::WrongAge {
                archetype: archetype.to_string(),
                required: data.age,
                current: base.age,
                side,
            });
        }
        economy::check_affordable(base, data.cost)
    }

    /// Buy and spawn a unit for `side`.
    pub fn try_spawn_unit(
        &mut self,
        archetype: &str,
        side: Side,
    ) -> std::result::Result<UnitId, CommandError> {
        self.check_spawn(archetype, side)?;
        let catalog = Arc::clone(&self.catalog);
        let data = catalog
            .unit(archetype)
            .ok_or_else(|| CommandError::UnknownArchetype(archetype.to_string()))?;

        self.base_mut(side).gold -= data.cost;
        Ok(self.spawn(data, side, catalog.arena.spawn_x(side)))
    }

    /// Validate an upgrade purchase without changing anything.
    pub fn check_upgrade(&self, side: Side, upgrade: &str) -> std::result::Result<(), CommandError> {
        self.ensure_playing()?;
        let data = self
            .catalog
            .upgrade(upgrade)
            .ok_or_else(|| CommandError::UnknownUpgrade(upgrade.to_string()))?;
        economy::check_upgrade(self.base(side), data)
    }

    /// Buy an upgrade for `side`.
    pub fn try_buy_upgrade(&mut self, side: Side, upgrade: &str) -> std::result::Result<(), CommandError> {
        self.ensure_playing()?;
        let catalog = Arc::clone(&self.catalog);
        let data = catalog
            .upgrade(upgrade)
            .ok_or_else(|| CommandError::UnknownUpgrade(upgrade.to_string()))?;
        economy::buy_upgrade(self.base_mut(side), data)
    }

    /// Validate evolution without changing anything.
    pub fn check_evolve(&self, side: Side) -> std::result::Result<(), CommandError> {
        self.ensure_playing()?;
        economy::check_evolve(self.base(side), self.catalog.economy.evolution_cost)
    }

    /// Evolve `side` to the second age.
    pub fn try_evolve(&mut self, side: Side) -> std::result::Result<(), CommandError> {
        self.ensure_playing()?;
        let cost = self.catalog.economy.evolution_cost;
        economy::evolve(self.base_mut(side), cost)
    }

    /// Put a unit on the lane at `position` without paying or checking age.
    ///
    /// Intended for scenario setup; the match must still be running.
    pub fn place_unit(
        &mut self,
        archetype: &str,
        side: Side,
        position: Fixed,
    ) -> std::result::Result<UnitId, CommandError> {
        self.ensure_playing()?;
        let catalog = Arc::clone(&self.catalog);
        let data = catalog
            .unit(archetype)
            .ok_or_else(|| CommandError::UnknownArchetype(archetype.to_string()))?;
        Ok(self.spawn(data, side, position))
    }

    /// Hash of the full match state, for determinism checks.
    ///
    /// Two sessions built from the same catalog, difficulty, seed and
    /// command sequence hash identically after every update.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.phase.hash(&mut hasher);
        self.stats.ticks.hash(&mut hasher);
        self.stats.elapsed_time_ms.to_bits().hash(&mut hasher);
        self.stats.gold_generated_by_player.to_bits().hash(&mut hasher);
        self.stats.enemies_killed_by_player.hash(&mut hasher);
        self.stats.units_lost_by_player.hash(&mut hasher);

        for base in [&self.player, &self.opponent] {
            base.health.to_bits().hash(&mut hasher);
            base.max_health.to_bits().hash(&mut hasher);
            base.gold.to_bits().hash(&mut hasher);
            base.accumulated_gold.to_bits().hash(&mut hasher);
            base.age.hash(&mut hasher);
            base.upgrades.hash(&mut hasher);
            for cannon in &base.cannons {
                cannon.last_fired_ms.map(Fixed::to_bits).hash(&mut hasher);
            }
        }

        self.roster.len().hash(&mut hasher);
        for unit in self.roster.iter() {
            unit.id.hash(&mut hasher);
            unit.side.hash(&mut hasher);
            unit.archetype.hash(&mut hasher);
            unit.position.to_bits().hash(&mut hasher);
            unit.health.to_bits().hash(&mut hasher);
            unit.last_attack_ms.map(Fixed::to_bits).hash(&mut hasher);
            unit.state.hash(&mut hasher);
        }

        self.projectiles.len().hash(&mut hasher);
        for projectile in &self.projectiles {
            projectile.id.hash(&mut hasher);
            projectile.target.hash(&mut hasher);
            projectile.position.x.to_bits().hash(&mut hasher);
            projectile.position.y.to_bits().hash(&mut hasher);
        }

        self.brain.buy_cooldown_ms().to_bits().hash(&mut hasher);
        self.rng.get_word_pos().hash(&mut hasher);

        hasher.finish()
    }

    pub(crate) fn next_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id += 1;
        id
    }

    /// Credit a kill whose killing blow was just queued.
    ///
    /// The victim is still in the roster until the ledger is committed.
    pub(crate) fn record_kill(
        &mut self,
        killer: Side,
        victim: UnitId,
        source: KillSource,
        events: &mut TickEvents,
    ) {
        let Some(unit) = self.roster.get(victim) else {
            return;
        };
        let event = KillEvent {
            victim,
            victim_side: unit.side,
            archetype: unit.archetype.clone(),
            reward: unit.reward,
            source,
        };

        match killer {
            Side::Player => {
                economy::credit_kill(&mut self.player, event.reward, false);
                self.stats.enemies_killed_by_player += 1;
                self.stats.gold_generated_by_player += event.reward;
            }
            Side::Opponent => {
                let lifetime = self.catalog.opponent.kills_count_toward_evolution;
                economy::credit_kill(&mut self.opponent, event.reward, lifetime);
                self.stats.units_lost_by_player += 1;
            }
        }

        tracing::trace!(%killer, %victim, ?source, "Unit killed");
        events.kills.push(event);
    }

    /// Damage `side`'s base. A destroyed base takes no further damage.
    pub(crate) fn damage_base(
        &mut self,
        side: Side,
        attacker: UnitId,
        damage: Fixed,
        events: &mut TickEvents,
    ) {
        let base = self.base_mut(side);
        if base.is_destroyed() {
            return;
        }

        base.health -= damage;
        let destroyed = base.is_destroyed();
        events.base_hits.push(BaseHit {
            side,
            attacker,
            damage,
        });

        if destroyed && !self.phase.is_terminal() {
            self.phase = MatchPhase::for_fallen_base(side);
            events.phase_change = Some(self.phase);
        }
    }

    fn ensure_playing(&self) -> std::result::Result<(), CommandError> {
        if self.phase.is_terminal() {
            Err(CommandError::MatchOver)
        } else {
            Ok(())
        }
    }

    fn unit_data(&self, archetype: &str) -> std::result::Result<&UnitData, CommandError> {
        self.catalog
            .unit(archetype)
            .ok_or_else(|| CommandError::UnknownArchetype(archetype.to_string()))
    }

    fn spawn(&mut self, data: &UnitData, side: Side, position: Fixed) -> UnitId {
        let health = match side {
            Side::Player => data.health,
            Side::Opponent => data.health.saturating_mul(self.difficulty.enemy_hp_multiplier),
        };

        let id = self.roster.insert(Unit {
            id: UnitId::default(),
            side,
            archetype: data.id.clone(),
            position,
            health,
            max_health: health,
            damage: data.damage,
            range: data.range,
            speed: data.speed,
            attack_cooldown_ms: data.attack_cooldown_ms,
            last_attack_ms: None,
            behavior: data.behavior,
            reward: data.reward,
            state: UnitState::Walking,
        });

        match side {
            Side::Player => self.stats.player_units_spawned += 1,
            Side::Opponent => self.stats.opponent_units_spawned += 1,
        }
        tracing::debug!(%side, archetype = %data.id, %id, "Unit spawned");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Age;

    fn quiet_session() -> GameSession {
        let mut catalog = Catalog::builtin();
        for row in &mut catalog.difficulties {
            row.ai_buy_chance = 0.0;
        }
        GameSession::new(Arc::new(catalog), DifficultyId::Normal, 1).unwrap()
    }

    fn tick_ms() -> Fixed {
        Fixed::from_num(1000) / Fixed::from_num(60)
    }

    #[test]
    fn test_spawn_deducts_cost() {
        let mut s = quiet_session();
        let id = s.try_spawn_unit("warrior", Side::Player).unwrap();
        assert_eq!(s.base(Side::Player).gold, Fixed::from_num(85));
        let unit = s.roster().get(id).unwrap();
        assert_eq!(unit.position, Fixed::from_num(100));
        assert_eq!(s.stats().player_units_spawned, 1);
    }

    #[test]
    fn test_spawn_wrong_age_rejected() {
        let mut s = quiet_session();
        s.base_mut(Side::Player).gold = Fixed::from_num(1000);
        let err = s.try_spawn_unit("dragon_knight", Side::Player).unwrap_err();
        assert!(matches!(err, CommandError::WrongAge { required: Age::Second, .. }));

        s.try_evolve(Side::Player).unwrap();
        assert!(s.try_spawn_unit("warrior", Side::Player).is_err());
        assert!(s.try_spawn_unit("dragon_knight", Side::Player).is_ok());
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let mut s = quiet_session();
        assert_eq!(
            s.try_spawn_unit("wizard", Side::Player),
            Err(CommandError::UnknownArchetype("wizard".into()))
        );
        assert_eq!(
            s.try_buy_upgrade(Side::Player, "moat"),
            Err(CommandError::UnknownUpgrade("moat".into()))
        );
    }

    #[test]
    fn test_opponent_units_scaled_by_difficulty() {
        let mut catalog = Catalog::builtin();
        for row in &mut catalog.difficulties {
            row.ai_buy_chance = 0.0;
        }
        let mut s = GameSession::new(Arc::new(catalog), DifficultyId::Hard, 1).unwrap();
        let id = s.try_spawn_unit("warrior", Side::Opponent).unwrap();
        let unit = s.roster().get(id).unwrap();
        assert_eq!(unit.health, Fixed::from_num(30) * Fixed::from_num(1.2));
        assert_eq!(unit.position, Fixed::from_num(1100));
    }

    #[test]
    fn test_huge_hp_multiplier_saturates() {
        let mut catalog = Catalog::builtin();
        for row in &mut catalog.difficulties {
            row.ai_buy_chance = 0.0;
            row.enemy_hp_multiplier = Fixed::from_num(10_000);
        }
        catalog.units[0].health = Fixed::from_num(1_000_000);
        let mut s = GameSession::new(Arc::new(catalog), DifficultyId::Normal, 1).unwrap();

        let id = s.try_spawn_unit("warrior", Side::Opponent).unwrap();
        let unit = s.roster().get(id).unwrap();
        assert_eq!(unit.health, Fixed::MAX);
        assert_eq!(unit.max_health, Fixed::MAX);
        s.step(tick_ms());
        assert!(s.roster().get(id).is_some());
    }

    #[test]
    fn test_step_advances_clock_and_income() {
        let mut s = quiet_session();
        let events = s.step(tick_ms());
        assert_eq!(events.tick, 1);
        assert_eq!(s.tick(), 1);
        assert_eq!(s.stats().elapsed_time_ms, tick_ms());
        assert!(s.base(Side::Player).gold > Fixed::from_num(100));
    }

    #[test]
    fn test_base_destroyed_once() {
        let mut s = quiet_session();
        s.base_mut(Side::Opponent).health = Fixed::from_num(10);
        let mut events = TickEvents::default();

        s.damage_base(Side::Opponent, UnitId(1), Fixed::from_num(15), &mut events);
        assert_eq!(s.phase(), MatchPhase::Victory);
        assert_eq!(events.phase_change, Some(MatchPhase::Victory));
        assert_eq!(s.base(Side::Opponent).health, Fixed::from_num(-5));
        assert_eq!(s.base(Side::Opponent).display_health(), Fixed::ZERO);

        s.damage_base(Side::Opponent, UnitId(1), Fixed::from_num(15), &mut events);
        assert_eq!(s.base(Side::Opponent).health, Fixed::from_num(-5));
        assert_eq!(events.base_hits.len(), 1);
    }

    #[test]
    fn test_commands_rejected_after_match_over() {
        let mut s = quiet_session();
        s.phase = MatchPhase::Defeat;
        assert_eq!(s.try_spawn_unit("warrior", Side::Player), Err(CommandError::MatchOver));
        assert_eq!(s.try_evolve(Side::Player), Err(CommandError::MatchOver));
        assert_eq!(s.step(tick_ms()), TickEvents::default());
        assert_eq!(s.tick(), 0);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let catalog = Arc::new(Catalog::builtin());
        let mut a = GameSession::new(Arc::clone(&catalog), DifficultyId::Hard, 99).unwrap();
        let mut b = GameSession::new(catalog, DifficultyId::Hard, 99).unwrap();
        for _ in 0..600 {
            a.step(tick_ms());
            b.step(tick_ms());
            assert_eq!(a.state_hash(), b.state_hash());
        }
    }

    #[test]
    fn test_kill_credit_counts_toward_evolution() {
        let mut s = quiet_session();
        let victim = s.place_unit("knight", Side::Player, Fixed::from_num(500)).unwrap();
        s.roster.queue_damage(victim, Fixed::from_num(100));
        let mut events = TickEvents::default();
        s.record_kill(Side::Opponent, victim, KillSource::Unit, &mut events);

        assert_eq!(s.base(Side::Opponent).gold, Fixed::from_num(125));
        assert_eq!(s.base(Side::Opponent).accumulated_gold, Fixed::from_num(25));
        assert_eq!(s.stats().units_lost_by_player, 1);
    }
}
