//! Wall-clock driven simulation clock and command surface.
//!
//! The [`Simulation`] owns the current [`GameSession`] and turns elapsed
//! real time into discrete updates. It is also where commands enter the
//! game, including the ones that replace the session (start and reset).

use std::sync::Arc;
use std::time::Duration;

use crate::commands::Command;
use crate::components::{MatchPhase, Side};
use crate::data::{Catalog, DifficultyId};
use crate::error::{CommandError, Result};
use crate::math::Fixed;
use crate::session::{GameSession, TickEvents};
use crate::snapshot::GameSnapshot;

/// Discrete updates per second of match time.
pub const TICK_RATE: u32 = 60;

/// Length of one update slice in milliseconds (1000 / [`TICK_RATE`]).
#[must_use]
pub fn tick_interval_ms() -> Fixed {
    Fixed::from_num(1000) / Fixed::from_num(TICK_RATE)
}

fn duration_to_ms(elapsed: Duration) -> Fixed {
    let micros = i32::try_from(elapsed.as_micros()).unwrap_or(i32::MAX);
    Fixed::from_num(micros) / Fixed::from_num(1000)
}

/// Owner of the running match.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lanewar_core::prelude::*;
///
/// let mut sim = Simulation::new(Catalog::builtin(), DifficultyId::Easy, 7)?;
/// sim.apply(Command::spawn("warrior"));
///
/// // Less than one slice: nothing runs yet.
/// assert!(sim.advance(Duration::from_millis(10)).is_none());
/// assert!(sim.advance(Duration::from_millis(10)).is_some());
/// assert_eq!(sim.session().tick(), 1);
/// # Ok::<(), GameError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Simulation {
    catalog: Arc<Catalog>,
    session: GameSession,
    accumulator_ms: Fixed,
    seed: u64,
    matches_started: u64,
}

impl Simulation {
    /// Start a match with its own copy of `catalog`.
    pub fn new(catalog: Catalog, difficulty: DifficultyId, seed: u64) -> Result<Self> {
        Self::with_shared_catalog(Arc::new(catalog), difficulty, seed)
    }

    /// Start a match sharing an already loaded catalog.
    pub fn with_shared_catalog(catalog: Arc<Catalog>, difficulty: DifficultyId, seed: u64) -> Result<Self> {
        let session = GameSession::new(Arc::clone(&catalog), difficulty, seed)?;
        Ok(Self {
            catalog,
            session,
            accumulator_ms: Fixed::ZERO,
            seed,
            matches_started: 1,
        })
    }

    /// Current match.
    #[must_use]
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Mutable access to the current match, for scenario setup and tooling.
    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        self.session.phase()
    }

    /// Seed of the first match.
    ///
    /// Every later start or reset seeds its opponent with this value plus
    /// the number of matches started before it, so each replay of a
    /// simulation sees the same sequence of matches but no two matches
    /// share a random stream.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Owned read-only view of the current match.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        self.session.snapshot()
    }

    /// Feed elapsed wall-clock time.
    ///
    /// Once at least one slice ([`tick_interval_ms`]) has accumulated, runs
    /// exactly one update covering all of the accumulated time and clears
    /// the accumulator. There is no catch-up loop. Does nothing once the
    /// match has ended.
    pub fn advance(&mut self, elapsed: Duration) -> Option<TickEvents> {
        if self.session.phase().is_terminal() {
            return None;
        }

        self.accumulator_ms = self.accumulator_ms.saturating_add(duration_to_ms(elapsed));
        if self.accumulator_ms < tick_interval_ms() {
            return None;
        }

        let slice = std::mem::replace(&mut self.accumulator_ms, Fixed::ZERO);
        Some(self.session.step(slice))
    }

    /// Run exactly one update of one slice, ignoring the wall clock.
    ///
    /// Used by headless runs and tests.
    pub fn step(&mut self) -> Option<TickEvents> {
        if self.session.phase().is_terminal() {
            return None;
        }
        Some(self.session.step(tick_interval_ms()))
    }

    /// Validate a command against the current state without applying it.
    pub fn check_command(&self, command: &Command) -> std::result::Result<(), CommandError> {
        self.session.check_command(command)
    }

    /// Apply a command, reporting why it was rejected.
    pub fn try_apply(&mut self, command: Command) -> std::result::Result<(), CommandError> {
        match command {
            Command::SpawnUnit { archetype, side } => {
                self.session.try_spawn_unit(&archetype, side).map(|_| ())
            }
            Command::BuyUpgrade { upgrade } => self.session.try_buy_upgrade(Side::Player, &upgrade),
            Command::BuyUpgradeFor { side, upgrade } => self.session.try_buy_upgrade(side, &upgrade),
            Command::Evolve { side } => self.session.try_evolve(side),
            Command::StartMatch { difficulty } => self.start_match(difficulty),
            Command::ResetMatch => {
                self.reset_match();
                Ok(())
            }
        }
    }

    /// Apply a command. Rejected commands leave the state untouched.
    pub fn apply(&mut self, command: Command) {
        let kind = command.kind();
        if let Err(reason) = self.try_apply(command) {
            tracing::debug!(command = kind, %reason, "Command rejected");
        }
    }

    /// Discard the current match and start a new one at `difficulty`.
    pub fn start_match(&mut self, difficulty: DifficultyId) -> std::result::Result<(), CommandError> {
        let seed = self.seed.wrapping_add(self.matches_started);
        let session = GameSession::new(Arc::clone(&self.catalog), difficulty, seed)
            .map_err(|_| CommandError::UnknownDifficulty(difficulty))?;
        self.session = session;
        self.matches_started += 1;
        self.accumulator_ms = Fixed::ZERO;
        Ok(())
    }

    /// Discard the current match and restart at the same difficulty.
    pub fn reset_match(&mut self) {
        let difficulty = self.session.difficulty().id;
        if let Err(error) = self.start_match(difficulty) {
            // Unreachable with a catalog that already started this difficulty.
            tracing::warn!(%error, "Reset failed; keeping current match");
        }
    }
}
