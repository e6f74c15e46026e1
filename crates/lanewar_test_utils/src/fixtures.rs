//! Test fixtures and helpers.
//!
//! Pre-built catalogs and sessions for consistent testing. "Quiet" fixtures
//! switch off the opponent's random purchases so scenarios only contain the
//! units a test places.

use std::sync::Arc;

use fixed::types::I32F32;
use lanewar_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Built-in catalog with opponent purchases disabled.
#[must_use]
pub fn quiet_catalog() -> Catalog {
    let mut catalog = Catalog::builtin();
    for row in &mut catalog.difficulties {
        row.ai_buy_chance = 0.0;
    }
    catalog
}

/// Fresh session on the quiet catalog at normal difficulty.
///
/// # Panics
///
/// Panics if the built-in catalog fails to validate.
#[must_use]
pub fn quiet_session() -> GameSession {
    GameSession::new(Arc::new(quiet_catalog()), DifficultyId::Normal, 0)
        .expect("built-in catalog is valid")
}

/// Fresh simulation on the quiet catalog.
///
/// # Panics
///
/// Panics if the built-in catalog fails to validate.
#[must_use]
pub fn quiet_simulation(difficulty: DifficultyId) -> Simulation {
    Simulation::new(quiet_catalog(), difficulty, 0).expect("built-in catalog is valid")
}

/// Simulation on the real built-in catalog.
///
/// # Panics
///
/// Panics if the built-in catalog fails to validate.
#[must_use]
pub fn live_simulation(difficulty: DifficultyId, seed: u64) -> Simulation {
    Simulation::new(Catalog::builtin(), difficulty, seed).expect("built-in catalog is valid")
}

/// Place a unit at lane position `x`.
///
/// # Panics
///
/// Panics if the archetype is unknown or the match is over.
pub fn place(session: &mut GameSession, archetype: &str, side: Side, x: i32) -> UnitId {
    session
        .place_unit(archetype, side, fixed(x))
        .unwrap_or_else(|e| panic!("cannot place {archetype}: {e}"))
}

/// Run `ticks` fixed-slice updates, returning the events of each.
pub fn run_ticks(sim: &mut Simulation, ticks: u64) -> Vec<TickEvents> {
    (0..ticks).map_while(|_| sim.step()).collect()
}

/// Step until the match ends or `max_ticks` updates have run.
///
/// Returns the terminal phase, if reached.
pub fn run_until_over(sim: &mut Simulation, max_ticks: u64) -> Option<MatchPhase> {
    run_ticks(sim, max_ticks);
    let phase = sim.phase();
    phase.is_terminal().then_some(phase)
}
