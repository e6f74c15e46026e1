//! # Lanewar Core
//!
//! Deterministic simulation core for Lanewar, a two-lane base-defense game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO inside the update loop (catalog loading happens once, up front)
//! - No system randomness (the automated opponent uses a seeded stream)
//! - No floating-point math in the update (uses fixed-point)
//!
//! This separation enables:
//! - Headless batch runs for balance testing
//! - Determinism testing via [`GameSession::state_hash`](session::GameSession::state_hash)
//! - Any presentation layer that can consume a [`GameSnapshot`](snapshot::GameSnapshot)
//!
//! ## Crate Structure
//!
//! - [`data`] - Catalog of unit, upgrade and difficulty archetypes
//! - [`components`] - Bases, units, projectiles and match bookkeeping
//! - [`roster`] - Unit arena with the per-tick damage ledger
//! - [`economy`], [`opponent`], [`projectiles`], [`combat`], [`movement`] - Update phases
//! - [`session`] - Authoritative game state and the discrete update
//! - [`simulation`] - Wall-clock driven simulation clock and command surface
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod commands;
pub mod components;
pub mod data;
pub mod economy;
pub mod error;
pub mod math;
pub mod movement;
pub mod opponent;
pub mod projectiles;
pub mod roster;
pub mod session;
pub mod simulation;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::Command;
    pub use crate::components::{
        Age, Base, BehaviorClass, Cannon, MatchPhase, MatchStats, Projectile, ProjectileId, Side,
        Unit, UnitId, UnitState,
    };
    pub use crate::data::{
        ArenaConfig, Catalog, CostBucket, DifficultyData, DifficultyId, EconomyConfig,
        OpponentConfig, PurchaseWeights, UnitData, UpgradeData, UpgradeEffect,
    };
    pub use crate::error::{CommandError, GameError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::opponent::OpponentAction;
    pub use crate::session::{GameSession, KillSource, TickEvents};
    pub use crate::simulation::{tick_interval_ms, Simulation, TICK_RATE};
    pub use crate::snapshot::{BaseSnapshot, GameSnapshot};
}
