//! Data structures for the game catalog.
//!
//! This module contains the static configuration rows that define unit,
//! upgrade and difficulty archetypes, plus arena geometry and economy
//! constants. All structs deserialize from RON; [`Catalog::builtin`] gives
//! the shipped defaults without touching the filesystem.

mod catalog;
mod difficulty_data;
mod unit_data;
mod upgrade_data;

pub use catalog::{ArenaConfig, Catalog, EconomyConfig, OpponentConfig, PurchaseWeights};
pub use difficulty_data::{DifficultyData, DifficultyId};
pub use unit_data::{CostBucket, UnitData};
pub use upgrade_data::{UpgradeData, UpgradeEffect};
