//! Error types for the game simulation.

use thiserror::Error;

use crate::components::{Age, Side};
use crate::data::DifficultyId;

/// Result type alias using [`GameError`].
pub type Result<T, E = GameError> = std::result::Result<T, E>;

/// Top-level error type for catalog loading and match setup.
#[derive(Debug, Error)]
pub enum GameError {
    /// Failed to read a catalog file.
    #[error("Failed to read catalog '{path}': {source}")]
    CatalogRead {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Data file parsing error.
    #[error("Failed to parse catalog data: {0}")]
    DataParse(#[from] ron::error::SpannedError),

    /// The catalog parsed but is not internally consistent.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// The catalog has no row for the requested difficulty.
    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(DifficultyId),
}

/// Why a command was rejected.
///
/// The command surface treats every rejection as a silent no-op; this type
/// exists so callers that want to know (a HUD greying out a button, a test)
/// can ask through the `try_*` entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The match already ended.
    #[error("Match is over")]
    MatchOver,

    /// No unit archetype with this id.
    #[error("Unknown unit archetype: {0}")]
    UnknownArchetype(String),

    /// No upgrade with this id.
    #[error("Unknown upgrade: {0}")]
    UnknownUpgrade(String),

    /// The archetype belongs to a different age than the side is in.
    #[error("{archetype} requires age {required}, {side} is in age {current}")]
    WrongAge {
        /// Archetype that was requested.
        archetype: String,
        /// Age the archetype belongs to.
        required: Age,
        /// Age the side is currently in.
        current: Age,
        /// Side that issued the command.
        side: Side,
    },

    /// Not enough gold.
    #[error("Insufficient gold: need {required}, have {available}")]
    InsufficientGold {
        /// Gold required (rounded down for display).
        required: i64,
        /// Gold available (rounded down for display).
        available: i64,
    },

    /// The upgrade was already bought by this side.
    #[error("Upgrade already purchased: {0}")]
    AlreadyPurchased(String),

    /// The upgrade needs another upgrade first.
    #[error("Upgrade {upgrade} requires {requires}")]
    MissingPrerequisite {
        /// Upgrade that was requested.
        upgrade: String,
        /// Upgrade that has to be owned first.
        requires: String,
    },

    /// The side is already in the final age.
    #[error("{0} has already evolved")]
    AlreadyEvolved(Side),

    /// The catalog has no row for the requested difficulty.
    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(DifficultyId),
}
