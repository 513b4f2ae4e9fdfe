//! Error types for the battle simulation.
//!
//! Only rejected commands and bad configuration are errors. Evaded or
//! zero-damage attacks are normal combat events and never surface here.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all battle simulation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Unit archetype identifier not in the catalog.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Item identifier not in the shop.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Hero preset identifier not recognised.
    #[error("Unknown hero: {0}")]
    UnknownHero(String),

    /// Side identifier not recognised.
    #[error("Unknown side: {0}")]
    UnknownSide(String),

    /// Purchase rejected.
    #[error("Insufficient gold: need {required}, have {available}")]
    InsufficientGold {
        /// Amount required.
        required: u32,
        /// Amount available.
        available: u32,
    },

    /// Destination could not be converted to a lane position.
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// The battle has already been decided.
    #[error("Battle is over")]
    BattleOver,

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParse {
        /// Name of the file or string that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },
}
