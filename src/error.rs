//! Error types for generation, simulation, configuration and profiles.

use crate::board::types::Cell;

/// Errors raised while building or mutating levels.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LevelError {
    #[error("level index {0} is out of range (expected 1..={})", crate::level::MAX_LEVEL)]
    InvalidLevel(u32),

    #[error("board for level {level} still invalid after {attempts} repair attempts")]
    RepairExhausted { level: u32, attempts: u32 },

    #[error("invalid tile weights: {0}")]
    InvalidTileWeights(String),

    #[error("swapping {from} and {to} is not a legal matching move")]
    InvalidSwap { from: Cell, to: Cell },

    #[error("no moves left")]
    NoMovesLeft,
}

/// Errors raised by the Monte Carlo validator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("iteration count must be positive")]
    NoIterations,

    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Errors raised while loading or patching a balance config.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("balance config JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("balance config has no phases")]
    NoPhases,

    #[error("phase '{name}' has an empty level range")]
    EmptyPhase { name: String },

    #[error("phase '{name}' overlaps or precedes the previous phase")]
    OverlappingPhases { name: String },

    #[error("phase '{name}' target difficulty does not increase")]
    NonIncreasingDifficulty { name: String },

    #[error("phase '{name}' is open-ended but is not the last phase")]
    OpenPhaseNotLast { name: String },

    #[error("invalid A/B test '{test_id}': {reason}")]
    InvalidAbTest { test_id: String, reason: String },
}

/// Errors raised while exporting or importing player profiles.
#[derive(thiserror::Error, Debug)]
pub enum ProfileError {
    #[error("profile JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("profile for '{0}' has out-of-range fields")]
    OutOfRange(String),

    #[error("no profile for player '{0}'")]
    UnknownPlayer(String),
}
