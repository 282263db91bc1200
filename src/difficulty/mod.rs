//! Difficulty: a static estimate of level blueprints and per-player
//! dynamic adjustment.

mod dynamic;
mod estimator;

pub use dynamic::{
    AdjustmentReason, AdjustmentStats, DdaSettings, DifficultyModifier, DynamicDifficulty,
    PlayerProfile,
};
pub use estimator::{
    DifficultyBreakdown, DifficultyEstimator, DifficultyFactors, EstimatorReport, OUTLIER_Z,
    TARGET_TOLERANCE,
};
