//! Level blueprints, their generation and their playable state.

pub mod generator;
pub mod moss;
pub mod state;
pub mod types;

/// Highest level index the generator accepts.
pub const MAX_LEVEL: u32 = 10_000;

pub use generator::{derive_seed, GeneratorOptions, LevelGenerator};
pub use moss::MossGenerator;
pub use state::{LevelCounters, LevelState, DEFAULT_MAX_REPAIR_ATTEMPTS};
pub use types::{
    BlockerLayout, BlockerPattern, CollectGoal, Goal, GoalType, LevelDef, MossGoal,
};
