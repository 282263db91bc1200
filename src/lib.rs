//! Levelforge - procedural match-3 level generation and balance simulation.
//!
//! Levels are generated deterministically from a level index and a player
//! seed, checked for solvability, scored statically, validated by Monte Carlo
//! playthroughs, adjusted per player, and analyzed from recorded play data.
//! Every tunable number lives in a `BalanceConfigManager` shared as an `Arc`.

pub mod analytics;
pub mod balance;
pub mod board;
pub mod build_info;
pub mod difficulty;
pub mod error;
pub mod level;
pub mod simulator;

pub use analytics::{LevelAnalyzer, PlayResult, PlaySession};
pub use balance::{BalanceConfig, BalanceConfigManager, BalanceFormulas};
pub use difficulty::{DifficultyEstimator, DifficultyModifier, DynamicDifficulty};
pub use error::{ConfigError, LevelError, ProfileError, SimulationError};
pub use level::{GeneratorOptions, LevelDef, LevelGenerator, LevelState};
pub use simulator::{quick_validate, validate, SimConfig, ValidationResult};
