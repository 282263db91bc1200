//! Monte Carlo level validator.
//!
//! Plays a level many times with a scripted agent to measure:
//! - Win rate and how many moves wins take
//! - Cascades and special tile usage
//! - How often the board deadlocks
//!
//! Playthroughs use the same move resolution as `LevelState`, so simulated
//! results follow the real board rules.

pub mod agent;
mod config;
mod report;
mod runner;

pub use config::{SimConfig, QUICK_ITERATIONS};
pub use report::{confidence, difficulty_score, ValidationResult, PLAYABLE_WIN_RATE};
pub use runner::{play_once, quick_validate, simulate, validate, Playthrough, SECONDS_PER_MOVE};
