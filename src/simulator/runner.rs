//! Monte Carlo validation runner.
//!
//! Every playthrough owns its board and its ChaCha8 stream (seeded with
//! `seed + i`), so rayon can run them in any order and the aggregate is the
//! same as a sequential run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::agent::choose_swap;
use super::config::{SimConfig, QUICK_ITERATIONS};
use super::report::ValidationResult;
use crate::analytics::{PlayResult, PlaySession};
use crate::error::{LevelError, SimulationError};
use crate::level::state::{LevelState, DEFAULT_MAX_REPAIR_ATTEMPTS};
use crate::level::types::LevelDef;

/// Synthetic seconds per move when turning playthroughs into sessions.
pub const SECONDS_PER_MOVE: f64 = 4.0;

/// Outcome of one simulated attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playthrough {
    pub won: bool,
    pub moves_used: u32,
    pub moves_remaining: u32,
    pub cascades: u32,
    pub specials_created: u32,
    pub specials_triggered: u32,
    pub shuffles: u32,
    /// Times the agent found no legal swap.
    pub deadlocks: u32,
    pub goal_progress: u32,
    pub goal_total: u32,
}

impl Playthrough {
    /// Express this playthrough as an analytics record.
    pub fn to_play_session(
        &self,
        def: &LevelDef,
        player_id: &str,
        retry_count: u32,
        timestamp: i64,
    ) -> PlaySession {
        PlaySession {
            level: def.level_index,
            player_id: player_id.to_string(),
            result: if self.won {
                PlayResult::Win
            } else {
                PlayResult::Lose
            },
            moves_used: self.moves_used,
            moves_total: def.moves,
            goal_progress: self.goal_progress,
            goal_total: self.goal_total,
            duration_secs: self.moves_used as f64 * SECONDS_PER_MOVE,
            cascade_count: self.cascades,
            shuffle_count: self.shuffles,
            specials_created: self.specials_created,
            specials_triggered: self.specials_triggered,
            retry_count,
            timestamp,
        }
    }
}

/// Play one attempt with the scripted agent.
pub fn play_once(def: &LevelDef, seed: u64) -> Result<Playthrough, LevelError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut state = LevelState::build(def, DEFAULT_MAX_REPAIR_ATTEMPTS, &mut rng)?;
    let mut deadlocks = 0;

    while !state.is_finished() {
        let Some(swap) = choose_swap(&state.board, &state.goals) else {
            deadlocks += 1;
            if !state.shuffle(&mut rng) {
                log::warn!(
                    "level {}: shuffle failed with {} moves left, playthrough lost",
                    def.level_index,
                    state.moves_left
                );
                break;
            }
            continue;
        };
        state.apply_swap(swap, &mut rng)?;
    }

    let won = state.is_won();
    Ok(Playthrough {
        won,
        moves_used: state.counters.moves_used,
        moves_remaining: state.moves_left,
        cascades: state.counters.cascades,
        specials_created: state.counters.specials_created,
        specials_triggered: state.counters.specials_triggered,
        shuffles: state.counters.shuffles,
        deadlocks,
        goal_progress: state.goals.iter().map(|g| g.progress()).sum(),
        goal_total: state.goals.iter().map(|g| g.total()).sum(),
    })
}

/// Run every playthrough and return them in iteration order.
pub fn simulate(def: &LevelDef, config: &SimConfig) -> Result<Vec<Playthrough>, SimulationError> {
    if config.iterations == 0 {
        return Err(SimulationError::NoIterations);
    }
    let runs = (0..config.iterations)
        .into_par_iter()
        .map(|i| play_once(def, config.seed.wrapping_add(u64::from(i))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(runs)
}

/// Monte Carlo validation of a level.
pub fn validate(def: &LevelDef, config: &SimConfig) -> Result<ValidationResult, SimulationError> {
    let runs = simulate(def, config)?;
    let result = ValidationResult::from_playthroughs(&runs);
    log::info!(
        "level {}: win rate {:.1}% over {} runs, difficulty {:.1}",
        def.level_index,
        result.win_rate * 100.0,
        result.iterations,
        result.difficulty_score
    );
    Ok(result)
}

/// Small validation run seeded from the level itself.
pub fn quick_validate(def: &LevelDef, iterations: Option<u32>) -> Result<ValidationResult, SimulationError> {
    let config = SimConfig::new(iterations.unwrap_or(QUICK_ITERATIONS), def.seed);
    validate(def, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::{BoardSize, TileType};
    use crate::level::types::{BlockerLayout, CollectGoal, Goal};

    fn easy_level() -> LevelDef {
        LevelDef {
            level_index: 1,
            seed: 11,
            board_size: BoardSize::square(6),
            moves: 30,
            goals: vec![Goal::Collect(CollectGoal {
                item: TileType::Leaf,
                count: 10,
                current: 0,
            })],
            blockers: BlockerLayout::empty(),
            tile_weights: TileType::ALL[..5].iter().map(|k| (*k, 1.0)).collect(),
            is_boss: false,
        }
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let result = validate(&easy_level(), &SimConfig::new(0, 1));
        assert_eq!(result.unwrap_err(), SimulationError::NoIterations);
    }

    #[test]
    fn test_playthrough_terminates_consistently() {
        let def = easy_level();
        let run = play_once(&def, 5).unwrap();
        assert_eq!(run.moves_used + run.moves_remaining, def.moves);
        if run.won {
            assert_eq!(run.goal_progress, run.goal_total);
        } else {
            assert!(run.goal_progress < run.goal_total);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let def = easy_level();
        let a = validate(&def, &SimConfig::new(8, 42)).unwrap();
        let b = validate(&def, &SimConfig::new(8, 42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generous_level_is_playable() {
        let result = quick_validate(&easy_level(), None).unwrap();
        assert_eq!(result.iterations, QUICK_ITERATIONS);
        assert!(result.win_rate > 0.5, "win rate {}", result.win_rate);
        assert!(result.is_playable);
    }

    #[test]
    fn test_impossible_goal_is_not_playable() {
        let mut def = easy_level();
        def.moves = 1;
        def.goals = vec![Goal::Collect(CollectGoal {
            item: TileType::Leaf,
            count: 60,
            current: 0,
        })];
        let result = quick_validate(&def, Some(10)).unwrap();
        assert_eq!(result.win_rate, 0.0);
        assert!(!result.is_playable);
        assert_eq!(result.min_moves_to_win, None);
        assert!(result.difficulty_score >= 10.0 - 1e-9);
    }

    #[test]
    fn test_to_play_session() {
        let def = easy_level();
        let run = play_once(&def, 3).unwrap();
        let session = run.to_play_session(&def, "sim-1", 2, 1_700_000_000);
        assert_eq!(session.level, 1);
        assert_eq!(session.moves_total, 30);
        assert_eq!(session.retry_count, 2);
        assert_eq!(session.result == PlayResult::Win, run.won);
    }
}
