//! Scripted player used by the validator.
//!
//! Looks one step ahead: every match-producing swap is tried on a copy of the
//! board, the first clearing pass is scored, and the best swap wins. Ties go
//! to the earliest swap in row-major scan order.

use crate::board::matching::{find_all_matches, find_valid_swaps};
use crate::board::resolve::clear_matches;
use crate::board::types::{Board, SpecialType, SwapAction};
use crate::level::types::Goal;

/// Per unit of goal progress (goal item collected or goal moss cleared).
const GOAL_PROGRESS_SCORE: f64 = 10.0;

/// Per moss layer removed while a moss goal is open.
const MOSS_HIT_SCORE: f64 = 3.0;

const WHIRL_CREATED_SCORE: f64 = 6.0;
const LANTERN_CREATED_SCORE: f64 = 10.0;
const SPECIAL_TRIGGERED_SCORE: f64 = 1.0;
const TILE_CLEARED_SCORE: f64 = 1.0;

/// Prefers lower swaps slightly, since they leave more tiles above to cascade.
const DEPTH_SCORE: f64 = 0.01;

/// Score one swap against the current goals.
pub fn score_swap(board: &Board, goals: &[Goal], swap: &SwapAction) -> f64 {
    let mut trial = board.clone();
    trial.swap_tiles(swap.from, swap.to);
    let matches = find_all_matches(&trial);
    if matches.is_empty() {
        return 0.0;
    }

    let created: f64 = matches
        .iter()
        .map(|m| match m.special_type {
            Some(SpecialType::Whirl) => WHIRL_CREATED_SCORE,
            Some(SpecialType::Lantern) => LANTERN_CREATED_SCORE,
            None => 0.0,
        })
        .sum();

    let clear = clear_matches(&mut trial, &matches, &[swap.to, swap.from]);

    let mut progress = 0u32;
    let mut moss_hits = 0usize;
    for goal in goals {
        if let Some(item) = goal.item() {
            progress += (clear.cleared_of(item) as u32).min(goal.remaining_of(item));
        }
        let moss_open = goal.remaining_moss();
        if moss_open > 0 {
            progress += (clear.moss_cells_cleared as u32).min(moss_open);
            moss_hits += clear.moss_layers_removed;
        }
    }

    let depth = swap.from.row.max(swap.to.row) as f64;
    progress as f64 * GOAL_PROGRESS_SCORE
        + moss_hits as f64 * MOSS_HIT_SCORE
        + created
        + clear.specials_triggered as f64 * SPECIAL_TRIGGERED_SCORE
        + clear.tiles_cleared as f64 * TILE_CLEARED_SCORE
        + depth * DEPTH_SCORE
}

/// Best swap for the current board, or `None` when the board is deadlocked.
pub fn choose_swap(board: &Board, goals: &[Goal]) -> Option<SwapAction> {
    let mut best: Option<(SwapAction, f64)> = None;
    for swap in find_valid_swaps(board) {
        let score = score_swap(board, goals, &swap);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((swap, score)),
        }
    }
    best.map(|(swap, _)| swap)
}
