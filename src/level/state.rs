//! Mutable play instance of a level: board, remaining moves and goal progress.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::matching::{find_all_matches, has_valid_move, would_swap_match};
use crate::board::resolve::{resolve_board, MoveOutcome};
use crate::board::spawn::TileSampler;
use crate::board::types::{Blocker, Board, Cell, SwapAction, Tile};
use crate::error::LevelError;
use crate::level::types::{Goal, LevelDef};

/// Repair and shuffle attempts allowed before a board is given up on.
pub const DEFAULT_MAX_REPAIR_ATTEMPTS: u32 = 100;

/// Running totals for one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounters {
    pub moves_used: u32,
    pub tiles_cleared: u32,
    pub cascades: u32,
    pub moss_cleared: u32,
    pub specials_created: u32,
    pub specials_triggered: u32,
    pub shuffles: u32,
}

/// One attempt at a level.
#[derive(Debug, Clone)]
pub struct LevelState {
    pub level_index: u32,
    pub board: Board,
    pub moves_left: u32,
    pub moves_total: u32,
    pub goals: Vec<Goal>,
    pub counters: LevelCounters,
    sampler: TileSampler,
    max_repair_attempts: u32,
}

impl LevelState {
    /// Fill a fresh board for `def` and repair it until it has no matches and
    /// at least one legal move.
    pub fn build<R: Rng>(
        def: &LevelDef,
        max_repair_attempts: u32,
        rng: &mut R,
    ) -> Result<Self, LevelError> {
        let sampler = TileSampler::new(&def.tile_weights)?;
        let mut board = Board::new(def.board_size);
        let layers = def.blockers.layers.max(1);
        for &cell in &def.blockers.cells {
            board.set_blocker(cell, Some(Blocker::moss(layers)));
        }
        for cell in board.open_cells() {
            board.set_tile(cell, Some(Tile::new(sampler.sample(rng))));
        }

        if !repair_board(&mut board, &sampler, max_repair_attempts, rng) {
            log::warn!(
                "level {}: board still invalid after {} repair attempts",
                def.level_index,
                max_repair_attempts
            );
            return Err(LevelError::RepairExhausted {
                level: def.level_index,
                attempts: max_repair_attempts,
            });
        }

        Ok(Self {
            level_index: def.level_index,
            board,
            moves_left: def.moves,
            moves_total: def.moves,
            goals: def.goals.iter().map(|g| g.scaled(1.0, 0)).collect(),
            counters: LevelCounters::default(),
            sampler,
            max_repair_attempts,
        })
    }

    /// Play one swap: the move is spent, matches resolve with cascades, and
    /// goals advance. Swaps that would not match are rejected untouched.
    pub fn apply_swap<R: Rng>(
        &mut self,
        swap: SwapAction,
        rng: &mut R,
    ) -> Result<MoveOutcome, LevelError> {
        if self.moves_left == 0 {
            return Err(LevelError::NoMovesLeft);
        }
        if !would_swap_match(&self.board, &swap) {
            return Err(LevelError::InvalidSwap {
                from: swap.from,
                to: swap.to,
            });
        }

        self.board.swap_tiles(swap.from, swap.to);
        let outcome = resolve_board(&mut self.board, &[swap.to, swap.from], &self.sampler, rng);
        self.moves_left -= 1;

        let clear = &outcome.clear;
        for (&kind, &n) in &clear.cleared_by_kind {
            for goal in &mut self.goals {
                goal.record_collected(kind, n as u32);
            }
        }
        for goal in &mut self.goals {
            goal.record_moss_cleared(clear.moss_cells_cleared as u32);
        }

        let c = &mut self.counters;
        c.moves_used += 1;
        c.tiles_cleared += clear.tiles_cleared as u32;
        c.cascades += outcome.cascades as u32;
        c.moss_cleared += clear.moss_cells_cleared as u32;
        c.specials_created += clear.specials_created as u32;
        c.specials_triggered += clear.specials_triggered as u32;

        Ok(outcome)
    }

    pub fn is_won(&self) -> bool {
        self.goals.iter().all(Goal::is_complete)
    }

    pub fn is_lost(&self) -> bool {
        !self.is_won() && self.moves_left == 0
    }

    pub fn is_finished(&self) -> bool {
        self.is_won() || self.moves_left == 0
    }

    pub fn has_valid_move(&self) -> bool {
        has_valid_move(&self.board)
    }

    /// Goal progress as a fraction in [0, 1].
    pub fn goal_progress(&self) -> f64 {
        let total: u32 = self.goals.iter().map(Goal::total).sum();
        if total == 0 {
            return 1.0;
        }
        let done: u32 = self.goals.iter().map(Goal::progress).sum();
        done as f64 / total as f64
    }

    pub fn sampler(&self) -> &TileSampler {
        &self.sampler
    }

    /// Rearrange tiles to break a deadlock. Returns false if no playable
    /// arrangement was found within the repair budget.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) -> bool {
        self.counters.shuffles += 1;
        shuffle_tiles(&mut self.board, rng);
        repair_board(&mut self.board, &self.sampler, self.max_repair_attempts, rng)
    }
}

/// Permute the tiles of all open cells in place.
pub fn shuffle_tiles<R: Rng>(board: &mut Board, rng: &mut R) {
    let cells: Vec<Cell> = board.open_cells();
    let mut tiles: Vec<Option<Tile>> = cells.iter().map(|&c| board.tile(c)).collect();
    tiles.shuffle(rng);
    for (cell, tile) in cells.into_iter().zip(tiles) {
        board.set_tile(cell, tile);
    }
}

/// Re-roll matched cells until the board is match-free, then reshuffle if it
/// has no legal move. Returns true once the board is playable.
pub fn repair_board<R: Rng>(
    board: &mut Board,
    sampler: &TileSampler,
    max_attempts: u32,
    rng: &mut R,
) -> bool {
    for attempt in 0..max_attempts {
        let matches = find_all_matches(board);
        if !matches.is_empty() {
            for m in &matches {
                for &cell in &m.cells {
                    if let Some(tile) = board.tile(cell) {
                        let kind = sampler.sample_excluding(rng, tile.kind);
                        board.set_tile(cell, Some(Tile { kind, ..tile }));
                    }
                }
            }
            continue;
        }
        if has_valid_move(board) {
            if attempt > 0 {
                log::debug!("board repaired after {attempt} attempts");
            }
            return true;
        }
        shuffle_tiles(board, rng);
    }
    find_all_matches(board).is_empty() && has_valid_move(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::{BoardSize, TileType};
    use crate::level::types::{BlockerLayout, CollectGoal};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn def() -> LevelDef {
        LevelDef {
            level_index: 3,
            seed: 99,
            board_size: BoardSize::square(6),
            moves: 20,
            goals: vec![Goal::Collect(CollectGoal {
                item: TileType::Leaf,
                count: 12,
                current: 0,
            })],
            blockers: BlockerLayout {
                density: 0.1,
                cells: vec![Cell::new(0, 0), Cell::new(5, 5)],
                pattern: None,
                layers: 1,
            },
            tile_weights: TileType::ALL[..5].iter().map(|k| (*k, 1.0)).collect(),
            is_boss: false,
        }
    }

    #[test]
    fn test_build_is_match_free_and_playable() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let state = LevelState::build(&def(), DEFAULT_MAX_REPAIR_ATTEMPTS, &mut rng).unwrap();
            assert!(find_all_matches(&state.board).is_empty());
            assert!(state.has_valid_move());
            assert!(state.board.is_blocked(Cell::new(0, 0)));
            assert_eq!(state.board.open_cells().len(), 34);
        }
    }

    #[test]
    fn test_apply_swap_spends_move_and_tracks_goal() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut state = LevelState::build(&def(), DEFAULT_MAX_REPAIR_ATTEMPTS, &mut rng).unwrap();
        let swap = crate::board::matching::find_valid_swaps(&state.board)[0];
        let outcome = state.apply_swap(swap, &mut rng).unwrap();
        assert_eq!(state.moves_left, 19);
        assert_eq!(state.counters.moves_used, 1);
        assert!(outcome.clear.tiles_cleared >= 3);
        let leaves = outcome.clear.cleared_of(TileType::Leaf) as u32;
        assert_eq!(state.goals[0].progress(), leaves.min(12));
    }

    #[test]
    fn test_illegal_swaps_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut state = LevelState::build(&def(), DEFAULT_MAX_REPAIR_ATTEMPTS, &mut rng).unwrap();
        let far = SwapAction::new(Cell::new(1, 1), Cell::new(3, 3));
        assert!(matches!(
            state.apply_swap(far, &mut rng),
            Err(LevelError::InvalidSwap { .. })
        ));
        assert_eq!(state.moves_left, 20);

        state.moves_left = 0;
        assert!(state.is_lost());
        let swap = SwapAction::new(Cell::new(1, 1), Cell::new(1, 2));
        assert_eq!(state.apply_swap(swap, &mut rng), Err(LevelError::NoMovesLeft));
    }

    #[test]
    fn test_shuffle_keeps_tile_multiset() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut board = Board::from_rows(&["LFB", "M#P", "LFB"]);
        let before: Vec<usize> = TileType::ALL.iter().map(|k| board.count_kind(*k)).collect();
        shuffle_tiles(&mut board, &mut rng);
        let after: Vec<usize> = TileType::ALL.iter().map(|k| board.count_kind(*k)).collect();
        assert_eq!(before, after);
        assert!(board.is_blocked(Cell::new(1, 1)));
    }

    #[test]
    fn test_unplayable_board_exhausts_repairs() {
        // No run of three fits on a 2x2 board, so no swap can ever match.
        let mut level = def();
        level.board_size = BoardSize::square(2);
        level.blockers = BlockerLayout::empty();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert_eq!(
            LevelState::build(&level, 5, &mut rng).unwrap_err(),
            LevelError::RepairExhausted {
                level: 3,
                attempts: 5
            }
        );
    }

    #[test]
    fn test_too_few_kinds_is_error() {
        let mut level = def();
        level.tile_weights = TileType::ALL[..2].iter().map(|k| (*k, 1.0)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            LevelState::build(&level, DEFAULT_MAX_REPAIR_ATTEMPTS, &mut rng),
            Err(LevelError::InvalidTileWeights(_))
        ));
    }
}
