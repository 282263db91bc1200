//! Move resolution: clearing matches, specials, moss damage, gravity and cascades.
//!
//! This is the minimal rule set the simulator needs to play a level through.
//! Tiles never fall through moss: each column is split into segments at
//! blockers, and every segment refills from its own top cell.

use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use super::matching::find_all_matches;
use super::spawn::TileSampler;
use super::types::{Blocker, Board, Cell, Match, SpecialType, Tile, TileType};

/// Safety cap on cascade rounds within one move.
pub const MAX_CASCADE_ROUNDS: usize = 50;

/// What a single clearing pass did to the board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearOutcome {
    pub tiles_cleared: usize,
    pub cleared_by_kind: BTreeMap<TileType, usize>,
    pub moss_layers_removed: usize,
    pub moss_cells_cleared: usize,
    pub specials_created: usize,
    pub specials_triggered: usize,
}

impl ClearOutcome {
    pub fn cleared_of(&self, kind: TileType) -> usize {
        self.cleared_by_kind.get(&kind).copied().unwrap_or(0)
    }

    fn absorb(&mut self, other: &ClearOutcome) {
        self.tiles_cleared += other.tiles_cleared;
        for (kind, n) in &other.cleared_by_kind {
            *self.cleared_by_kind.entry(*kind).or_insert(0) += n;
        }
        self.moss_layers_removed += other.moss_layers_removed;
        self.moss_cells_cleared += other.moss_cells_cleared;
        self.specials_created += other.specials_created;
        self.specials_triggered += other.specials_triggered;
    }
}

/// Totals for a full move including every cascade round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveOutcome {
    pub clear: ClearOutcome,
    /// Rounds of matching after the first one.
    pub cascades: usize,
}

/// Where a special from `m` is placed: the swapped cell if it is part of the
/// run, otherwise the middle of the run.
fn special_anchor(m: &Match, swap_cells: &[Cell]) -> Cell {
    swap_cells
        .iter()
        .copied()
        .find(|c| m.contains(*c))
        .unwrap_or(m.cells[m.cells.len() / 2])
}

/// Cells hit by a special going off at `cell`.
fn special_area(board: &Board, cell: Cell, special: SpecialType) -> Vec<Cell> {
    match special {
        SpecialType::Whirl => (0..board.cols).map(|col| Cell::new(cell.row, col)).collect(),
        SpecialType::Lantern => {
            let mut area = Vec::with_capacity(9);
            for row in cell.row.saturating_sub(1)..=(cell.row + 1).min(board.rows - 1) {
                for col in cell.col.saturating_sub(1)..=(cell.col + 1).min(board.cols - 1) {
                    area.push(Cell::new(row, col));
                }
            }
            area
        }
    }
}

/// Clear one set of matches without refilling.
///
/// `swap_cells` decides where new specials land. Specials caught in the clear
/// go off and can chain into each other. Moss loses at most one layer per pass.
pub fn clear_matches(board: &mut Board, matches: &[Match], swap_cells: &[Cell]) -> ClearOutcome {
    let mut outcome = ClearOutcome::default();
    if matches.is_empty() {
        return outcome;
    }

    let mut to_clear: BTreeSet<Cell> = matches.iter().flat_map(|m| m.cells.iter().copied()).collect();

    let mut created: BTreeMap<Cell, Tile> = BTreeMap::new();
    for m in matches {
        if let Some(special) = m.special_type {
            let anchor = special_anchor(m, swap_cells);
            let upgrade = match created.get(&anchor).and_then(|t| t.special) {
                Some(SpecialType::Lantern) => SpecialType::Lantern,
                _ => special,
            };
            created.insert(anchor, Tile::with_special(m.tile_type, upgrade));
        }
    }

    // Trigger specials caught in the clear, chaining through area effects.
    let mut hit_moss: BTreeSet<Cell> = BTreeSet::new();
    let mut pending: Vec<Cell> = to_clear.iter().copied().collect();
    let mut triggered: BTreeSet<Cell> = BTreeSet::new();
    while let Some(cell) = pending.pop() {
        let Some(special) = board.tile(cell).and_then(|t| t.special) else {
            continue;
        };
        if !triggered.insert(cell) {
            continue;
        }
        for hit in special_area(board, cell, special) {
            if board.is_blocked(hit) {
                hit_moss.insert(hit);
            } else if board.tile(hit).is_some() && to_clear.insert(hit) {
                pending.push(hit);
            }
        }
    }
    outcome.specials_triggered = triggered.len();

    for &cell in &to_clear {
        if let Some(tile) = board.tile(cell) {
            outcome.tiles_cleared += 1;
            *outcome.cleared_by_kind.entry(tile.kind).or_insert(0) += 1;
        }
        board.set_tile(cell, None);
        for n in board.neighbors4(cell) {
            if board.is_blocked(n) {
                hit_moss.insert(n);
            }
        }
    }

    for cell in hit_moss {
        if let Some(Blocker::Moss { layers }) = board.blocker(cell) {
            outcome.moss_layers_removed += 1;
            if layers <= 1 {
                board.set_blocker(cell, None);
                outcome.moss_cells_cleared += 1;
            } else {
                board.set_blocker(cell, Some(Blocker::Moss { layers: layers - 1 }));
            }
        }
    }

    for (cell, tile) in created {
        board.set_tile(cell, Some(tile));
        outcome.specials_created += 1;
    }

    outcome
}

/// Drop tiles down within blocker-separated column segments and refill the gaps.
pub fn apply_gravity<R: Rng>(board: &mut Board, sampler: &TileSampler, rng: &mut R) {
    for col in 0..board.cols {
        let mut bottom = board.rows;
        while bottom > 0 {
            // Segment is rows [top, bottom).
            let mut top = bottom;
            while top > 0 && !board.is_blocked(Cell::new(top - 1, col)) {
                top -= 1;
            }

            let tiles: Vec<Tile> = (top..bottom)
                .rev()
                .filter_map(|row| board.tile(Cell::new(row, col)))
                .collect();
            let mut row = bottom;
            for tile in tiles {
                row -= 1;
                board.set_tile(Cell::new(row, col), Some(tile));
            }
            while row > top {
                row -= 1;
                board.set_tile(Cell::new(row, col), Some(Tile::new(sampler.sample(rng))));
            }

            // Skip over the blocker run above this segment.
            bottom = top;
            while bottom > 0 && board.is_blocked(Cell::new(bottom - 1, col)) {
                bottom -= 1;
            }
        }
    }
}

/// Resolve a move: clear, drop, refill and repeat until the board is stable.
pub fn resolve_board<R: Rng>(
    board: &mut Board,
    swap_cells: &[Cell],
    sampler: &TileSampler,
    rng: &mut R,
) -> MoveOutcome {
    let mut outcome = MoveOutcome::default();
    let mut anchors = swap_cells;
    for round in 0..MAX_CASCADE_ROUNDS {
        let matches = find_all_matches(board);
        if matches.is_empty() {
            break;
        }
        let step = clear_matches(board, &matches, anchors);
        outcome.clear.absorb(&step);
        if round > 0 {
            outcome.cascades += 1;
        }
        apply_gravity(board, sampler, rng);
        anchors = &swap_cells[..0];
    }
    outcome
}
