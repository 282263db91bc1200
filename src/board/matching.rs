//! Match finding: run detection, hypothetical swaps and move availability.
//!
//! Everything here is a pure function of the board. Empty slots and blockers
//! break runs.

use super::types::{Board, Cell, Match, Orientation, SpecialType, SwapAction, TileType};

/// Shortest run that counts as a match.
pub const MIN_MATCH_LENGTH: usize = 3;

/// Run length that creates a whirl.
pub const WHIRL_LENGTH: usize = 4;

/// Run length that creates a lantern.
pub const LANTERN_LENGTH: usize = 5;

/// Special created by a run of the given length, if any.
pub fn special_for_length(length: usize) -> Option<SpecialType> {
    if length >= LANTERN_LENGTH {
        Some(SpecialType::Lantern)
    } else if length == WHIRL_LENGTH {
        Some(SpecialType::Whirl)
    } else {
        None
    }
}

fn make_match(tile_type: TileType, cells: Vec<Cell>, orientation: Orientation) -> Match {
    let length = cells.len();
    let special_type = special_for_length(length);
    Match {
        tile_type,
        length,
        cells,
        orientation,
        is_special: special_type.is_some(),
        special_type,
    }
}

/// Scan one line of cells and push every run of 3+ into `out`.
fn scan_line(
    board: &Board,
    line: impl Iterator<Item = Cell>,
    orientation: Orientation,
    out: &mut Vec<Match>,
) {
    let mut run: Vec<Cell> = Vec::new();
    let mut run_kind: Option<TileType> = None;

    for cell in line {
        let kind = board.tile_type(cell);
        if kind.is_some() && kind == run_kind {
            run.push(cell);
            continue;
        }
        if let Some(k) = run_kind {
            if run.len() >= MIN_MATCH_LENGTH {
                out.push(make_match(k, std::mem::take(&mut run), orientation));
            }
        }
        run.clear();
        run_kind = kind;
        if kind.is_some() {
            run.push(cell);
        }
    }

    if let Some(k) = run_kind {
        if run.len() >= MIN_MATCH_LENGTH {
            out.push(make_match(k, run, orientation));
        }
    }
}

/// Find every horizontal and vertical run of three or more identical tiles.
///
/// Horizontal runs come first (top to bottom), then vertical runs (left to right).
/// An L or T shape is reported as two overlapping matches.
pub fn find_all_matches(board: &Board) -> Vec<Match> {
    let mut matches = Vec::new();
    for row in 0..board.rows {
        scan_line(
            board,
            (0..board.cols).map(|col| Cell::new(row, col)),
            Orientation::Horizontal,
            &mut matches,
        );
    }
    for col in 0..board.cols {
        scan_line(
            board,
            (0..board.rows).map(|row| Cell::new(row, col)),
            Orientation::Vertical,
            &mut matches,
        );
    }
    matches
}

/// Tile kind at `cell` as it would be after `swap` is performed.
fn kind_after_swap(board: &Board, swap: &SwapAction, cell: Cell) -> Option<TileType> {
    if cell == swap.from {
        board.tile_type(swap.to)
    } else if cell == swap.to {
        board.tile_type(swap.from)
    } else {
        board.tile_type(cell)
    }
}

/// Longest run through `cell` along one axis after the swap.
fn run_through(board: &Board, swap: &SwapAction, cell: Cell, orientation: Orientation) -> usize {
    let Some(kind) = kind_after_swap(board, swap, cell) else {
        return 0;
    };
    let same = |c: Cell| kind_after_swap(board, swap, c) == Some(kind);

    let mut length = 1;
    match orientation {
        Orientation::Horizontal => {
            let mut col = cell.col;
            while col > 0 && same(Cell::new(cell.row, col - 1)) {
                length += 1;
                col -= 1;
            }
            let mut col = cell.col;
            while col + 1 < board.cols && same(Cell::new(cell.row, col + 1)) {
                length += 1;
                col += 1;
            }
        }
        Orientation::Vertical => {
            let mut row = cell.row;
            while row > 0 && same(Cell::new(row - 1, cell.col)) {
                length += 1;
                row -= 1;
            }
            let mut row = cell.row;
            while row + 1 < board.rows && same(Cell::new(row + 1, cell.col)) {
                length += 1;
                row += 1;
            }
        }
    }
    length
}

/// Check whether a swap would produce a match, without touching the board.
///
/// Returns false for out-of-bounds or non-adjacent cells, and when either
/// cell holds no tile (blocked or empty).
pub fn would_swap_match(board: &Board, swap: &SwapAction) -> bool {
    if !board.in_bounds(swap.from) || !board.in_bounds(swap.to) || !swap.is_adjacent() {
        return false;
    }
    let (Some(a), Some(b)) = (board.tile_type(swap.from), board.tile_type(swap.to)) else {
        return false;
    };
    if a == b {
        return false;
    }
    [swap.from, swap.to].iter().any(|&cell| {
        run_through(board, swap, cell, Orientation::Horizontal) >= MIN_MATCH_LENGTH
            || run_through(board, swap, cell, Orientation::Vertical) >= MIN_MATCH_LENGTH
    })
}

/// Every right/down neighbour pair, in row-major scan order.
fn candidate_swaps(board: &Board) -> impl Iterator<Item = SwapAction> + '_ {
    board.cells().flat_map(move |cell| {
        let right = (cell.col + 1 < board.cols)
            .then(|| SwapAction::new(cell, Cell::new(cell.row, cell.col + 1)));
        let down = (cell.row + 1 < board.rows)
            .then(|| SwapAction::new(cell, Cell::new(cell.row + 1, cell.col)));
        right.into_iter().chain(down)
    })
}

/// True if at least one adjacent swap produces a match.
pub fn has_valid_move(board: &Board) -> bool {
    candidate_swaps(board).any(|swap| would_swap_match(board, &swap))
}

/// All match-producing swaps in row-major scan order (right before down).
pub fn find_valid_swaps(board: &Board) -> Vec<SwapAction> {
    candidate_swaps(board)
        .filter(|swap| would_swap_match(board, swap))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_of_three_is_plain() {
        let board = Board::from_rows(&["LLLF", "FBAM", "BAMF"]);
        let matches = find_all_matches(&board);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].length, 3);
        assert!(!matches[0].is_special);
        assert_eq!(matches[0].special_type, None);
        assert_eq!(matches[0].tile_type, TileType::Leaf);
    }

    #[test]
    fn test_run_of_four_is_whirl() {
        let board = Board::from_rows(&["FLLLL", "BAMFB"]);
        let matches = find_all_matches(&board);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_special);
        assert_eq!(matches[0].special_type, Some(SpecialType::Whirl));
    }

    #[test]
    fn test_run_of_five_is_lantern() {
        let board = Board::from_rows(&["B", "B", "B", "B", "B", "F"]);
        let matches = find_all_matches(&board);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].orientation, Orientation::Vertical);
        assert_eq!(matches[0].length, 5);
        assert_eq!(matches[0].special_type, Some(SpecialType::Lantern));
    }

    #[test]
    fn test_blockers_and_gaps_break_runs() {
        let board = Board::from_rows(&["LL#LL", "FF.FF"]);
        assert!(find_all_matches(&board).is_empty());
    }

    #[test]
    fn test_specials_match_by_kind() {
        let board = Board::from_rows(&["LlL", "FBA"]);
        assert_eq!(find_all_matches(&board).len(), 1);
    }

    #[test]
    fn test_would_swap_match_detects_horizontal() {
        // Swapping (1,2) up into row 0 completes LLL.
        let board = Board::from_rows(&["LLFA", "BMLP"]);
        let swap = SwapAction::new(Cell::new(0, 2), Cell::new(1, 2));
        assert!(would_swap_match(&board, &swap));
        // The board itself is untouched.
        assert_eq!(board.tile_type(Cell::new(0, 2)), Some(TileType::Flower));
    }

    #[test]
    fn test_would_swap_match_rejects_non_adjacent() {
        let board = Board::from_rows(&["LLFL", "BMAP"]);
        let diagonal = SwapAction::new(Cell::new(0, 2), Cell::new(1, 3));
        let far = SwapAction::new(Cell::new(0, 2), Cell::new(0, 0));
        let same = SwapAction::new(Cell::new(0, 2), Cell::new(0, 2));
        assert!(!would_swap_match(&board, &diagonal));
        assert!(!would_swap_match(&board, &far));
        assert!(!would_swap_match(&board, &same));
    }

    #[test]
    fn test_would_swap_match_rejects_blockers() {
        let board = Board::from_rows(&["LL#", "BML"]);
        let swap = SwapAction::new(Cell::new(0, 2), Cell::new(1, 2));
        assert!(!would_swap_match(&board, &swap));
    }

    #[test]
    fn test_has_valid_move() {
        let stuck = Board::from_rows(&["LFB", "MAP", "LFB"]);
        assert!(!has_valid_move(&stuck));
        assert!(find_valid_swaps(&stuck).is_empty());

        let open = Board::from_rows(&["LFL", "MLP", "ABM"]);
        assert!(has_valid_move(&open));
        let swaps = find_valid_swaps(&open);
        assert_eq!(swaps, vec![SwapAction::new(Cell::new(0, 1), Cell::new(1, 1))]);
    }
}
