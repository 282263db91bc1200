//! Board data structures: tiles, blockers, cells, swaps and matches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of tile that can spawn on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    Leaf,
    Flower,
    Berry,
    Mushroom,
    Acorn,
    Pebble,
}

impl TileType {
    pub const ALL: [TileType; 6] = [
        TileType::Leaf,
        TileType::Flower,
        TileType::Berry,
        TileType::Mushroom,
        TileType::Acorn,
        TileType::Pebble,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Leaf => "Leaf",
            Self::Flower => "Flower",
            Self::Berry => "Berry",
            Self::Mushroom => "Mushroom",
            Self::Acorn => "Acorn",
            Self::Pebble => "Pebble",
        }
    }

    /// Single-character glyph used by the text renderer.
    pub fn glyph(&self) -> char {
        match self {
            Self::Leaf => 'L',
            Self::Flower => 'F',
            Self::Berry => 'B',
            Self::Mushroom => 'M',
            Self::Acorn => 'A',
            Self::Pebble => 'P',
        }
    }
}

/// Special tile abilities created by long runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialType {
    /// Created from a run of 4. Clears its whole row when it goes off.
    Whirl,
    /// Created from a run of 5+. Clears a 3x3 area.
    Lantern,
}

/// A single tile sitting in a board slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialType>,
}

impl Tile {
    pub fn new(kind: TileType) -> Self {
        Self {
            kind,
            special: None,
        }
    }

    pub fn with_special(kind: TileType, special: SpecialType) -> Self {
        Self {
            kind,
            special: Some(special),
        }
    }

    pub fn is_special(&self) -> bool {
        self.special.is_some()
    }
}

/// Obstacles that occupy a slot instead of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Blocker {
    /// Loses one layer per adjacent clear. Never matched itself.
    Moss { layers: u8 },
}

impl Blocker {
    pub fn moss(layers: u8) -> Self {
        Blocker::Moss {
            layers: layers.max(1),
        }
    }
}

/// A board coordinate, row-major from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True if the two cells share an edge.
    pub fn is_adjacent(&self, other: &Cell) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One board position: a tile, a blocker, or nothing (transiently, mid-resolution).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub tile: Option<Tile>,
    pub blocker: Option<Blocker>,
}

/// Board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    pub rows: usize,
    pub cols: usize,
}

impl BoardSize {
    pub const fn square(n: usize) -> Self {
        Self { rows: n, cols: n }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// Fixed-size grid of slots, indexed as grid[row][col].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub rows: usize,
    pub cols: usize,
    pub grid: Vec<Vec<Slot>>,
}

impl Board {
    /// Create an empty board of the given size.
    pub fn new(size: BoardSize) -> Self {
        Self {
            rows: size.rows,
            cols: size.cols,
            grid: vec![vec![Slot::default(); size.cols]; size.rows],
        }
    }

    /// Build a board from text rows using the renderer's glyphs.
    /// Uppercase = plain tile, lowercase = whirl special, `#` = moss, anything else = empty.
    pub fn from_rows(rows: &[&str]) -> Self {
        let cols = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut board = Board::new(BoardSize {
            rows: rows.len(),
            cols,
        });
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let cell = Cell::new(row, col);
                if ch == '#' {
                    board.set_blocker(cell, Some(Blocker::moss(1)));
                    continue;
                }
                let kind = TileType::ALL
                    .iter()
                    .copied()
                    .find(|k| k.glyph() == ch.to_ascii_uppercase());
                if let Some(kind) = kind {
                    let tile = if ch.is_ascii_lowercase() {
                        Tile::with_special(kind, SpecialType::Whirl)
                    } else {
                        Tile::new(kind)
                    };
                    board.set_tile(cell, Some(tile));
                }
            }
        }
        board
    }

    pub fn size(&self) -> BoardSize {
        BoardSize {
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn slot(&self, cell: Cell) -> Option<&Slot> {
        self.grid.get(cell.row).and_then(|row| row.get(cell.col))
    }

    pub fn tile(&self, cell: Cell) -> Option<Tile> {
        self.slot(cell).and_then(|s| s.tile)
    }

    pub fn tile_type(&self, cell: Cell) -> Option<TileType> {
        self.tile(cell).map(|t| t.kind)
    }

    pub fn blocker(&self, cell: Cell) -> Option<Blocker> {
        self.slot(cell).and_then(|s| s.blocker)
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.blocker(cell).is_some()
    }

    pub fn set_tile(&mut self, cell: Cell, tile: Option<Tile>) {
        if let Some(slot) = self.grid.get_mut(cell.row).and_then(|r| r.get_mut(cell.col)) {
            slot.tile = tile;
        }
    }

    /// Place (or remove) a blocker. A blocked slot never holds a tile.
    pub fn set_blocker(&mut self, cell: Cell, blocker: Option<Blocker>) {
        if let Some(slot) = self.grid.get_mut(cell.row).and_then(|r| r.get_mut(cell.col)) {
            slot.blocker = blocker;
            if blocker.is_some() {
                slot.tile = None;
            }
        }
    }

    /// Exchange the tiles of two cells. Blockers stay in place.
    pub fn swap_tiles(&mut self, a: Cell, b: Cell) {
        let ta = self.tile(a);
        let tb = self.tile(b);
        self.set_tile(a, tb);
        self.set_tile(b, ta);
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell::new(row, col)))
    }

    /// Cells without a blocker.
    pub fn open_cells(&self) -> Vec<Cell> {
        self.cells().filter(|&c| !self.is_blocked(c)).collect()
    }

    pub fn blocker_cells(&self) -> Vec<Cell> {
        self.cells().filter(|&c| self.is_blocked(c)).collect()
    }

    /// Orthogonal neighbours inside the board.
    pub fn neighbors4(&self, cell: Cell) -> Vec<Cell> {
        let mut out = Vec::with_capacity(4);
        if cell.row > 0 {
            out.push(Cell::new(cell.row - 1, cell.col));
        }
        if cell.row + 1 < self.rows {
            out.push(Cell::new(cell.row + 1, cell.col));
        }
        if cell.col > 0 {
            out.push(Cell::new(cell.row, cell.col - 1));
        }
        if cell.col + 1 < self.cols {
            out.push(Cell::new(cell.row, cell.col + 1));
        }
        out
    }

    /// Number of tiles of the given kind currently on the board.
    pub fn count_kind(&self, kind: TileType) -> usize {
        self.cells()
            .filter(|&c| self.tile_type(c) == Some(kind))
            .count()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.grid {
            let line: String = row
                .iter()
                .map(|slot| match (slot.blocker, slot.tile) {
                    (Some(_), _) => '#',
                    (None, Some(tile)) if tile.is_special() => {
                        tile.kind.glyph().to_ascii_lowercase()
                    }
                    (None, Some(tile)) => tile.kind.glyph(),
                    (None, None) => '.',
                })
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// A player move: exchange the tiles at two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwapAction {
    pub from: Cell,
    pub to: Cell,
}

impl SwapAction {
    pub const fn new(from: Cell, to: Cell) -> Self {
        Self { from, to }
    }

    pub fn is_adjacent(&self) -> bool {
        self.from.is_adjacent(&self.to)
    }
}

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A run of three or more identical tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub tile_type: TileType,
    pub length: usize,
    pub cells: Vec<Cell>,
    pub orientation: Orientation,
    pub is_special: bool,
    pub special_type: Option<SpecialType>,
}

impl Match {
    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }
}
