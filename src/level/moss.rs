//! Moss placement shaped by a blocker pattern.
//!
//! Each pattern ranks cells by how well they fit the shape; ties are broken
//! with the seeded RNG, and the best-ranked cells are taken. When a shape has
//! fewer cells than requested, the next ranks spill over into nearby cells.

use rand::Rng;

use crate::balance::constants::DENSITY_CAP;
use crate::board::types::{BoardSize, Cell};
use crate::level::types::{BlockerLayout, BlockerPattern};

/// Places moss cells on a board of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MossGenerator {
    size: BoardSize,
}

impl MossGenerator {
    pub fn new(size: BoardSize) -> Self {
        Self { size }
    }

    /// Number of moss cells for a density, `round(density * cells)`.
    pub fn cell_count_for_density(&self, density: f64) -> usize {
        let density = if density.is_finite() {
            density.clamp(0.0, DENSITY_CAP)
        } else {
            0.0
        };
        (density * self.size.cell_count() as f64).round() as usize
    }

    /// Build a layout for `density`, shaped by `pattern`.
    pub fn layout<R: Rng>(
        &self,
        pattern: BlockerPattern,
        density: f64,
        layers: u8,
        rng: &mut R,
    ) -> BlockerLayout {
        let count = self.cell_count_for_density(density);
        BlockerLayout {
            density,
            cells: self.generate(pattern, count, rng),
            pattern: Some(pattern),
            layers: layers.max(1),
        }
    }

    /// Pick `count` distinct cells following the pattern.
    pub fn generate<R: Rng>(&self, pattern: BlockerPattern, count: usize, rng: &mut R) -> Vec<Cell> {
        let BoardSize { rows, cols } = self.size;
        let mut ranked: Vec<(usize, u32, Cell)> = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| Cell::new(row, col)))
            .map(|cell| (self.rank(pattern, cell), rng.gen::<u32>(), cell))
            .collect();
        ranked.sort_unstable_by_key(|&(rank, tie, cell)| (rank, tie, cell));
        ranked
            .into_iter()
            .take(count.min(rows * cols))
            .map(|(_, _, cell)| cell)
            .collect()
    }

    /// Lower rank = better fit for the shape.
    fn rank(&self, pattern: BlockerPattern, cell: Cell) -> usize {
        let BoardSize { rows, cols } = self.size;
        let (r, c) = (cell.row, cell.col);
        let from_top = r.min(rows - 1 - r);
        let from_side = c.min(cols - 1 - c);
        match pattern {
            BlockerPattern::Scattered => 0,
            BlockerPattern::Corners => from_top.max(from_side),
            BlockerPattern::EdgeRing => from_top.min(from_side),
            BlockerPattern::Diagonal => {
                let main = r.abs_diff(c);
                let anti = (r + c).abs_diff(cols - 1);
                main.min(anti)
            }
            BlockerPattern::Cross => r.abs_diff(rows / 2).min(c.abs_diff(cols / 2)),
            // Doubled coordinates keep even-sized boards symmetric.
            BlockerPattern::CenterBlob => (2 * r).abs_diff(rows - 1) + (2 * c).abs_diff(cols - 1),
            BlockerPattern::Stripes => match (r % 3 == 1, c % 2 == 0) {
                (true, true) => 0,
                (true, false) => 1,
                _ => 2,
            },
        }
    }
}
