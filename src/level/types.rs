//! Level blueprint and goal data structures.

use serde::{Deserialize, Serialize};

use crate::board::spawn::TileWeights;
use crate::board::types::{BoardSize, Cell, TileType};

/// Shapes a blocker layout can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerPattern {
    Scattered,
    Corners,
    EdgeRing,
    Diagonal,
    Cross,
    CenterBlob,
    Stripes,
}

impl BlockerPattern {
    pub const ALL: [BlockerPattern; 7] = [
        BlockerPattern::Scattered,
        BlockerPattern::Corners,
        BlockerPattern::EdgeRing,
        BlockerPattern::Diagonal,
        BlockerPattern::Cross,
        BlockerPattern::CenterBlob,
        BlockerPattern::Stripes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scattered => "Scattered",
            Self::Corners => "Corners",
            Self::EdgeRing => "Edge Ring",
            Self::Diagonal => "Diagonal",
            Self::Cross => "Cross",
            Self::CenterBlob => "Center Blob",
            Self::Stripes => "Stripes",
        }
    }
}

/// Goal categories, used for selection and scaling before counts are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Collect,
    ClearMoss,
    Combo,
}

/// Collect `count` tiles of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectGoal {
    pub item: TileType,
    pub count: u32,
    #[serde(default)]
    pub current: u32,
}

/// Clear `count` moss cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MossGoal {
    pub count: u32,
    #[serde(default)]
    pub current: u32,
}

/// A level objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Goal {
    Collect(CollectGoal),
    ClearMoss(MossGoal),
    Combo {
        collect: CollectGoal,
        clear_moss: MossGoal,
    },
}

impl Goal {
    pub fn goal_type(&self) -> GoalType {
        match self {
            Goal::Collect(_) => GoalType::Collect,
            Goal::ClearMoss(_) => GoalType::ClearMoss,
            Goal::Combo { .. } => GoalType::Combo,
        }
    }

    /// Tile kind this goal collects, if any.
    pub fn item(&self) -> Option<TileType> {
        match self {
            Goal::Collect(c) | Goal::Combo { collect: c, .. } => Some(c.item),
            Goal::ClearMoss(_) => None,
        }
    }

    /// Total units of progress required.
    pub fn total(&self) -> u32 {
        match self {
            Goal::Collect(c) => c.count,
            Goal::ClearMoss(m) => m.count,
            Goal::Combo {
                collect,
                clear_moss,
            } => collect.count + clear_moss.count,
        }
    }

    /// Units of progress made, never above `total()`.
    pub fn progress(&self) -> u32 {
        match self {
            Goal::Collect(c) => c.current.min(c.count),
            Goal::ClearMoss(m) => m.current.min(m.count),
            Goal::Combo {
                collect,
                clear_moss,
            } => collect.current.min(collect.count) + clear_moss.current.min(clear_moss.count),
        }
    }

    /// Remaining items of `kind` this goal still wants.
    pub fn remaining_of(&self, kind: TileType) -> u32 {
        match self {
            Goal::Collect(c) | Goal::Combo { collect: c, .. } if c.item == kind => {
                c.count.saturating_sub(c.current)
            }
            _ => 0,
        }
    }

    /// Remaining moss cells this goal still wants.
    pub fn remaining_moss(&self) -> u32 {
        match self {
            Goal::ClearMoss(m) | Goal::Combo { clear_moss: m, .. } => {
                m.count.saturating_sub(m.current)
            }
            Goal::Collect(_) => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress() >= self.total()
    }

    pub fn record_collected(&mut self, kind: TileType, n: u32) {
        match self {
            Goal::Collect(c) | Goal::Combo { collect: c, .. } if c.item == kind => {
                c.current = c.current.saturating_add(n);
            }
            _ => {}
        }
    }

    pub fn record_moss_cleared(&mut self, n: u32) {
        if let Goal::ClearMoss(m) | Goal::Combo { clear_moss: m, .. } = self {
            m.current = m.current.saturating_add(n);
        }
    }

    /// Scale every count by `factor`, never below `floor`, resetting progress.
    pub fn scaled(&self, factor: f64, floor: u32) -> Goal {
        let scale = |count: u32| -> u32 {
            let scaled = (count as f64 * factor).round();
            (scaled.max(0.0) as u32).max(floor.min(count))
        };
        match *self {
            Goal::Collect(c) => Goal::Collect(CollectGoal {
                count: scale(c.count),
                current: 0,
                ..c
            }),
            Goal::ClearMoss(m) => Goal::ClearMoss(MossGoal {
                count: scale(m.count),
                current: 0,
            }),
            Goal::Combo {
                collect,
                clear_moss,
            } => Goal::Combo {
                collect: CollectGoal {
                    count: scale(collect.count),
                    current: 0,
                    ..collect
                },
                clear_moss: MossGoal {
                    count: scale(clear_moss.count),
                    current: 0,
                },
            },
        }
    }

    /// Cap any moss requirement at the number of moss cells available.
    pub fn cap_moss(&mut self, available: u32) {
        if let Goal::ClearMoss(m) | Goal::Combo { clear_moss: m, .. } = self {
            m.count = m.count.min(available);
        }
    }
}

/// Blocker placement for a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockerLayout {
    /// Target fraction of the board covered by moss.
    pub density: f64,
    /// Moss cells, in placement order.
    pub cells: Vec<Cell>,
    pub pattern: Option<BlockerPattern>,
    /// Hits needed to clear each moss cell.
    pub layers: u8,
}

impl BlockerLayout {
    pub fn empty() -> Self {
        Self {
            density: 0.0,
            cells: Vec::new(),
            pattern: None,
            layers: 1,
        }
    }
}

/// Immutable level blueprint, generated once per (level, player seed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub level_index: u32,
    /// RNG seed derived from (level_index, player seed); drives board fills.
    pub seed: u64,
    pub board_size: BoardSize,
    pub moves: u32,
    pub goals: Vec<Goal>,
    pub blockers: BlockerLayout,
    pub tile_weights: TileWeights,
    pub is_boss: bool,
}

impl LevelDef {
    /// Sum of all goal counts.
    pub fn goal_total(&self) -> u32 {
        self.goals.iter().map(Goal::total).sum()
    }

    /// The goal type of the primary (first) goal.
    pub fn primary_goal_type(&self) -> GoalType {
        self.goals
            .first()
            .map(Goal::goal_type)
            .unwrap_or(GoalType::Collect)
    }

    /// Actual moss coverage of the board.
    pub fn blocker_coverage(&self) -> f64 {
        let cells = self.board_size.cell_count();
        if cells == 0 {
            0.0
        } else {
            self.blockers.cells.len() as f64 / cells as f64
        }
    }

    /// Number of tile kinds that can spawn.
    pub fn tile_kinds(&self) -> usize {
        self.tile_weights.values().filter(|w| **w > 0.0).count()
    }
}
