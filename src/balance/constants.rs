//! Compiled balance bounds and curve defaults.
//!
//! Bounds (`*_MIN`, `*_MAX`, `*_CAP`) are hard limits every formula output is
//! clamped to. The remaining numbers are the defaults for the tunable
//! `BalanceConstants` a live config can override.

// =============================================================================
// MOVES
// =============================================================================

/// Fewest moves any level may grant.
pub const MOVES_MIN: u32 = 15;

/// Most moves any level may grant, including dynamic-difficulty bonuses.
pub const MOVES_MAX: u32 = 40;

/// Moves at level 1 before the variety term.
pub const MOVES_BASE: f64 = 30.0;

/// Moves removed per level.
pub const MOVES_DECAY_PER_LEVEL: f64 = 0.08;

/// Amplitude of the periodic variety term (in moves).
pub const MOVES_VARIETY_AMPLITUDE: f64 = 2.0;

/// Period of the variety term (in levels).
pub const MOVES_VARIETY_PERIOD: f64 = 7.0;

// =============================================================================
// GOALS
// =============================================================================

/// Smallest goal count the curve produces.
pub const GOAL_MIN: u32 = 10;

/// Largest goal count the curve produces.
pub const GOAL_MAX: u32 = 60;

/// Lowest a goal may be reduced to by dynamic difficulty.
pub const GOAL_FLOOR: u32 = 3;

/// Goal count at level 1.
pub const GOAL_BASE: f64 = 15.0;

/// Goal items added per level.
pub const GOAL_GROWTH_PER_LEVEL: f64 = 0.4;

/// Goal-type multipliers on the goal curve.
pub const COLLECT_GOAL_MULTIPLIER: f64 = 1.0;
pub const CLEAR_MOSS_GOAL_MULTIPLIER: f64 = 0.6;
pub const COMBO_GOAL_MULTIPLIER: f64 = 0.8;

/// A clear-moss goal needs at least this many moss cells.
pub const MIN_MOSS_CELLS_FOR_GOAL: usize = 4;

// =============================================================================
// BLOCKER DENSITY
// =============================================================================

/// Density never exceeds this fraction of the board.
pub const DENSITY_CAP: f64 = 0.35;

/// Levels over which density approaches the cap (e-folding scale).
pub const DENSITY_SCALE: f64 = 40.0;

/// From this level moss needs two hits.
pub const THICK_MOSS_LEVEL: u32 = 60;

// =============================================================================
// WIN RATE ESTIMATE
// =============================================================================

/// Goal progress one move is expected to make.
pub const EXPECTED_PER_MOVE: f64 = 1.0;

/// Spawn-weight multiplier for the goal item.
pub const GOAL_WEIGHT_BOOST: f64 = 1.5;

/// Steepness of the win-rate curve around the 50% point.
pub const WIN_RATE_STEEPNESS: f64 = 2.0;

/// Estimated win rates never reach 0 or 1.
pub const WIN_RATE_FLOOR: f64 = 0.01;
pub const WIN_RATE_CEILING: f64 = 0.99;

// =============================================================================
// BOSS & EVENT LEVELS
// =============================================================================

/// Every Nth level is a boss level.
pub const BOSS_INTERVAL: u32 = 10;

/// Boss levels get this fraction of the normal moves.
pub const BOSS_MOVES_FACTOR: f64 = 0.85;

/// Boss levels get this multiple of the normal density.
pub const BOSS_DENSITY_FACTOR: f64 = 1.25;

/// Configured easy levels get extra moves and thinner moss.
pub const EASY_MOVES_FACTOR: f64 = 1.2;
pub const EASY_DENSITY_FACTOR: f64 = 0.5;

// =============================================================================
// LEVEL GATING
// =============================================================================

/// Clear-moss goals unlock at this level.
pub const CLEAR_MOSS_UNLOCK_LEVEL: u32 = 5;

/// Combo goals unlock at this level.
pub const COMBO_UNLOCK_LEVEL: u32 = 15;

/// Edge ring, diagonal and cross patterns unlock at this level.
pub const ADVANCED_PATTERN_LEVEL: u32 = 10;

/// Every pattern is available from this level.
pub const ALL_PATTERNS_LEVEL: u32 = 30;

/// The sixth tile kind (and goal items beyond the first four) unlock here.
pub const SIXTH_KIND_LEVEL: u32 = 20;

/// Board edge length by level band.
pub const SMALL_BOARD_MAX_LEVEL: u32 = 10;
pub const MEDIUM_BOARD_MAX_LEVEL: u32 = 40;
pub const SMALL_BOARD: usize = 6;
pub const MEDIUM_BOARD: usize = 7;
pub const LARGE_BOARD: usize = 8;

// =============================================================================
// WIN-RATE CORRECTION
// =============================================================================

/// Moves added or removed by one corrective nudge.
pub const ADJUST_MOVES_STEP: u32 = 2;

/// Relative density change of one corrective nudge.
pub const ADJUST_DENSITY_STEP: f64 = 0.1;
