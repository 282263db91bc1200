//! Static difficulty estimate of a level blueprint.
//!
//! Five factors, each in [0, 1] with higher meaning harder, are blended and
//! mapped onto the 1-10 scale the config phases use for their targets.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::balance::config::BalanceConfigManager;
use crate::balance::constants::{DENSITY_CAP, LARGE_BOARD, SMALL_BOARD};
use crate::balance::formulas::BalanceFormulas;
use crate::level::types::{GoalType, LevelDef};

// =============================================================================
// FACTOR WEIGHTS
// =============================================================================

pub const MOVE_PRESSURE_WEIGHT: f64 = 0.35;
pub const BOARD_COMPLEXITY_WEIGHT: f64 = 0.20;
pub const GOAL_DIFFICULTY_WEIGHT: f64 = 0.20;
pub const CASCADE_POTENTIAL_WEIGHT: f64 = 0.15;
pub const SPECIAL_RELIABILITY_WEIGHT: f64 = 0.10;

/// Scores further than this from the phase target raise a warning.
pub const TARGET_TOLERANCE: f64 = 2.0;

/// Batch outliers sit more than this many standard deviations from the mean.
pub const OUTLIER_Z: f64 = 2.0;

/// Individual factor values at or above this are called out.
const EXTREME_FACTOR: f64 = 0.9;

/// Per-factor difficulty, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyFactors {
    /// 1 minus the estimated win rate for the move budget.
    pub move_pressure: f64,
    /// Moss coverage relative to the cap, heavier for thick moss.
    pub board_complexity: f64,
    /// Goal type weight times goal size against the level's baseline.
    pub goal_difficulty: f64,
    /// Fewer open cells, more kinds and smaller boards mean fewer cascades.
    pub cascade_potential: f64,
    /// How hard it is to line up four or five of a kind.
    pub special_reliability: f64,
}

impl DifficultyFactors {
    pub fn weighted_sum(&self) -> f64 {
        self.move_pressure * MOVE_PRESSURE_WEIGHT
            + self.board_complexity * BOARD_COMPLEXITY_WEIGHT
            + self.goal_difficulty * GOAL_DIFFICULTY_WEIGHT
            + self.cascade_potential * CASCADE_POTENTIAL_WEIGHT
            + self.special_reliability * SPECIAL_RELIABILITY_WEIGHT
    }
}

/// Estimate for one level against its phase target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyBreakdown {
    pub level: u32,
    pub score: f64,
    pub factors: DifficultyFactors,
    pub phase: String,
    pub target_difficulty: f64,
    pub warnings: Vec<String>,
}

/// Summary over a batch of levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorReport {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Levels with at least one warning.
    pub levels_with_warnings: Vec<u32>,
    /// Levels whose score has |z| above `OUTLIER_Z`.
    pub outliers: Vec<u32>,
    pub breakdowns: Vec<DifficultyBreakdown>,
}

fn goal_type_weight(goal_type: GoalType) -> f64 {
    match goal_type {
        GoalType::Collect => 0.4,
        GoalType::ClearMoss => 0.7,
        GoalType::Combo => 1.0,
    }
}

/// Scores level blueprints without playing them.
#[derive(Debug, Clone)]
pub struct DifficultyEstimator {
    config: Arc<BalanceConfigManager>,
}

impl Default for DifficultyEstimator {
    fn default() -> Self {
        Self::new(Arc::new(BalanceConfigManager::default()))
    }
}

impl DifficultyEstimator {
    pub fn new(config: Arc<BalanceConfigManager>) -> Self {
        Self { config }
    }

    /// Formulas over the current config constants.
    pub fn formulas(&self) -> BalanceFormulas {
        self.config.formulas()
    }

    pub fn factors(&self, def: &LevelDef) -> DifficultyFactors {
        let formulas = self.formulas();
        let cells = def.board_size.cell_count().max(1) as f64;
        let closed = def.blockers.cells.len() as f64 / cells;
        let open = 1.0 - closed;
        let kinds_term = ((def.tile_kinds() as f64 - 3.0) / 3.0).clamp(0.0, 1.0);
        let size_term = {
            let small = (SMALL_BOARD * SMALL_BOARD) as f64;
            let large = (LARGE_BOARD * LARGE_BOARD) as f64;
            (1.0 - (cells - small) / (large - small)).clamp(0.0, 1.0)
        };

        let move_pressure = 1.0 - formulas.estimate_win_rate(def.moves, def.goal_total());

        let thickness = 1.0 + 0.25 * f64::from(def.blockers.layers.max(1) - 1);
        let board_complexity = (closed / DENSITY_CAP * thickness).clamp(0.0, 1.0);

        let baseline = formulas.calculate_goal_count(def.level_index, Some(GoalType::Collect)) as f64;
        let size_ratio = (def.goal_total() as f64 / baseline.max(1.0)).clamp(0.5, 1.5);
        let goal_difficulty =
            (goal_type_weight(def.primary_goal_type()) * size_ratio / 1.5).clamp(0.0, 1.0);

        let cascade_potential =
            (0.5 * kinds_term + 0.3 * (closed / DENSITY_CAP).min(1.0) + 0.2 * size_term).clamp(0.0, 1.0);

        let ease = 0.6 * (1.0 - kinds_term) + 0.4 * open;
        let special_reliability = (1.0 - ease).clamp(0.0, 1.0);

        DifficultyFactors {
            move_pressure,
            board_complexity,
            goal_difficulty,
            cascade_potential,
            special_reliability,
        }
    }

    /// Difficulty on the 1-10 scale.
    pub fn estimate(&self, def: &LevelDef) -> f64 {
        Self::score_from(&self.factors(def))
    }

    fn score_from(factors: &DifficultyFactors) -> f64 {
        (1.0 + 9.0 * factors.weighted_sum()).clamp(1.0, 10.0)
    }

    /// Score, factors and phase fit, with warnings.
    pub fn analyze_level(&self, def: &LevelDef) -> DifficultyBreakdown {
        let factors = self.factors(def);
        let score = Self::score_from(&factors);
        let phase = self.config.get_phase(def.level_index);

        let mut warnings = Vec::new();
        if (score - phase.target_difficulty).abs() > TARGET_TOLERANCE {
            warnings.push(format!(
                "score {score:.1} is far from the {} target {:.1}",
                phase.name, phase.target_difficulty
            ));
        }
        if factors.move_pressure >= EXTREME_FACTOR {
            warnings.push("move budget is extremely tight".to_string());
        }
        if factors.board_complexity >= EXTREME_FACTOR {
            warnings.push("board is close to fully mossed".to_string());
        }
        if factors.goal_difficulty >= EXTREME_FACTOR {
            warnings.push("goal is unusually demanding".to_string());
        }

        DifficultyBreakdown {
            level: def.level_index,
            score,
            factors,
            phase: phase.name,
            target_difficulty: phase.target_difficulty,
            warnings,
        }
    }

    /// True if the score is within `tolerance` of the level's phase target.
    pub fn is_in_target_range(&self, def: &LevelDef, tolerance: f64) -> bool {
        let target = self.config.get_phase(def.level_index).target_difficulty;
        (self.estimate(def) - target).abs() <= tolerance
    }

    pub fn evaluate_all(&self, defs: &[LevelDef]) -> Vec<DifficultyBreakdown> {
        defs.iter().map(|d| self.analyze_level(d)).collect()
    }

    /// Batch statistics and outliers.
    pub fn generate_report(&self, defs: &[LevelDef]) -> EstimatorReport {
        let breakdowns = self.evaluate_all(defs);
        let scores: Vec<f64> = breakdowns.iter().map(|b| b.score).collect();
        let count = scores.len();
        let mean = if count == 0 {
            0.0
        } else {
            scores.iter().sum::<f64>() / count as f64
        };
        let std_dev = if count == 0 {
            0.0
        } else {
            (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64).sqrt()
        };
        let outliers = if std_dev > 0.0 {
            breakdowns
                .iter()
                .filter(|b| ((b.score - mean) / std_dev).abs() > OUTLIER_Z)
                .map(|b| b.level)
                .collect()
        } else {
            Vec::new()
        };
        let (min, max) = if count == 0 {
            (0.0, 0.0)
        } else {
            scores
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)))
        };
        EstimatorReport {
            count,
            mean,
            std_dev,
            min,
            max,
            levels_with_warnings: breakdowns
                .iter()
                .filter(|b| !b.warnings.is_empty())
                .map(|b| b.level)
                .collect(),
            outliers,
            breakdowns,
        }
    }
}
