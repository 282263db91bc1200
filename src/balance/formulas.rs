//! Difficulty curves: moves, goals, density, win-rate estimate and level gating.
//!
//! Every output is clamped to the compiled bounds in `constants`, whatever the
//! level or the tunable constants say.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::config::BalanceConfig;
use super::constants::*;
use crate::board::spawn::TileWeights;
use crate::board::types::{BoardSize, TileType};
use crate::level::types::{BlockerPattern, GoalType};

/// Names of the tunable constants, as they appear in config JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantKey {
    MovesBase,
    MovesDecayPerLevel,
    MovesVarietyAmplitude,
    MovesVarietyPeriod,
    GoalBase,
    GoalGrowthPerLevel,
    DensityScale,
    ExpectedPerMove,
    GoalWeightBoost,
    WinRateSteepness,
    BossInterval,
    BossMovesFactor,
    BossDensityFactor,
}

impl ConstantKey {
    pub const ALL: [ConstantKey; 13] = [
        ConstantKey::MovesBase,
        ConstantKey::MovesDecayPerLevel,
        ConstantKey::MovesVarietyAmplitude,
        ConstantKey::MovesVarietyPeriod,
        ConstantKey::GoalBase,
        ConstantKey::GoalGrowthPerLevel,
        ConstantKey::DensityScale,
        ConstantKey::ExpectedPerMove,
        ConstantKey::GoalWeightBoost,
        ConstantKey::WinRateSteepness,
        ConstantKey::BossInterval,
        ConstantKey::BossMovesFactor,
        ConstantKey::BossDensityFactor,
    ];
}

/// Tunable curve parameters. Live-ops patches override these; the compiled
/// bounds still apply on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConstants {
    pub moves_base: f64,
    pub moves_decay_per_level: f64,
    pub moves_variety_amplitude: f64,
    pub moves_variety_period: f64,
    pub goal_base: f64,
    pub goal_growth_per_level: f64,
    pub density_scale: f64,
    pub expected_per_move: f64,
    pub goal_weight_boost: f64,
    pub win_rate_steepness: f64,
    pub boss_interval: f64,
    pub boss_moves_factor: f64,
    pub boss_density_factor: f64,
}

impl Default for BalanceConstants {
    fn default() -> Self {
        Self {
            moves_base: MOVES_BASE,
            moves_decay_per_level: MOVES_DECAY_PER_LEVEL,
            moves_variety_amplitude: MOVES_VARIETY_AMPLITUDE,
            moves_variety_period: MOVES_VARIETY_PERIOD,
            goal_base: GOAL_BASE,
            goal_growth_per_level: GOAL_GROWTH_PER_LEVEL,
            density_scale: DENSITY_SCALE,
            expected_per_move: EXPECTED_PER_MOVE,
            goal_weight_boost: GOAL_WEIGHT_BOOST,
            win_rate_steepness: WIN_RATE_STEEPNESS,
            boss_interval: BOSS_INTERVAL as f64,
            boss_moves_factor: BOSS_MOVES_FACTOR,
            boss_density_factor: BOSS_DENSITY_FACTOR,
        }
    }
}

impl BalanceConstants {
    pub fn get(&self, key: ConstantKey) -> f64 {
        match key {
            ConstantKey::MovesBase => self.moves_base,
            ConstantKey::MovesDecayPerLevel => self.moves_decay_per_level,
            ConstantKey::MovesVarietyAmplitude => self.moves_variety_amplitude,
            ConstantKey::MovesVarietyPeriod => self.moves_variety_period,
            ConstantKey::GoalBase => self.goal_base,
            ConstantKey::GoalGrowthPerLevel => self.goal_growth_per_level,
            ConstantKey::DensityScale => self.density_scale,
            ConstantKey::ExpectedPerMove => self.expected_per_move,
            ConstantKey::GoalWeightBoost => self.goal_weight_boost,
            ConstantKey::WinRateSteepness => self.win_rate_steepness,
            ConstantKey::BossInterval => self.boss_interval,
            ConstantKey::BossMovesFactor => self.boss_moves_factor,
            ConstantKey::BossDensityFactor => self.boss_density_factor,
        }
    }

    pub fn set(&mut self, key: ConstantKey, value: f64) {
        let slot = match key {
            ConstantKey::MovesBase => &mut self.moves_base,
            ConstantKey::MovesDecayPerLevel => &mut self.moves_decay_per_level,
            ConstantKey::MovesVarietyAmplitude => &mut self.moves_variety_amplitude,
            ConstantKey::MovesVarietyPeriod => &mut self.moves_variety_period,
            ConstantKey::GoalBase => &mut self.goal_base,
            ConstantKey::GoalGrowthPerLevel => &mut self.goal_growth_per_level,
            ConstantKey::DensityScale => &mut self.density_scale,
            ConstantKey::ExpectedPerMove => &mut self.expected_per_move,
            ConstantKey::GoalWeightBoost => &mut self.goal_weight_boost,
            ConstantKey::WinRateSteepness => &mut self.win_rate_steepness,
            ConstantKey::BossInterval => &mut self.boss_interval,
            ConstantKey::BossMovesFactor => &mut self.boss_moves_factor,
            ConstantKey::BossDensityFactor => &mut self.boss_density_factor,
        };
        *slot = value;
    }
}

/// Acceptable observed win-rate band for a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinRateTarget {
    pub min: f64,
    pub max: f64,
}

/// Result of one corrective nudge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelAdjustment {
    pub moves: u32,
    pub density: f64,
}

/// Suggested numbers for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    pub level: u32,
    pub moves: u32,
    pub goal_count: u32,
    pub density: f64,
    pub board_size: BoardSize,
    pub is_boss: bool,
    pub estimated_win_rate: f64,
}

/// Outcome of `validate_level_params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Pure difficulty curves over a set of tunable constants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceFormulas {
    constants: BalanceConstants,
}

impl BalanceFormulas {
    pub fn new(constants: BalanceConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &BalanceConstants {
        &self.constants
    }

    /// Moves for a level: decaying base plus a periodic variety term.
    pub fn calculate_moves(&self, level: u32) -> u32 {
        let c = &self.constants;
        let level = level.max(1) as f64;
        let period = finite_or(c.moves_variety_period, MOVES_VARIETY_PERIOD).max(1.0);
        let variety = c.moves_variety_amplitude * (std::f64::consts::TAU * level / period).sin();
        let raw = c.moves_base - c.moves_decay_per_level * (level - 1.0) + variety;
        let raw = finite_or(raw, MOVES_BASE).round();
        raw.clamp(MOVES_MIN as f64, MOVES_MAX as f64) as u32
    }

    fn goal_multiplier(goal_type: Option<GoalType>) -> f64 {
        match goal_type {
            None | Some(GoalType::Collect) => COLLECT_GOAL_MULTIPLIER,
            Some(GoalType::ClearMoss) => CLEAR_MOSS_GOAL_MULTIPLIER,
            Some(GoalType::Combo) => COMBO_GOAL_MULTIPLIER,
        }
    }

    /// Goal size for a level, scaled by goal type.
    pub fn calculate_goal_count(&self, level: u32, goal_type: Option<GoalType>) -> u32 {
        let c = &self.constants;
        let level = level.max(1) as f64;
        let raw = (c.goal_base + c.goal_growth_per_level * (level - 1.0))
            * Self::goal_multiplier(goal_type);
        let raw = finite_or(raw, GOAL_BASE).round();
        raw.clamp(GOAL_MIN as f64, GOAL_MAX as f64) as u32
    }

    /// Blocker density: rises with level and saturates at `DENSITY_CAP`.
    pub fn calculate_density(&self, level: u32) -> f64 {
        let scale = finite_or(self.constants.density_scale, DENSITY_SCALE).max(1.0);
        let raw = DENSITY_CAP * (1.0 - (-(level as f64) / scale).exp());
        finite_or(raw, 0.0).clamp(0.0, DENSITY_CAP)
    }

    /// Estimated win rate for a moves/goal pair.
    ///
    /// 0.5 when `moves * expected_per_move * goal_weight_boost == goal`,
    /// monotonic in moves, never exactly 0 or 1.
    pub fn estimate_win_rate(&self, moves: u32, goal: u32) -> f64 {
        let c = &self.constants;
        if goal == 0 {
            return WIN_RATE_CEILING;
        }
        let capacity = moves as f64 * c.expected_per_move * c.goal_weight_boost;
        let ratio = capacity / goal as f64;
        let k = finite_or(c.win_rate_steepness, WIN_RATE_STEEPNESS).max(0.1);
        let p = if ratio <= 0.0 {
            0.0
        } else {
            let rk = ratio.powf(k);
            rk / (1.0 + rk)
        };
        finite_or(p, 0.5).clamp(WIN_RATE_FLOOR, WIN_RATE_CEILING)
    }

    /// Blocker pattern for a level. Low levels only see gentle shapes.
    pub fn select_pattern<R: Rng>(&self, level: u32, rng: &mut R) -> BlockerPattern {
        let candidates: &[BlockerPattern] = if level < ADVANCED_PATTERN_LEVEL {
            &BlockerPattern::ALL[..2]
        } else if level < ALL_PATTERNS_LEVEL {
            &BlockerPattern::ALL[..5]
        } else {
            &BlockerPattern::ALL
        };
        candidates[rng.gen_range(0..candidates.len())]
    }

    /// Goal type for a level. Collect only at first, combos last.
    pub fn select_goal_type<R: Rng>(&self, level: u32, rng: &mut R) -> GoalType {
        let candidates: &[GoalType] = if level < CLEAR_MOSS_UNLOCK_LEVEL {
            &[GoalType::Collect]
        } else if level < COMBO_UNLOCK_LEVEL {
            &[GoalType::Collect, GoalType::ClearMoss]
        } else {
            &[GoalType::Collect, GoalType::ClearMoss, GoalType::Combo]
        };
        candidates[rng.gen_range(0..candidates.len())]
    }

    /// Goal item for a level, drawn from the kinds that can spawn.
    pub fn select_goal_item<R: Rng>(&self, level: u32, rng: &mut R) -> TileType {
        let pool = if level < SIXTH_KIND_LEVEL { 4 } else { Self::tile_kinds_for_level(level) };
        TileType::ALL[rng.gen_range(0..pool)]
    }

    /// Number of tile kinds in play at a level.
    pub fn tile_kinds_for_level(level: u32) -> usize {
        if level < SIXTH_KIND_LEVEL {
            5
        } else {
            6
        }
    }

    /// Board dimensions for a level.
    pub fn board_size_for_level(level: u32) -> BoardSize {
        if level <= SMALL_BOARD_MAX_LEVEL {
            BoardSize::square(SMALL_BOARD)
        } else if level <= MEDIUM_BOARD_MAX_LEVEL {
            BoardSize::square(MEDIUM_BOARD)
        } else {
            BoardSize::square(LARGE_BOARD)
        }
    }

    /// Spawn weights for the kinds in play, boosting the goal item.
    pub fn calculate_tile_weights(&self, level: u32, goal_item: Option<TileType>) -> TileWeights {
        let boost = finite_or(self.constants.goal_weight_boost, GOAL_WEIGHT_BOOST).clamp(1.0, 3.0);
        TileType::ALL[..Self::tile_kinds_for_level(level)]
            .iter()
            .map(|&kind| {
                let w = if Some(kind) == goal_item { boost } else { 1.0 };
                (kind, w)
            })
            .collect()
    }

    fn boss_interval(&self) -> u32 {
        let interval = finite_or(self.constants.boss_interval, BOSS_INTERVAL as f64).round();
        interval.max(1.0) as u32
    }

    pub fn is_boss_level(&self, level: u32) -> bool {
        level > 0 && level % self.boss_interval() == 0
    }

    /// Fewer moves and more moss for boss levels, kept within bounds.
    pub fn apply_boss_modifier(&self, moves: u32, density: f64) -> (u32, f64) {
        let c = &self.constants;
        let moves_factor = finite_or(c.boss_moves_factor, BOSS_MOVES_FACTOR).clamp(0.0, 1.0);
        let density_factor = finite_or(c.boss_density_factor, BOSS_DENSITY_FACTOR).max(1.0);
        let boss_moves = (moves as f64 * moves_factor).round() as u32;
        (
            boss_moves.clamp(MOVES_MIN, MOVES_MAX),
            (finite_or(density, 0.0) * density_factor).clamp(0.0, DENSITY_CAP),
        )
    }

    /// More moves and thinner moss for configured easy levels.
    pub fn apply_easy_modifier(&self, moves: u32, density: f64) -> (u32, f64) {
        let easy_moves = (moves as f64 * EASY_MOVES_FACTOR).round() as u32;
        (
            easy_moves.clamp(MOVES_MIN, MOVES_MAX),
            (finite_or(density, 0.0) * EASY_DENSITY_FACTOR).clamp(0.0, DENSITY_CAP),
        )
    }

    /// One corrective nudge toward the target band. No-op inside the band.
    pub fn adjust_for_win_rate(
        &self,
        moves: u32,
        density: f64,
        observed: f64,
        target: WinRateTarget,
    ) -> LevelAdjustment {
        let density = finite_or(density, 0.0).clamp(0.0, DENSITY_CAP);
        let moves = moves.clamp(MOVES_MIN, MOVES_MAX);
        if observed < target.min {
            LevelAdjustment {
                moves: (moves + ADJUST_MOVES_STEP).min(MOVES_MAX),
                density: (density * (1.0 - ADJUST_DENSITY_STEP)).clamp(0.0, DENSITY_CAP),
            }
        } else if observed > target.max {
            LevelAdjustment {
                moves: moves.saturating_sub(ADJUST_MOVES_STEP).max(MOVES_MIN),
                density: (density * (1.0 + ADJUST_DENSITY_STEP)).clamp(0.0, DENSITY_CAP),
            }
        } else {
            LevelAdjustment { moves, density }
        }
    }

    /// Deterministic parameter suggestion for a level (collect goal, boss rules applied).
    pub fn suggest_level_params(&self, level: u32) -> LevelParams {
        let level = level.max(1);
        let mut moves = self.calculate_moves(level);
        let mut density = self.calculate_density(level);
        let is_boss = self.is_boss_level(level);
        if is_boss {
            (moves, density) = self.apply_boss_modifier(moves, density);
        }
        let goal_count = self.calculate_goal_count(level, Some(GoalType::Collect));
        LevelParams {
            level,
            moves,
            goal_count,
            density,
            board_size: Self::board_size_for_level(level),
            is_boss,
            estimated_win_rate: self.estimate_win_rate(moves, goal_count),
        }
    }

    /// Suggestions for every level in `start..=end`.
    pub fn generate_level_suggestions(&self, start: u32, end: u32) -> Vec<LevelParams> {
        (start.max(1)..=end)
            .map(|level| self.suggest_level_params(level))
            .collect()
    }

    /// Check hand-edited parameters against the compiled bounds.
    pub fn validate_level_params(params: &LevelParams) -> ParamValidation {
        let mut warnings = Vec::new();
        if params.moves < MOVES_MIN || params.moves > MOVES_MAX {
            warnings.push(format!(
                "moves {} outside [{MOVES_MIN}, {MOVES_MAX}]",
                params.moves
            ));
        }
        if !params.density.is_finite() || params.density < 0.0 || params.density > DENSITY_CAP {
            warnings.push(format!(
                "density {:.3} outside [0, {DENSITY_CAP}]",
                params.density
            ));
        }
        if params.goal_count < GOAL_MIN || params.goal_count > GOAL_MAX {
            warnings.push(format!(
                "goal count {} outside [{GOAL_MIN}, {GOAL_MAX}]",
                params.goal_count
            ));
        }
        ParamValidation {
            valid: warnings.is_empty(),
            warnings,
        }
    }
}

/// A full balance config built from the compiled defaults.
pub fn create_default_config() -> BalanceConfig {
    BalanceConfig::default()
}
