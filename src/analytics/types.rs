//! Play records and the statistics derived from them.

use serde::{Deserialize, Serialize};

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayResult {
    Win,
    Lose,
    Quit,
}

/// One attempt at a level, as reported by a client or produced by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySession {
    pub level: u32,
    pub player_id: String,
    pub result: PlayResult,
    pub moves_used: u32,
    pub moves_total: u32,
    pub goal_progress: u32,
    pub goal_total: u32,
    pub duration_secs: f64,
    #[serde(default)]
    pub cascade_count: u32,
    #[serde(default)]
    pub shuffle_count: u32,
    #[serde(default)]
    pub specials_created: u32,
    #[serde(default)]
    pub specials_triggered: u32,
    /// Previous attempts at this level by the same player.
    #[serde(default)]
    pub retry_count: u32,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Name used by cohort analytics for the same record.
pub type LevelPlayData = PlaySession;

impl PlaySession {
    pub fn is_win(&self) -> bool {
        self.result == PlayResult::Win
    }

    /// Goal progress as a fraction in [0, 1].
    pub fn progress_fraction(&self) -> f64 {
        if self.goal_total == 0 {
            1.0
        } else {
            (self.goal_progress as f64 / self.goal_total as f64).clamp(0.0, 1.0)
        }
    }

    /// Fraction of the move budget left unused, in [0, 1].
    pub fn moves_left_fraction(&self) -> f64 {
        if self.moves_total == 0 {
            0.0
        } else {
            self.moves_total.saturating_sub(self.moves_used) as f64 / self.moves_total as f64
        }
    }
}

/// Aggregates for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: u32,
    pub attempts: u32,
    pub wins: u32,
    pub losses: u32,
    pub quits: u32,
    pub win_rate: f64,
    pub quit_rate: f64,
    pub avg_moves_used: f64,
    pub avg_duration_secs: f64,
    pub avg_retries: f64,
    /// Mean goal progress over losses and quits; 1.0 when nothing failed.
    pub avg_progress_at_failure: f64,
}

impl LevelStats {
    /// Fraction of attempts that did not win.
    pub fn loss_rate(&self) -> f64 {
        1.0 - self.win_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A level whose win rate drops sharply from the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultySpike {
    pub level: u32,
    pub previous_win_rate: f64,
    pub win_rate: f64,
    pub drop: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    TooHard,
    TooEasy,
    HighQuitRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceIssue {
    pub level: u32,
    pub kind: IssueKind,
    /// The observed rate that tripped the check.
    pub value: f64,
    pub threshold: f64,
}

/// Aggregates over every level of a config phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub name: String,
    pub start_level: u32,
    pub end_level: Option<u32>,
    pub target_difficulty: f64,
    pub levels_with_data: u32,
    pub attempts: u32,
    pub win_rate: f64,
    pub quit_rate: f64,
    pub avg_retries: f64,
}

/// A concrete tuning suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub level: u32,
    pub message: String,
    pub current_moves: u32,
    pub suggested_moves: u32,
    pub suggested_density: f64,
}

/// Level ranked by how much it frustrates players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblematicLevel {
    pub level: u32,
    pub frustration_index: f64,
    pub stats: LevelStats,
}

/// Everything the analyzer knows about a level range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerReport {
    pub start_level: u32,
    pub end_level: u32,
    pub total_plays: usize,
    pub level_stats: Vec<LevelStats>,
    pub spikes: Vec<DifficultySpike>,
    pub issues: Vec<BalanceIssue>,
    pub phase_stats: Vec<PhaseStats>,
    pub recommendations: Vec<Recommendation>,
}

impl AnalyzerReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
