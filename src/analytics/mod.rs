//! Cohort analytics: per-level stats, difficulty spikes, balance issues and
//! tuning recommendations from recorded play sessions.

mod analyzer;
mod types;

pub use analyzer::{frustration_index, AnalyzerThresholds, LevelAnalyzer};
pub use types::{
    AnalyzerReport, BalanceIssue, DifficultySpike, IssueKind, LevelPlayData, LevelStats,
    PhaseStats, PlayResult, PlaySession, ProblematicLevel, Recommendation, Severity,
};
