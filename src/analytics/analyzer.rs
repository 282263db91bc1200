//! Offline cohort analytics over recorded play sessions.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use super::types::{
    AnalyzerReport, BalanceIssue, DifficultySpike, IssueKind, LevelStats, PlayResult, PlaySession,
    PhaseStats, ProblematicLevel, Recommendation, Severity,
};
use crate::balance::config::{BalanceConfigManager, PhaseKind};
use crate::balance::formulas::WinRateTarget;

/// Retries at which the retry term of the frustration index saturates.
const RETRY_SATURATION: f64 = 5.0;

/// Win-rate drops above these are Medium / High severity spikes.
const MEDIUM_SPIKE_DROP: f64 = 0.2;
const HIGH_SPIKE_DROP: f64 = 0.3;

/// Slack for comparing differences of win-rate ratios against thresholds.
const RATE_EPSILON: f64 = 1e-9;

/// Cut-offs for spike and issue detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerThresholds {
    /// Win-rate drop from the previous level that counts as a spike.
    pub spike_threshold: f64,
    /// Win rate below which a level is too hard.
    pub too_hard_win_rate: f64,
    /// Win rate above which a level is too easy.
    pub too_easy_win_rate: f64,
    /// Quit fraction above which players are giving up.
    pub high_quit_rate: f64,
    /// Levels with fewer attempts are ignored by spike and issue checks.
    pub min_attempts: u32,
}

impl Default for AnalyzerThresholds {
    fn default() -> Self {
        Self {
            spike_threshold: 0.15,
            too_hard_win_rate: 0.2,
            too_easy_win_rate: 0.9,
            high_quit_rate: 0.25,
            min_attempts: 5,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn stats_for(level: u32, sessions: &[PlaySession]) -> LevelStats {
    let attempts = sessions.len() as u32;
    let count = |r: PlayResult| sessions.iter().filter(|s| s.result == r).count() as u32;
    let (wins, losses, quits) = (count(PlayResult::Win), count(PlayResult::Lose), count(PlayResult::Quit));
    let total = attempts.max(1) as f64;
    let failures: Vec<&PlaySession> = sessions.iter().filter(|s| !s.is_win()).collect();
    LevelStats {
        level,
        attempts,
        wins,
        losses,
        quits,
        win_rate: wins as f64 / total,
        quit_rate: quits as f64 / total,
        avg_moves_used: mean(sessions.iter().map(|s| s.moves_used as f64)),
        avg_duration_secs: mean(sessions.iter().map(|s| s.duration_secs)),
        avg_retries: mean(sessions.iter().map(|s| s.retry_count as f64)),
        avg_progress_at_failure: if failures.is_empty() {
            1.0
        } else {
            mean(failures.iter().map(|s| s.progress_fraction()))
        },
    }
}

/// `0.5 * loss_rate + 0.3 * min(avg_retries / 5, 1) + 0.2 * (1 - progress at failure)`.
pub fn frustration_index(stats: &LevelStats) -> f64 {
    0.5 * stats.loss_rate()
        + 0.3 * (stats.avg_retries / RETRY_SATURATION).min(1.0)
        + 0.2 * (1.0 - stats.avg_progress_at_failure)
}

/// Collects play sessions and answers balance questions about them.
#[derive(Debug, Clone)]
pub struct LevelAnalyzer {
    config: Arc<BalanceConfigManager>,
    thresholds: AnalyzerThresholds,
    sessions: BTreeMap<u32, Vec<PlaySession>>,
}

impl Default for LevelAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(BalanceConfigManager::default()), AnalyzerThresholds::default())
    }
}

impl LevelAnalyzer {
    pub fn new(config: Arc<BalanceConfigManager>, thresholds: AnalyzerThresholds) -> Self {
        Self {
            config,
            thresholds,
            sessions: BTreeMap::new(),
        }
    }

    pub fn thresholds(&self) -> &AnalyzerThresholds {
        &self.thresholds
    }

    pub fn add_play_data(&mut self, record: PlaySession) {
        self.sessions.entry(record.level).or_default().push(record);
    }

    pub fn add_play_data_batch(&mut self, records: impl IntoIterator<Item = PlaySession>) {
        for record in records {
            self.add_play_data(record);
        }
    }

    pub fn total_plays(&self) -> usize {
        self.sessions.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Stats for one level, `None` when it has no data.
    pub fn calculate_level_stats(&self, level: u32) -> Option<LevelStats> {
        self.sessions
            .get(&level)
            .filter(|s| !s.is_empty())
            .map(|s| stats_for(level, s))
    }

    /// Stats for a level only if it has enough attempts to judge.
    fn judged_stats(&self, level: u32) -> Option<LevelStats> {
        self.calculate_level_stats(level)
            .filter(|s| s.attempts >= self.thresholds.min_attempts)
    }

    /// Levels whose win rate falls more than `spike_threshold` below the
    /// previous level's.
    pub fn detect_difficulty_spikes(&self, range: RangeInclusive<u32>) -> Vec<DifficultySpike> {
        let mut spikes = Vec::new();
        for level in range {
            if level <= 1 {
                continue;
            }
            let (Some(prev), Some(curr)) = (self.judged_stats(level - 1), self.judged_stats(level))
            else {
                continue;
            };
            let drop = prev.win_rate - curr.win_rate;
            if drop > self.thresholds.spike_threshold + RATE_EPSILON {
                let severity = if drop > HIGH_SPIKE_DROP + RATE_EPSILON {
                    Severity::High
                } else if drop > MEDIUM_SPIKE_DROP + RATE_EPSILON {
                    Severity::Medium
                } else {
                    Severity::Low
                };
                spikes.push(DifficultySpike {
                    level,
                    previous_win_rate: prev.win_rate,
                    win_rate: curr.win_rate,
                    drop,
                    severity,
                });
            }
        }
        spikes
    }

    /// Too-hard, too-easy and high-quit levels. Hard levels are tolerated in
    /// challenge phases, on boss levels and on configured hard levels; easy
    /// ones during onboarding and on configured easy levels.
    pub fn detect_balance_issues(&self, range: RangeInclusive<u32>) -> Vec<BalanceIssue> {
        let config = self.config.snapshot();
        let formulas = self.config.formulas();
        let t = &self.thresholds;
        let mut issues = Vec::new();

        for level in range {
            let Some(stats) = self.judged_stats(level) else {
                continue;
            };
            let kind = config.phase_for(level).map(|p| p.kind);
            let hard_ok = kind == Some(PhaseKind::Challenge)
                || formulas.is_boss_level(level)
                || config.events.boss_levels.contains(&level)
                || config.events.hard_levels.contains(&level);
            let easy_ok =
                kind == Some(PhaseKind::Onboarding) || config.events.easy_levels.contains(&level);

            if stats.win_rate < t.too_hard_win_rate && !hard_ok {
                issues.push(BalanceIssue {
                    level,
                    kind: IssueKind::TooHard,
                    value: stats.win_rate,
                    threshold: t.too_hard_win_rate,
                });
            }
            if stats.win_rate > t.too_easy_win_rate && !easy_ok {
                issues.push(BalanceIssue {
                    level,
                    kind: IssueKind::TooEasy,
                    value: stats.win_rate,
                    threshold: t.too_easy_win_rate,
                });
            }
            if stats.quit_rate > t.high_quit_rate {
                issues.push(BalanceIssue {
                    level,
                    kind: IssueKind::HighQuitRate,
                    value: stats.quit_rate,
                    threshold: t.high_quit_rate,
                });
            }
        }
        issues
    }

    /// Aggregates per configured phase.
    pub fn calculate_phase_stats(&self) -> Vec<PhaseStats> {
        self.config
            .phases()
            .into_iter()
            .map(|phase| {
                let in_phase: Vec<&PlaySession> = self
                    .sessions
                    .iter()
                    .filter(|(level, _)| phase.contains(**level))
                    .flat_map(|(_, s)| s.iter())
                    .collect();
                let levels_with_data = self
                    .sessions
                    .iter()
                    .filter(|(level, s)| phase.contains(**level) && !s.is_empty())
                    .count() as u32;
                let attempts = in_phase.len() as u32;
                let total = attempts.max(1) as f64;
                PhaseStats {
                    levels_with_data,
                    attempts,
                    win_rate: in_phase.iter().filter(|s| s.is_win()).count() as f64 / total,
                    quit_rate: in_phase
                        .iter()
                        .filter(|s| s.result == PlayResult::Quit)
                        .count() as f64
                        / total,
                    avg_retries: mean(in_phase.iter().map(|s| s.retry_count as f64)),
                    name: phase.name,
                    start_level: phase.start_level,
                    end_level: phase.end_level,
                    target_difficulty: phase.target_difficulty,
                }
            })
            .collect()
    }

    /// Concrete move and density changes for hard, easy and spiking levels.
    fn recommend(&self, issues: &[BalanceIssue], spikes: &[DifficultySpike]) -> Vec<Recommendation> {
        let formulas = self.config.formulas();
        let target = WinRateTarget {
            min: self.thresholds.too_hard_win_rate,
            max: self.thresholds.too_easy_win_rate,
        };
        let nudge = |level: u32, observed: f64, what: String| {
            let params = formulas.suggest_level_params(level);
            let adjusted = formulas.adjust_for_win_rate(params.moves, params.density, observed, target);
            Recommendation {
                level,
                message: format!(
                    "Level {level}: {what}; moves {} -> {}, moss density {:.2} -> {:.2}",
                    params.moves, adjusted.moves, params.density, adjusted.density
                ),
                current_moves: params.moves,
                suggested_moves: adjusted.moves,
                suggested_density: adjusted.density,
            }
        };

        let mut out = Vec::new();
        for issue in issues {
            match issue.kind {
                IssueKind::TooHard => out.push(nudge(
                    issue.level,
                    issue.value,
                    format!("win rate {:.0}% is too low", issue.value * 100.0),
                )),
                IssueKind::TooEasy => out.push(nudge(
                    issue.level,
                    issue.value,
                    format!("win rate {:.0}% is too high", issue.value * 100.0),
                )),
                IssueKind::HighQuitRate => {
                    let params = formulas.suggest_level_params(issue.level);
                    out.push(Recommendation {
                        level: issue.level,
                        message: format!(
                            "Level {}: {:.0}% of attempts quit; check goal clarity and early deadlocks",
                            issue.level,
                            issue.value * 100.0
                        ),
                        current_moves: params.moves,
                        suggested_moves: params.moves,
                        suggested_density: params.density,
                    });
                }
            }
        }
        for spike in spikes {
            if issues.iter().any(|i| i.level == spike.level && i.kind == IssueKind::TooHard) {
                continue;
            }
            // Treat the spike as a level below the band so the nudge eases it.
            out.push(nudge(
                spike.level,
                target.min - f64::EPSILON,
                format!(
                    "win rate drops {:.0} points from level {}",
                    spike.drop * 100.0,
                    spike.level - 1
                ),
            ));
        }
        out
    }

    /// Full report over `start..=end`.
    pub fn generate_report(&self, start: u32, end: u32) -> AnalyzerReport {
        let level_stats: Vec<LevelStats> = (start..=end)
            .filter_map(|level| self.calculate_level_stats(level))
            .collect();
        let spikes = self.detect_difficulty_spikes(start..=end);
        let issues = self.detect_balance_issues(start..=end);
        let recommendations = self.recommend(&issues, &spikes);
        log::info!(
            "analyzed levels {start}-{end}: {} spikes, {} issues",
            spikes.len(),
            issues.len()
        );
        AnalyzerReport {
            start_level: start,
            end_level: end,
            total_plays: self.total_plays(),
            level_stats,
            spikes,
            issues,
            phase_stats: self.calculate_phase_stats(),
            recommendations,
        }
    }

    /// Levels ranked by frustration index, worst first.
    pub fn get_problematic_levels(&self, limit: usize) -> Vec<ProblematicLevel> {
        let mut ranked: Vec<ProblematicLevel> = self
            .sessions
            .keys()
            .filter_map(|&level| self.calculate_level_stats(level))
            .map(|stats| ProblematicLevel {
                level: stats.level,
                frustration_index: frustration_index(&stats),
                stats,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.frustration_index
                .total_cmp(&a.frustration_index)
                .then(a.level.cmp(&b.level))
        });
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(level: u32, result: PlayResult, retry_count: u32, progress: u32) -> PlaySession {
        PlaySession {
            level,
            player_id: format!("p{level}-{retry_count}"),
            result,
            moves_used: 20,
            moves_total: 25,
            goal_progress: progress,
            goal_total: 20,
            duration_secs: 90.0,
            cascade_count: 1,
            shuffle_count: 0,
            specials_created: 1,
            specials_triggered: 0,
            retry_count,
            timestamp: 0,
        }
    }

    /// `wins` wins and `attempts - wins` losses at `level`.
    fn seed_level(analyzer: &mut LevelAnalyzer, level: u32, wins: u32, attempts: u32) {
        for i in 0..attempts {
            let result = if i < wins { PlayResult::Win } else { PlayResult::Lose };
            let progress = if i < wins { 20 } else { 10 };
            analyzer.add_play_data(session(level, result, 1, progress));
        }
    }

    #[test]
    fn test_level_stats() {
        let mut analyzer = LevelAnalyzer::default();
        analyzer.add_play_data(session(3, PlayResult::Win, 0, 20));
        analyzer.add_play_data(session(3, PlayResult::Lose, 2, 10));
        analyzer.add_play_data(session(3, PlayResult::Quit, 4, 5));
        analyzer.add_play_data(session(3, PlayResult::Lose, 2, 15));

        let stats = analyzer.calculate_level_stats(3).unwrap();
        assert_eq!(stats.attempts, 4);
        assert_eq!((stats.wins, stats.losses, stats.quits), (1, 2, 1));
        assert!((stats.win_rate - 0.25).abs() < 1e-9);
        assert!((stats.quit_rate - 0.25).abs() < 1e-9);
        assert!((stats.avg_retries - 2.0).abs() < 1e-9);
        assert!((stats.avg_progress_at_failure - 0.5).abs() < 1e-9);
        assert!(analyzer.calculate_level_stats(4).is_none());
    }

    #[test]
    fn test_spike_only_above_threshold() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 20, 8, 10);
        seed_level(&mut analyzer, 21, 7, 10); // drop 0.1
        seed_level(&mut analyzer, 22, 3, 10); // drop 0.4
        let spikes = analyzer.detect_difficulty_spikes(20..=22);
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].level, 22);
        assert_eq!(spikes[0].severity, Severity::High);
    }

    #[test]
    fn test_drop_equal_to_threshold_is_not_a_spike() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 20, 20, 20);
        seed_level(&mut analyzer, 21, 17, 20); // drop 0.15, the default threshold
        assert!(analyzer.detect_difficulty_spikes(20..=21).is_empty());

        seed_level(&mut analyzer, 22, 14, 20); // drop 0.15 again
        seed_level(&mut analyzer, 23, 7, 20); // drop 0.35
        let spikes = analyzer.detect_difficulty_spikes(20..=23);
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].level, 23);
    }

    #[test]
    fn test_severity_band_edges_are_exclusive() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 50, 10, 10);
        seed_level(&mut analyzer, 51, 7, 10); // drop exactly 0.3
        seed_level(&mut analyzer, 52, 10, 10);
        seed_level(&mut analyzer, 53, 8, 10); // drop exactly 0.2
        let spikes = analyzer.detect_difficulty_spikes(50..=53);
        assert_eq!(spikes.len(), 2);
        assert_eq!(spikes[0].severity, Severity::Medium);
        assert_eq!(spikes[1].severity, Severity::Low);
    }

    #[test]
    fn test_spike_severity_bands() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 40, 20, 20);
        seed_level(&mut analyzer, 41, 16, 20); // drop 0.2 -> Low
        seed_level(&mut analyzer, 42, 11, 20); // drop 0.25 -> Medium
        let spikes = analyzer.detect_difficulty_spikes(40..=42);
        assert_eq!(spikes.len(), 2);
        assert_eq!(spikes[0].severity, Severity::Low);
        assert_eq!(spikes[1].severity, Severity::Medium);
    }

    #[test]
    fn test_issue_detection_respects_phases() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 5, 10, 10); // onboarding: easy is fine
        seed_level(&mut analyzer, 25, 10, 10); // learning: too easy
        seed_level(&mut analyzer, 26, 1, 10); // learning: too hard
        seed_level(&mut analyzer, 30, 1, 10); // boss level: tolerated
        seed_level(&mut analyzer, 75, 1, 10); // challenge phase: tolerated
        let issues = analyzer.detect_balance_issues(1..=100);
        let kinds: Vec<(u32, IssueKind)> = issues.iter().map(|i| (i.level, i.kind)).collect();
        assert_eq!(kinds, vec![(25, IssueKind::TooEasy), (26, IssueKind::TooHard)]);
    }

    #[test]
    fn test_high_quit_rate() {
        let mut analyzer = LevelAnalyzer::default();
        for i in 0..10 {
            let result = if i < 4 { PlayResult::Quit } else { PlayResult::Win };
            analyzer.add_play_data(session(12, result, 0, 5));
        }
        let issues = analyzer.detect_balance_issues(12..=12);
        assert!(issues.iter().any(|i| i.kind == IssueKind::HighQuitRate));
    }

    #[test]
    fn test_phase_stats_cover_config_phases() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 2, 9, 10);
        seed_level(&mut analyzer, 3, 7, 10);
        seed_level(&mut analyzer, 500, 2, 10);
        let phases = analyzer.calculate_phase_stats();
        assert_eq!(phases.len(), 5);
        assert_eq!(phases[0].levels_with_data, 2);
        assert_eq!(phases[0].attempts, 20);
        assert!((phases[0].win_rate - 0.8).abs() < 1e-9);
        assert_eq!(phases[4].attempts, 10);
        assert_eq!(phases[1].attempts, 0);
    }

    #[test]
    fn test_report_recommends_more_moves_for_hard_levels() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 25, 8, 10);
        seed_level(&mut analyzer, 26, 1, 10);
        let report = analyzer.generate_report(20, 30);
        assert_eq!(report.total_plays, 20);
        assert_eq!(report.level_stats.len(), 2);
        let rec = report
            .recommendations
            .iter()
            .find(|r| r.level == 26)
            .unwrap();
        assert!(rec.suggested_moves > rec.current_moves);
        assert!(report.to_json().contains("\"recommendations\""));
    }

    #[test]
    fn test_problematic_levels_ranked() {
        let mut analyzer = LevelAnalyzer::default();
        seed_level(&mut analyzer, 7, 9, 10);
        seed_level(&mut analyzer, 8, 2, 10);
        seed_level(&mut analyzer, 9, 5, 10);
        let worst = analyzer.get_problematic_levels(2);
        assert_eq!(worst.len(), 2);
        assert_eq!(worst[0].level, 8);
        assert_eq!(worst[1].level, 9);
        assert!(worst[0].frustration_index > worst[1].frustration_index);
    }

    #[test]
    fn test_frustration_index_formula() {
        let stats = LevelStats {
            level: 1,
            attempts: 10,
            wins: 5,
            losses: 5,
            quits: 0,
            win_rate: 0.5,
            quit_rate: 0.0,
            avg_moves_used: 20.0,
            avg_duration_secs: 60.0,
            avg_retries: 10.0,
            avg_progress_at_failure: 0.5,
        };
        assert!((frustration_index(&stats) - (0.25 + 0.3 + 0.1)).abs() < 1e-9);
    }
}
