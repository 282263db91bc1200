//! Analytics pipeline integration tests
//!
//! Simulated playthroughs are converted into play sessions and fed through
//! the analyzer, alongside hand-built cohorts with a known spike.

use levelforge::analytics::{
    AnalyzerThresholds, IssueKind, LevelAnalyzer, PlayResult, PlaySession, Severity,
};
use levelforge::balance::BalanceConfigManager;
use levelforge::level::{GeneratorOptions, LevelGenerator};
use levelforge::simulator::{simulate, SimConfig};
use std::sync::Arc;

fn cohort(level: u32, wins: u32, losses: u32, quits: u32) -> Vec<PlaySession> {
    let results = std::iter::repeat(PlayResult::Win)
        .take(wins as usize)
        .chain(std::iter::repeat(PlayResult::Lose).take(losses as usize))
        .chain(std::iter::repeat(PlayResult::Quit).take(quits as usize));
    results
        .enumerate()
        .map(|(i, result)| PlaySession {
            level,
            player_id: format!("player-{i}"),
            result,
            moves_used: 22,
            moves_total: 28,
            goal_progress: if result == PlayResult::Win { 24 } else { 12 },
            goal_total: 24,
            duration_secs: 95.0,
            cascade_count: 2,
            shuffle_count: 0,
            specials_created: 1,
            specials_triggered: 1,
            retry_count: if result == PlayResult::Win { 0 } else { 2 },
            timestamp: 1_700_000_000 + i as i64,
        })
        .collect()
}

#[test]
fn test_simulated_sessions_flow_into_stats() {
    let manager = Arc::new(BalanceConfigManager::default());
    let gen = LevelGenerator::new(Arc::clone(&manager), GeneratorOptions::default());
    let mut analyzer = LevelAnalyzer::new(Arc::clone(&manager), AnalyzerThresholds::default());

    for level in 11..=14 {
        let def = gen.generate_level(level, "cohort").unwrap();
        let runs = simulate(&def, &SimConfig::new(10, u64::from(level))).unwrap();
        let wins = runs.iter().filter(|r| r.won).count() as u32;
        analyzer.add_play_data_batch(
            runs.iter()
                .enumerate()
                .map(|(i, r)| r.to_play_session(&def, &format!("bot-{i}"), 0, 0)),
        );
        let stats = analyzer.calculate_level_stats(level).unwrap();
        assert_eq!(stats.attempts, 10);
        assert_eq!(stats.wins, wins);
        assert_eq!(stats.quits, 0);
        assert!(stats.avg_duration_secs > 0.0);
    }

    let report = analyzer.generate_report(11, 14);
    assert_eq!(report.total_plays, 40);
    assert_eq!(report.level_stats.len(), 4);
    let learning = report
        .phase_stats
        .iter()
        .find(|p| p.name == "Learning")
        .unwrap();
    assert_eq!(learning.attempts, 40);
    assert_eq!(learning.levels_with_data, 4);
    assert!(report.to_json().contains("\"phase_stats\""));
}

#[test]
fn test_spike_is_detected_and_explained() {
    let mut analyzer = LevelAnalyzer::default();
    analyzer.add_play_data_batch(cohort(21, 10, 0, 0));
    analyzer.add_play_data_batch(cohort(22, 3, 5, 2));
    analyzer.add_play_data_batch(cohort(23, 3, 7, 0));

    let spikes = analyzer.detect_difficulty_spikes(20..=23);
    assert_eq!(spikes.len(), 1);
    assert_eq!(spikes[0].level, 22);
    assert_eq!(spikes[0].severity, Severity::High);

    let issues = analyzer.detect_balance_issues(20..=23);
    assert!(issues.iter().any(|i| i.level == 21 && i.kind == IssueKind::TooEasy));
    assert!(!issues.iter().any(|i| i.kind == IssueKind::TooHard));

    let report = analyzer.generate_report(20, 23);
    let eased = report
        .recommendations
        .iter()
        .find(|r| r.level == 22)
        .unwrap();
    assert!(eased.suggested_moves >= eased.current_moves);

    let worst = analyzer.get_problematic_levels(1);
    assert_eq!(worst.len(), 1);
    assert!(worst[0].level == 22 || worst[0].level == 23);
}

#[test]
fn test_thin_data_is_not_judged() {
    let mut analyzer = LevelAnalyzer::default();
    analyzer.add_play_data_batch(cohort(40, 3, 0, 0));
    analyzer.add_play_data_batch(cohort(41, 0, 2, 1));
    assert!(analyzer.detect_difficulty_spikes(40..=41).is_empty());
    assert!(analyzer.detect_balance_issues(40..=41).is_empty());
    assert_eq!(analyzer.calculate_level_stats(41).unwrap().quits, 1);
}
