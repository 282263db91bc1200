//! Validation result aggregation and reporting.

use serde::{Deserialize, Serialize};

use super::runner::Playthrough;

/// Win rate below which a level is not considered playable.
pub const PLAYABLE_WIN_RATE: f64 = 0.1;

/// z-score for the 95% interval used by `confidence`.
const Z_95: f64 = 1.96;

/// Aggregated results from a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_playable: bool,
    pub iterations: u32,
    pub wins: u32,
    pub win_rate: f64,

    // Averages over winning runs
    pub avg_moves_used: f64,
    pub avg_moves_remaining: f64,
    pub min_moves_to_win: Option<u32>,

    // Averages over all runs
    pub avg_cascades: f64,
    pub deadlock_rate: f64,
    pub special_tile_usage: f64,

    /// 1 (trivial) to 10 (brutal)
    pub difficulty_score: f64,
    /// 1 minus the half-width of the 95% interval on the win rate
    pub confidence: f64,
}

impl ValidationResult {
    /// Aggregate a set of playthroughs. Zero wins is valid data.
    pub fn from_playthroughs(runs: &[Playthrough]) -> Self {
        let n = runs.len() as u32;
        let total = n.max(1) as f64;
        let winners: Vec<&Playthrough> = runs.iter().filter(|r| r.won).collect();
        let wins = winners.len() as u32;
        let win_rate = wins as f64 / total;

        let over_wins = |f: fn(&Playthrough) -> u32| -> f64 {
            if winners.is_empty() {
                0.0
            } else {
                winners.iter().map(|r| f(r) as f64).sum::<f64>() / wins as f64
            }
        };
        let avg_moves_used = over_wins(|r| r.moves_used);
        let avg_moves_remaining = over_wins(|r| r.moves_remaining);
        let min_moves_to_win = winners.iter().map(|r| r.moves_used).min();

        let avg_cascades = runs.iter().map(|r| r.cascades as f64).sum::<f64>() / total;
        let deadlock_rate = runs.iter().filter(|r| r.deadlocks > 0).count() as f64 / total;
        let special_tile_usage =
            runs.iter().map(|r| r.specials_triggered as f64).sum::<f64>() / total;

        Self {
            is_playable: win_rate >= PLAYABLE_WIN_RATE && wins >= 1,
            iterations: n,
            wins,
            win_rate,
            avg_moves_used,
            avg_moves_remaining,
            min_moves_to_win,
            avg_cascades,
            deadlock_rate,
            special_tile_usage,
            difficulty_score: difficulty_score(win_rate, deadlock_rate),
            confidence: confidence(wins, n),
        }
    }

    /// Generate a text report.
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str("                    LEVEL VALIDATION REPORT\n");
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!(
            "Runs: {} total, {} won ({:.1}%)\n\n",
            self.iterations,
            self.wins,
            self.win_rate * 100.0
        ));

        report.push_str("── MOVES ────────────────────────────────────────────────────────\n");
        report.push_str(&format!("  Avg Moves Used:      {:.1}\n", self.avg_moves_used));
        report.push_str(&format!(
            "  Avg Moves Remaining: {:.1}\n",
            self.avg_moves_remaining
        ));
        match self.min_moves_to_win {
            Some(min) => report.push_str(&format!("  Fastest Win:         {min}\n\n")),
            None => report.push_str("  Fastest Win:         -\n\n"),
        }

        report.push_str("── BOARD ────────────────────────────────────────────────────────\n");
        report.push_str(&format!("  Avg Cascades:        {:.2}\n", self.avg_cascades));
        report.push_str(&format!(
            "  Deadlock Rate:       {:.1}%\n",
            self.deadlock_rate * 100.0
        ));
        report.push_str(&format!(
            "  Specials Triggered:  {:.2} per run\n\n",
            self.special_tile_usage
        ));

        report.push_str("── ASSESSMENT ───────────────────────────────────────────────────\n");
        report.push_str(&format!(
            "  Difficulty:          {:.1} / 10\n",
            self.difficulty_score
        ));
        report.push_str(&format!("  Confidence:          {:.2}\n", self.confidence));
        let verdict = if !self.is_playable {
            "UNPLAYABLE - almost nobody wins"
        } else if self.win_rate > 0.9 {
            "TOO EASY - nearly every run wins"
        } else if self.win_rate < 0.3 {
            "HARD - most runs fail"
        } else {
            "GOOD - challenging but fair"
        };
        report.push_str(&format!("  Verdict:             {verdict}\n"));
        if self.deadlock_rate > 0.2 {
            report.push_str("  ⚠️  Frequent deadlocks - too few tile kinds or too much moss?\n");
        }

        report.push_str("\n═══════════════════════════════════════════════════════════════\n");

        report
    }

    /// Generate a JSON report for further analysis.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// `1 + 9 * (1 - win_rate) + 1.5 * deadlock_rate`, clamped to [1, 10].
pub fn difficulty_score(win_rate: f64, deadlock_rate: f64) -> f64 {
    (1.0 + 9.0 * (1.0 - win_rate) + 1.5 * deadlock_rate).clamp(1.0, 10.0)
}

/// 1 - 1.96 * SE, with SE from the Laplace-smoothed win rate so that all-win
/// and all-loss samples still carry uncertainty.
pub fn confidence(wins: u32, iterations: u32) -> f64 {
    if iterations == 0 {
        return 0.0;
    }
    let n = iterations as f64;
    let p = (wins as f64 + 1.0) / (n + 2.0);
    let se = (p * (1.0 - p) / n).sqrt();
    (1.0 - Z_95 * se).clamp(0.0, 1.0)
}
