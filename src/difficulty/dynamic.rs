//! Per-player dynamic difficulty.
//!
//! Each finished session nudges a player's profile (skill, recent win rate,
//! frustration). Before the next level a modifier is derived from that profile
//! and applied to the blueprint. Modifiers only ever make levels easier, and
//! every field is capped by `DdaSettings`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analytics::{PlayResult, PlaySession};
use crate::balance::constants::{DENSITY_CAP, GOAL_FLOOR, MOVES_MAX};
use crate::error::ProfileError;
use crate::level::types::LevelDef;

/// Skill change per session before efficiency scaling.
const SKILL_STEP: f64 = 0.05;

/// Frustration halves with every win.
const FRUSTRATION_DECAY_ON_WIN: f64 = 0.5;

/// Quitting counts this much more than losing.
const QUIT_FRUSTRATION_FACTOR: f64 = 1.5;

/// Loss streaks and retries beyond this stop adding frustration.
const STREAK_CAP: u32 = 5;

/// Tuning for dynamic difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdaSettings {
    pub enabled: bool,
    /// Players with fewer finished sessions get onboarding help.
    pub onboarding_games: u32,
    /// Frustration at or above this triggers relief.
    pub frustration_threshold: f64,
    /// Recent win rate below this earns a small moves bonus.
    pub struggling_win_rate: f64,
    /// Smoothing factor of the recent win rate.
    pub win_rate_alpha: f64,

    pub new_player_moves_bonus: u32,
    pub new_player_goal_weight_boost: f64,
    pub struggling_moves_bonus: u32,

    // Caps
    pub max_moves_bonus: u32,
    pub max_goal_reduction: f64,
    pub max_density_reduction: f64,
    pub max_goal_weight_boost: f64,
}

impl Default for DdaSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            onboarding_games: 5,
            frustration_threshold: 0.6,
            struggling_win_rate: 0.3,
            win_rate_alpha: 0.3,
            new_player_moves_bonus: 3,
            new_player_goal_weight_boost: 1.2,
            struggling_moves_bonus: 2,
            max_moves_bonus: 5,
            max_goal_reduction: 0.3,
            max_density_reduction: 0.5,
            max_goal_weight_boost: 1.5,
        }
    }
}

/// What a player's history says about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: String,
    /// 0 (novice) to 1 (expert).
    pub skill_level: f64,
    /// Exponential moving average of wins.
    pub recent_win_rate: f64,
    /// 0 (calm) to 1 (about to quit).
    pub frustration_score: f64,
    pub games_played: u32,
    pub loss_streak: u32,
}

impl PlayerProfile {
    pub fn new(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            skill_level: 0.5,
            recent_win_rate: 0.5,
            frustration_score: 0.0,
            games_played: 0,
            loss_streak: 0,
        }
    }

    fn is_valid(&self) -> bool {
        [self.skill_level, self.recent_win_rate, self.frustration_score]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }
}

/// Why a modifier was (or was not) applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    None,
    Disabled,
    NewPlayer,
    Frustrated,
    Struggling,
}

/// Relief applied to a level blueprint for one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyModifier {
    pub moves_bonus: u32,
    /// Fraction of every goal count removed.
    pub goal_reduction: f64,
    /// Fraction of the moss density removed.
    pub density_reduction: f64,
    /// Spawn-weight multiplier for goal items.
    pub goal_weight_boost: f64,
    pub reason: AdjustmentReason,
}

impl DifficultyModifier {
    pub fn neutral(reason: AdjustmentReason) -> Self {
        Self {
            moves_bonus: 0,
            goal_reduction: 0.0,
            density_reduction: 0.0,
            goal_weight_boost: 1.0,
            reason,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.moves_bonus == 0
            && self.goal_reduction == 0.0
            && self.density_reduction == 0.0
            && self.goal_weight_boost == 1.0
    }

    /// Clamp every field to the settings' caps. Non-finite values go neutral.
    fn clamped(self, s: &DdaSettings) -> Self {
        let frac = |v: f64, max: f64| if v.is_finite() { v.clamp(0.0, max.clamp(0.0, 1.0)) } else { 0.0 };
        Self {
            moves_bonus: self.moves_bonus.min(s.max_moves_bonus),
            goal_reduction: frac(self.goal_reduction, s.max_goal_reduction),
            density_reduction: frac(self.density_reduction, s.max_density_reduction),
            goal_weight_boost: if self.goal_weight_boost.is_finite() {
                self.goal_weight_boost.clamp(1.0, s.max_goal_weight_boost.max(1.0))
            } else {
                1.0
            },
            reason: self.reason,
        }
    }
}

/// Population summary of the profiles held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentStats {
    pub total_players: usize,
    pub new_players: usize,
    pub frustrated_players: usize,
    pub struggling_players: usize,
    pub avg_skill: f64,
    pub avg_frustration: f64,
}

/// Player profiles and the modifiers they earn.
///
/// Mutation takes `&mut self`; share it behind a lock if several threads
/// report sessions.
#[derive(Debug, Clone, Default)]
pub struct DynamicDifficulty {
    settings: DdaSettings,
    profiles: BTreeMap<String, PlayerProfile>,
}

impl DynamicDifficulty {
    pub fn new(settings: DdaSettings) -> Self {
        Self {
            settings,
            profiles: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &DdaSettings {
        &self.settings
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    pub fn profile(&self, player_id: &str) -> Option<&PlayerProfile> {
        self.profiles.get(player_id)
    }

    /// Fold one finished session into the player's profile.
    pub fn update_player_profile(&mut self, player_id: &str, session: &PlaySession) -> &PlayerProfile {
        let alpha = self.settings.win_rate_alpha.clamp(0.0, 1.0);
        let profile = self
            .profiles
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerProfile::new(player_id));

        let won = session.is_win();
        let outcome = if won { 1.0 } else { 0.0 };
        profile.recent_win_rate = (1.0 - alpha) * profile.recent_win_rate + alpha * outcome;
        profile.games_played = profile.games_played.saturating_add(1);

        if won {
            profile.loss_streak = 0;
            let flair = (session.specials_triggered.saturating_add(session.cascade_count) as f64 / 10.0).min(1.0);
            let efficiency = 0.6 * session.moves_left_fraction() + 0.4 * flair;
            profile.skill_level += SKILL_STEP * (0.5 + efficiency);
            profile.frustration_score *= FRUSTRATION_DECAY_ON_WIN;
        } else {
            profile.loss_streak = profile.loss_streak.saturating_add(1);
            profile.skill_level -= SKILL_STEP * (1.0 - session.progress_fraction());
            let streak = profile.loss_streak.min(STREAK_CAP) as f64;
            let retries = session.retry_count.min(STREAK_CAP) as f64;
            let mut bump = 0.08 + 0.04 * streak + 0.02 * retries;
            if session.result == PlayResult::Quit {
                bump *= QUIT_FRUSTRATION_FACTOR;
            }
            profile.frustration_score += bump;
        }
        profile.skill_level = profile.skill_level.clamp(0.0, 1.0);
        profile.frustration_score = profile.frustration_score.clamp(0.0, 1.0);
        profile.recent_win_rate = profile.recent_win_rate.clamp(0.0, 1.0);
        profile
    }

    /// Modifier for a player's next attempt at `level`.
    pub fn calculate_modifier(&self, player_id: &str, level: u32) -> DifficultyModifier {
        let s = &self.settings;
        if !s.enabled {
            return DifficultyModifier::neutral(AdjustmentReason::Disabled);
        }
        let fresh;
        let profile = match self.profiles.get(player_id) {
            Some(p) => p,
            None => {
                fresh = PlayerProfile::new(player_id);
                &fresh
            }
        };

        let modifier = if profile.games_played < s.onboarding_games {
            DifficultyModifier {
                moves_bonus: s.new_player_moves_bonus,
                goal_weight_boost: s.new_player_goal_weight_boost,
                ..DifficultyModifier::neutral(AdjustmentReason::NewPlayer)
            }
        } else if profile.frustration_score >= s.frustration_threshold {
            let span = (1.0 - s.frustration_threshold).max(f64::EPSILON);
            let intensity = ((profile.frustration_score - s.frustration_threshold) / span).clamp(0.0, 1.0);
            DifficultyModifier {
                moves_bonus: 2 + (intensity * 3.0).round() as u32,
                goal_reduction: 0.1 + 0.2 * intensity,
                density_reduction: 0.2 + 0.3 * intensity,
                goal_weight_boost: 1.1 + 0.3 * intensity,
                reason: AdjustmentReason::Frustrated,
            }
        } else if profile.recent_win_rate < s.struggling_win_rate {
            DifficultyModifier {
                moves_bonus: s.struggling_moves_bonus,
                ..DifficultyModifier::neutral(AdjustmentReason::Struggling)
            }
        } else {
            DifficultyModifier::neutral(AdjustmentReason::None)
        };

        let modifier = modifier.clamped(s);
        if !modifier.is_neutral() {
            log::debug!("player {player_id} level {level}: {:?} modifier {modifier:?}", modifier.reason);
        }
        modifier
    }

    /// A copy of `def` with the modifier applied, kept inside compiled bounds.
    pub fn apply_modifier(def: &LevelDef, modifier: &DifficultyModifier) -> LevelDef {
        let m = modifier.clamped(&DdaSettings {
            max_moves_bonus: MOVES_MAX,
            max_goal_reduction: 1.0,
            max_density_reduction: 1.0,
            max_goal_weight_boost: 3.0,
            ..DdaSettings::default()
        });
        let mut out = def.clone();

        out.moves = def.moves.saturating_add(m.moves_bonus).min(MOVES_MAX);

        let density = if def.blockers.density.is_finite() {
            def.blockers.density.clamp(0.0, DENSITY_CAP)
        } else {
            0.0
        };
        out.blockers.density = (density * (1.0 - m.density_reduction)).max(0.0);
        let keep = ((def.blockers.cells.len() as f64) * (1.0 - m.density_reduction)).round() as usize;
        out.blockers.cells.truncate(keep);

        let available = out.blockers.cells.len() as u32;
        out.goals = def
            .goals
            .iter()
            .map(|g| {
                let mut goal = g.scaled(1.0 - m.goal_reduction, GOAL_FLOOR);
                goal.cap_moss(available);
                goal
            })
            .collect();

        for goal in &out.goals {
            if let Some(item) = goal.item() {
                if let Some(w) = out.tile_weights.get_mut(&item) {
                    *w *= m.goal_weight_boost;
                }
            }
        }
        out
    }

    pub fn export_profile(&self, player_id: &str) -> Result<String, ProfileError> {
        let profile = self
            .profiles
            .get(player_id)
            .ok_or_else(|| ProfileError::UnknownPlayer(player_id.to_string()))?;
        Ok(serde_json::to_string(profile)?)
    }

    /// Load a profile, replacing any existing one for the same player.
    pub fn import_profile(&mut self, json: &str) -> Result<(), ProfileError> {
        let profile: PlayerProfile = serde_json::from_str(json)?;
        if !profile.is_valid() {
            return Err(ProfileError::OutOfRange(profile.player_id));
        }
        self.profiles.insert(profile.player_id.clone(), profile);
        Ok(())
    }

    /// Forget a player. Returns false if there was nothing to forget.
    pub fn clear_player_data(&mut self, player_id: &str) -> bool {
        self.profiles.remove(player_id).is_some()
    }

    pub fn get_adjustment_stats(&self) -> AdjustmentStats {
        let s = &self.settings;
        let n = self.profiles.len();
        let profiles = || self.profiles.values();
        let avg = |sum: f64| if n == 0 { 0.0 } else { sum / n as f64 };
        AdjustmentStats {
            total_players: n,
            new_players: profiles().filter(|p| p.games_played < s.onboarding_games).count(),
            frustrated_players: profiles()
                .filter(|p| p.frustration_score >= s.frustration_threshold)
                .count(),
            struggling_players: profiles()
                .filter(|p| p.recent_win_rate < s.struggling_win_rate)
                .count(),
            avg_skill: avg(profiles().map(|p| p.skill_level).sum()),
            avg_frustration: avg(profiles().map(|p| p.frustration_score).sum()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::{BoardSize, Cell, TileType};
    use crate::level::types::{BlockerLayout, CollectGoal, Goal, MossGoal};

    fn session(result: PlayResult, progress: u32, retry_count: u32) -> PlaySession {
        PlaySession {
            level: 10,
            player_id: "p".to_string(),
            result,
            moves_used: 20,
            moves_total: 30,
            goal_progress: progress,
            goal_total: 20,
            duration_secs: 60.0,
            cascade_count: 2,
            shuffle_count: 0,
            specials_created: 1,
            specials_triggered: 1,
            retry_count,
            timestamp: 0,
        }
    }

    fn level() -> LevelDef {
        LevelDef {
            level_index: 40,
            seed: 1,
            board_size: BoardSize::square(7),
            moves: 38,
            goals: vec![Goal::Combo {
                collect: CollectGoal {
                    item: TileType::Berry,
                    count: 20,
                    current: 0,
                },
                clear_moss: MossGoal {
                    count: 8,
                    current: 0,
                },
            }],
            blockers: BlockerLayout {
                density: 0.2,
                cells: (0..10).map(|c| Cell::new(c % 7, c / 7)).collect(),
                pattern: None,
                layers: 1,
            },
            tile_weights: TileType::ALL[..5].iter().map(|k| (*k, 1.0)).collect(),
            is_boss: false,
        }
    }

    fn veteran(dda: &mut DynamicDifficulty, wins: usize) {
        for _ in 0..wins {
            dda.update_player_profile("p", &session(PlayResult::Win, 20, 0));
        }
    }

    #[test]
    fn test_new_player_gets_help() {
        let dda = DynamicDifficulty::default();
        let m = dda.calculate_modifier("nobody", 1);
        assert_eq!(m.reason, AdjustmentReason::NewPlayer);
        assert!(m.moves_bonus > 0);
        assert!(m.goal_weight_boost > 1.0);
    }

    #[test]
    fn test_disabled_is_neutral() {
        let mut dda = DynamicDifficulty::default();
        dda.set_enabled(false);
        let m = dda.calculate_modifier("nobody", 1);
        assert_eq!(m.reason, AdjustmentReason::Disabled);
        assert!(m.is_neutral());
    }

    #[test]
    fn test_wins_raise_skill_and_settle_to_neutral() {
        let mut dda = DynamicDifficulty::default();
        veteran(&mut dda, 6);
        let p = dda.profile("p").unwrap();
        assert!(p.skill_level > 0.5);
        assert_eq!(p.loss_streak, 0);
        assert!(p.recent_win_rate > 0.5);
        assert_eq!(dda.calculate_modifier("p", 12).reason, AdjustmentReason::None);
    }

    #[test]
    fn test_loss_streak_frustrates() {
        let mut dda = DynamicDifficulty::default();
        veteran(&mut dda, 5);
        for retry in 0..5 {
            dda.update_player_profile("p", &session(PlayResult::Quit, 2, retry));
        }
        let p = dda.profile("p").unwrap();
        assert!(p.frustration_score >= 0.6, "{}", p.frustration_score);
        assert!(p.skill_level < 0.6);
        let m = dda.calculate_modifier("p", 12);
        assert_eq!(m.reason, AdjustmentReason::Frustrated);
        assert!(m.moves_bonus > 0 && m.goal_reduction > 0.0 && m.density_reduction > 0.0);
        assert!(m.moves_bonus <= dda.settings().max_moves_bonus);

        // A win takes the edge off.
        let before = dda.profile("p").unwrap().frustration_score;
        dda.update_player_profile("p", &session(PlayResult::Win, 20, 0));
        assert!(dda.profile("p").unwrap().frustration_score < before);
    }

    #[test]
    fn test_huge_cascade_counts_saturate() {
        let mut dda = DynamicDifficulty::default();
        let mut flashy = session(PlayResult::Win, 20, 0);
        flashy.cascade_count = u32::MAX;
        flashy.specials_triggered = u32::MAX;
        let p = dda.update_player_profile("p", &flashy);
        assert!(p.skill_level > 0.5 && p.skill_level <= 1.0, "{}", p.skill_level);

        let mut plain = DynamicDifficulty::default();
        let mut capped = session(PlayResult::Win, 20, 0);
        capped.cascade_count = 10;
        capped.specials_triggered = 0;
        let q = plain.update_player_profile("p", &capped);
        assert_eq!(dda.profile("p").unwrap().skill_level, q.skill_level);
    }

    #[test]
    fn test_struggling_player_gets_small_bonus() {
        let mut dda = DynamicDifficulty::new(DdaSettings {
            frustration_threshold: 1.5,
            ..DdaSettings::default()
        });
        for _ in 0..6 {
            dda.update_player_profile("p", &session(PlayResult::Lose, 19, 0));
        }
        let m = dda.calculate_modifier("p", 8);
        assert_eq!(m.reason, AdjustmentReason::Struggling);
        assert_eq!(m.moves_bonus, 2);
    }

    #[test]
    fn test_apply_modifier_bounds() {
        let def = level();
        let extreme = DifficultyModifier {
            moves_bonus: 1_000,
            goal_reduction: 5.0,
            density_reduction: 2.0,
            goal_weight_boost: 100.0,
            reason: AdjustmentReason::Frustrated,
        };
        let out = DynamicDifficulty::apply_modifier(&def, &extreme);
        assert_eq!(out.moves, MOVES_MAX);
        assert!(out.blockers.density >= 0.0);
        assert!(out.blockers.cells.is_empty());
        assert_eq!(out.goals[0].remaining_of(TileType::Berry), GOAL_FLOOR);
        assert_eq!(out.goals[0].remaining_moss(), 0);
    }

    #[test]
    fn test_apply_modifier_partial() {
        let def = level();
        let m = DifficultyModifier {
            moves_bonus: 1,
            goal_reduction: 0.25,
            density_reduction: 0.5,
            goal_weight_boost: 1.5,
            reason: AdjustmentReason::Frustrated,
        };
        let out = DynamicDifficulty::apply_modifier(&def, &m);
        assert_eq!(out.moves, 39);
        assert_eq!(out.blockers.cells.len(), 5);
        assert!((out.blockers.density - 0.1).abs() < 1e-9);
        assert_eq!(out.goals[0].remaining_of(TileType::Berry), 15);
        assert_eq!(out.goals[0].remaining_moss(), 5);
        assert_eq!(out.tile_weights[&TileType::Berry], 1.5);
        assert_eq!(out.tile_weights[&TileType::Leaf], 1.0);
        // The input is untouched.
        assert_eq!(def.moves, 38);
    }

    #[test]
    fn test_non_finite_modifier_is_neutral() {
        let def = level();
        let m = DifficultyModifier {
            moves_bonus: 0,
            goal_reduction: f64::NAN,
            density_reduction: f64::INFINITY,
            goal_weight_boost: f64::NAN,
            reason: AdjustmentReason::None,
        };
        let out = DynamicDifficulty::apply_modifier(&def, &m);
        assert_eq!(out, def);
    }

    #[test]
    fn test_profile_export_import_and_clear() {
        let mut dda = DynamicDifficulty::default();
        veteran(&mut dda, 3);
        let json = dda.export_profile("p").unwrap();

        let mut other = DynamicDifficulty::default();
        other.import_profile(&json).unwrap();
        assert_eq!(other.profile("p"), dda.profile("p"));

        assert!(matches!(
            other.export_profile("ghost"),
            Err(ProfileError::UnknownPlayer(_))
        ));
        let bad = json.replace("\"frustration_score\":0.0", "\"frustration_score\":7.0");
        assert!(matches!(other.import_profile(&bad), Err(ProfileError::OutOfRange(_))));
        assert!(other.import_profile("{not json").is_err());

        assert!(other.clear_player_data("p"));
        assert!(!other.clear_player_data("p"));
        assert!(other.profile("p").is_none());
    }

    #[test]
    fn test_adjustment_stats() {
        let mut dda = DynamicDifficulty::default();
        assert_eq!(dda.get_adjustment_stats().total_players, 0);
        veteran(&mut dda, 6);
        dda.update_player_profile("q", &session(PlayResult::Lose, 0, 3));
        let stats = dda.get_adjustment_stats();
        assert_eq!(stats.total_players, 2);
        assert_eq!(stats.new_players, 1);
        assert!(stats.avg_skill > 0.0 && stats.avg_skill < 1.0);
    }
}
