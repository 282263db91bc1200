//! Deterministic level generation.
//!
//! A level is a pure function of (level index, player seed) and the balance
//! config in effect: the pair is hashed into one ChaCha8 seed, and every random
//! choice below draws from that single stream in a fixed order.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::moss::MossGenerator;
use super::state::{LevelState, DEFAULT_MAX_REPAIR_ATTEMPTS};
use super::types::{BlockerLayout, CollectGoal, Goal, GoalType, LevelDef, MossGoal};
use super::MAX_LEVEL;
use crate::balance::config::BalanceConfigManager;
use crate::balance::constants::{MIN_MOSS_CELLS_FOR_GOAL, THICK_MOSS_LEVEL};
use crate::balance::formulas::BalanceFormulas;
use crate::board::types::{BoardSize, TileType};
use crate::error::LevelError;

/// Generator switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Apply boss modifiers on boss and configured hard levels.
    pub boss_levels: bool,
    /// Force a board size instead of the level-banded one.
    pub board_size: Option<BoardSize>,
    pub max_repair_attempts: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            boss_levels: true,
            board_size: None,
            max_repair_attempts: DEFAULT_MAX_REPAIR_ATTEMPTS,
        }
    }
}

impl GeneratorOptions {
    /// Plain curves only: no boss modifiers.
    pub fn without_bosses() -> Self {
        Self {
            boss_levels: false,
            ..Self::default()
        }
    }
}

/// Hash (level, player seed) into a 64-bit RNG seed.
pub fn derive_seed(level_index: u32, player_seed: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(level_index.to_le_bytes());
    hasher.update(player_seed.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Builds level blueprints and their starting boards.
#[derive(Debug, Clone)]
pub struct LevelGenerator {
    config: Arc<BalanceConfigManager>,
    options: GeneratorOptions,
}

impl Default for LevelGenerator {
    fn default() -> Self {
        Self::new(Arc::new(BalanceConfigManager::default()), GeneratorOptions::default())
    }
}

impl LevelGenerator {
    pub fn new(config: Arc<BalanceConfigManager>, options: GeneratorOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &Arc<BalanceConfigManager> {
        &self.config
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate the blueprint for `level_index` as seen by `player_seed`.
    pub fn generate_level(&self, level_index: u32, player_seed: &str) -> Result<LevelDef, LevelError> {
        if level_index == 0 || level_index > MAX_LEVEL {
            return Err(LevelError::InvalidLevel(level_index));
        }
        let seed = derive_seed(level_index, player_seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = self.config.snapshot();
        let formulas = BalanceFormulas::new(config.constants.clone());
        let events = &config.events;

        let board_size = self
            .options
            .board_size
            .unwrap_or_else(|| BalanceFormulas::board_size_for_level(level_index));

        let mut moves = formulas.calculate_moves(level_index);
        let mut density = formulas.calculate_density(level_index);
        let is_boss = self.options.boss_levels
            && (formulas.is_boss_level(level_index)
                || events.boss_levels.contains(&level_index)
                || events.hard_levels.contains(&level_index));
        if is_boss {
            (moves, density) = formulas.apply_boss_modifier(moves, density);
        }
        if events.easy_levels.contains(&level_index) {
            (moves, density) = formulas.apply_easy_modifier(moves, density);
        }

        let pattern = formulas.select_pattern(level_index, &mut rng);
        let mut goal_type = formulas.select_goal_type(level_index, &mut rng);
        let item = formulas.select_goal_item(level_index, &mut rng);

        let layers = if level_index >= THICK_MOSS_LEVEL { 2 } else { 1 };
        let blockers = if density > 0.0 {
            MossGenerator::new(board_size).layout(pattern, density, layers, &mut rng)
        } else {
            BlockerLayout::empty()
        };

        if goal_type != GoalType::Collect && blockers.cells.len() < MIN_MOSS_CELLS_FOR_GOAL {
            goal_type = GoalType::Collect;
        }
        let goal = build_goal(&formulas, level_index, goal_type, item, blockers.cells.len(), &mut rng);
        let tile_weights = formulas.calculate_tile_weights(level_index, goal.item());

        log::debug!(
            "level {level_index}: {}x{} board, {moves} moves, {:?} goal of {}, {} moss ({}), boss={is_boss}",
            board_size.rows,
            board_size.cols,
            goal.goal_type(),
            goal.total(),
            blockers.cells.len(),
            pattern.name(),
        );

        Ok(LevelDef {
            level_index,
            seed,
            board_size,
            moves,
            goals: vec![goal],
            blockers,
            tile_weights,
            is_boss,
        })
    }

    /// Starting board for a blueprint, seeded from the blueprint itself.
    pub fn create_level_state(&self, def: &LevelDef) -> Result<LevelState, LevelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(def.seed);
        self.create_level_state_with_rng(def, &mut rng)
    }

    /// Starting board drawn from a caller-supplied RNG.
    pub fn create_level_state_with_rng<R: Rng>(
        &self,
        def: &LevelDef,
        rng: &mut R,
    ) -> Result<LevelState, LevelError> {
        LevelState::build(def, self.options.max_repair_attempts, rng)
    }
}

fn build_goal<R: Rng>(
    formulas: &BalanceFormulas,
    level: u32,
    goal_type: GoalType,
    item: TileType,
    moss_cells: usize,
    rng: &mut R,
) -> Goal {
    let count = formulas.calculate_goal_count(level, Some(goal_type));
    let moss_cells = moss_cells as u32;
    match goal_type {
        GoalType::Collect => Goal::Collect(CollectGoal {
            item,
            count,
            current: 0,
        }),
        GoalType::ClearMoss => Goal::ClearMoss(MossGoal {
            count: count.min(moss_cells),
            current: 0,
        }),
        GoalType::Combo => {
            // Between a third and a half of the goal goes to moss.
            let moss_share = rng.gen_range(count / 3..=count / 2);
            Goal::Combo {
                collect: CollectGoal {
                    item,
                    count: count - moss_share,
                    current: 0,
                },
                clear_moss: MossGoal {
                    count: moss_share.min(moss_cells),
                    current: 0,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::config::{ConfigPatch, LevelEvents};
    use crate::board::matching::{find_all_matches, has_valid_move};

    #[test]
    fn test_out_of_range_levels_rejected() {
        let gen = LevelGenerator::default();
        assert_eq!(gen.generate_level(0, "p"), Err(LevelError::InvalidLevel(0)));
        assert_eq!(
            gen.generate_level(MAX_LEVEL + 1, "p"),
            Err(LevelError::InvalidLevel(MAX_LEVEL + 1))
        );
        assert!(gen.generate_level(MAX_LEVEL, "p").is_ok());
    }

    #[test]
    fn test_same_inputs_same_level() {
        let gen = LevelGenerator::default();
        for level in [1, 17, 64, 250] {
            let a = gen.generate_level(level, "player-1").unwrap();
            let b = gen.generate_level(level, "player-1").unwrap();
            assert_eq!(a, b);
            let sa = gen.create_level_state(&a).unwrap();
            let sb = gen.create_level_state(&b).unwrap();
            assert_eq!(sa.board, sb.board);
        }
    }

    #[test]
    fn test_seed_depends_on_both_inputs() {
        assert_ne!(derive_seed(1, "a"), derive_seed(2, "a"));
        assert_ne!(derive_seed(1, "a"), derive_seed(1, "b"));
        assert_eq!(derive_seed(5, "x"), derive_seed(5, "x"));
    }

    #[test]
    fn test_generated_boards_are_solvable() {
        let gen = LevelGenerator::default();
        for level in 1..=80 {
            let def = gen.generate_level(level, "solver").unwrap();
            let state = gen.create_level_state(&def).unwrap();
            assert!(find_all_matches(&state.board).is_empty(), "level {level}");
            assert!(has_valid_move(&state.board), "level {level}");
        }
    }

    #[test]
    fn test_moss_goals_have_enough_moss() {
        let gen = LevelGenerator::default();
        for level in 1..=150 {
            let def = gen.generate_level(level, "moss").unwrap();
            for goal in &def.goals {
                if goal.goal_type() != GoalType::Collect {
                    assert!(def.blockers.cells.len() >= MIN_MOSS_CELLS_FOR_GOAL);
                    assert!(goal.remaining_moss() as usize <= def.blockers.cells.len());
                }
            }
            let expected_layers = if level >= THICK_MOSS_LEVEL { 2 } else { 1 };
            if !def.blockers.cells.is_empty() {
                assert_eq!(def.blockers.layers, expected_layers);
            }
        }
    }

    #[test]
    fn test_repair_cap_is_fatal() {
        let gen = LevelGenerator::new(
            Arc::new(BalanceConfigManager::default()),
            GeneratorOptions {
                board_size: Some(BoardSize::square(2)),
                max_repair_attempts: 3,
                ..GeneratorOptions::default()
            },
        );
        let def = gen.generate_level(1, "tiny").unwrap();
        assert!(def.blockers.cells.is_empty());
        assert!(matches!(
            gen.create_level_state(&def),
            Err(LevelError::RepairExhausted { level: 1, attempts: 3 })
        ));
    }

    #[test]
    fn test_boss_levels_toggle() {
        let with = LevelGenerator::default();
        let without = LevelGenerator::new(
            Arc::new(BalanceConfigManager::default()),
            GeneratorOptions::without_bosses(),
        );
        let boss = with.generate_level(20, "b").unwrap();
        let plain = without.generate_level(20, "b").unwrap();
        assert!(boss.is_boss);
        assert!(!plain.is_boss);
        assert!(boss.moves <= plain.moves);
    }

    #[test]
    fn test_config_events_apply() {
        let manager = Arc::new(BalanceConfigManager::default());
        manager
            .update_config(ConfigPatch {
                events: Some(LevelEvents {
                    boss_levels: vec![],
                    easy_levels: vec![33],
                    hard_levels: vec![34],
                }),
                ..Default::default()
            })
            .unwrap();
        let gen = LevelGenerator::new(Arc::clone(&manager), GeneratorOptions::default());
        let plain = LevelGenerator::default();
        assert!(gen.generate_level(34, "e").unwrap().is_boss);
        let easy = gen.generate_level(33, "e").unwrap();
        assert!(easy.moves >= plain.generate_level(33, "e").unwrap().moves);
    }
}
