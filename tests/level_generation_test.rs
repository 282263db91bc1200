//! Level generation integration tests
//!
//! Determinism, solvability of starting boards and the level 1 scenario,
//! exercised through the public generator API.

use levelforge::balance::constants::{DENSITY_CAP, GOAL_MAX, GOAL_MIN, MOVES_MAX, MOVES_MIN};
use levelforge::balance::BalanceConfigManager;
use levelforge::board::{find_all_matches, has_valid_move, BoardSize};
use levelforge::error::LevelError;
use levelforge::level::{GeneratorOptions, GoalType, LevelGenerator};
use std::sync::Arc;

fn generator(options: GeneratorOptions) -> LevelGenerator {
    LevelGenerator::new(Arc::new(BalanceConfigManager::default()), options)
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_same_inputs_give_identical_levels() {
    let gen = generator(GeneratorOptions::default());
    for level in [1, 7, 25, 60, 150] {
        let a = gen.generate_level(level, "player-42").unwrap();
        let b = gen.generate_level(level, "player-42").unwrap();
        assert_eq!(a, b, "level {level} differs between runs");
        assert_eq!(a.blockers.cells, b.blockers.cells);
    }
}

#[test]
fn test_independent_generators_agree() {
    let a = generator(GeneratorOptions::default())
        .generate_level(33, "shared")
        .unwrap();
    let b = generator(GeneratorOptions::default())
        .generate_level(33, "shared")
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_starting_boards_are_deterministic() {
    let gen = generator(GeneratorOptions::default());
    let def = gen.generate_level(45, "boards").unwrap();
    let a = gen.create_level_state(&def).unwrap();
    let b = gen.create_level_state(&def).unwrap();
    assert_eq!(a.board, b.board);
}

#[test]
fn test_player_seeds_diverge() {
    let gen = generator(GeneratorOptions::default());
    let seeds: Vec<u64> = ["a", "b", "c", "d"]
        .iter()
        .map(|s| gen.generate_level(50, s).unwrap().seed)
        .collect();
    for (i, a) in seeds.iter().enumerate() {
        for b in &seeds[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

// ============================================================================
// Solvability and bounds
// ============================================================================

#[test]
fn test_starting_boards_are_solvable_across_levels() {
    let gen = generator(GeneratorOptions::default());
    for level in (1..=200).step_by(7) {
        let def = gen.generate_level(level, "solvable").unwrap();
        let state = gen.create_level_state(&def).unwrap();
        assert!(find_all_matches(&state.board).is_empty(), "level {level} starts with a match");
        assert!(has_valid_move(&state.board), "level {level} starts deadlocked");
        assert_eq!(state.moves_left, def.moves);
        assert_eq!(state.board.blocker_cells().len(), def.blockers.cells.len());
    }
}

#[test]
fn test_blueprints_stay_in_bounds() {
    let gen = generator(GeneratorOptions::default());
    for level in 1..=200 {
        let def = gen.generate_level(level, "bounds").unwrap();
        assert!((MOVES_MIN..=MOVES_MAX).contains(&def.moves), "level {level} moves {}", def.moves);
        assert!(def.blocker_coverage() <= DENSITY_CAP + 1e-9);
        assert!(def.goal_total() <= GOAL_MAX);
        if def.primary_goal_type() == GoalType::Collect {
            assert!(def.goal_total() >= GOAL_MIN);
        }
        assert!(def.tile_kinds() >= 3);
    }
}

#[test]
fn test_out_of_range_levels_are_rejected() {
    let gen = generator(GeneratorOptions::default());
    assert_eq!(gen.generate_level(0, "x"), Err(LevelError::InvalidLevel(0)));
    assert!(gen.generate_level(u32::MAX, "x").is_err());
}

// ============================================================================
// Scenario: first level
// ============================================================================

#[test]
fn test_first_level_scenario() {
    let gen = generator(GeneratorOptions::without_bosses());
    let def = gen.generate_level(1, "seedA").unwrap();
    let formulas = gen.config().formulas();

    assert_eq!(def.board_size, BoardSize::square(6));
    assert!(!def.is_boss);
    assert!((MOVES_MIN..=MOVES_MAX).contains(&def.moves));
    assert!((GOAL_MIN..=GOAL_MAX).contains(&def.goal_total()));
    assert!((def.blockers.density - formulas.calculate_density(1)).abs() < 1e-9);
    assert_eq!(def.primary_goal_type(), GoalType::Collect);
}

#[test]
fn test_boss_levels_are_tighter_than_neighbours() {
    let with = generator(GeneratorOptions::default());
    let without = generator(GeneratorOptions::without_bosses());
    let boss = with.generate_level(20, "boss").unwrap();
    let plain = without.generate_level(20, "boss").unwrap();
    assert!(boss.is_boss);
    assert!(!plain.is_boss);
    assert!(boss.moves <= plain.moves);
    assert!(boss.blockers.density >= plain.blockers.density);
}
