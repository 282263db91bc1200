//! Level balance simulator CLI.
//!
//! Generates a range of levels for one player seed, scores each statically,
//! validates it with Monte Carlo playthroughs and prints a report.
//!
//! Usage:
//!   cargo run --bin level-sim -- [OPTIONS]
//!
//! Examples:
//!   cargo run --bin level-sim                        # Levels 1-20, 100 runs each
//!   cargo run --bin level-sim -- --levels 40-60      # A later stretch
//!   cargo run --bin level-sim -- --suggest --json    # Formula suggestions as JSON

use levelforge::balance::{BalanceConfigManager, BalanceFormulas, LevelParams};
use levelforge::build_info;
use levelforge::difficulty::{DifficultyBreakdown, DifficultyEstimator};
use levelforge::level::{GeneratorOptions, LevelDef, LevelGenerator};
use levelforge::simulator::{validate, SimConfig, ValidationResult};
use serde::Serialize;
use std::fs;
use std::process;
use std::sync::Arc;

// ── CLI Configuration ────────────────────────────────────────────────

struct CliConfig {
    start: u32,
    end: u32,
    seed: String,
    iterations: u32,
    config_path: Option<String>,
    suggest: bool,
    json: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            start: 1,
            end: 20,
            seed: "level-sim".to_string(),
            iterations: 100,
            config_path: None,
            suggest: false,
            json: false,
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    print_usage();
    process::exit(1);
}

fn parse_range(value: &str) -> Option<(u32, u32)> {
    let (a, b) = match value.split_once('-') {
        Some((a, b)) => (a.trim().parse().ok()?, b.trim().parse().ok()?),
        None => {
            let level = value.trim().parse().ok()?;
            (level, level)
        }
    };
    (a >= 1 && a <= b).then_some((a, b))
}

fn parse_args() -> CliConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = CliConfig::default();
    let mut i = 1;
    let value = |i: usize, flag: &str| -> String {
        args.get(i)
            .cloned()
            .unwrap_or_else(|| fail(&format!("{flag} requires a value")))
    };
    while i < args.len() {
        match args[i].as_str() {
            "--levels" => {
                i += 1;
                (config.start, config.end) = parse_range(&value(i, "--levels"))
                    .unwrap_or_else(|| fail("--levels expects A-B with 1 <= A <= B"));
            }
            "--seed" => {
                i += 1;
                config.seed = value(i, "--seed");
            }
            "--iterations" => {
                i += 1;
                config.iterations = value(i, "--iterations")
                    .parse()
                    .unwrap_or_else(|_| fail("--iterations requires a number"));
            }
            "--config" => {
                i += 1;
                config.config_path = Some(value(i, "--config"));
            }
            "--suggest" => config.suggest = true,
            "--json" => config.json = true,
            "--version" | "-V" => {
                println!("{}", build_info::version_string());
                process::exit(0);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => fail(&format!("Unknown argument: {other}")),
        }
        i += 1;
    }
    config
}

fn print_usage() {
    eprintln!(
        "Level balance simulator\n\
         \n\
         Usage: level-sim [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --levels A-B      Level range (default: 1-20)\n\
         \x20 --seed S          Player seed (default: level-sim)\n\
         \x20 --iterations N    Playthroughs per level (default: 100)\n\
         \x20 --config FILE     Balance config JSON to load\n\
         \x20 --suggest         Print formula suggestions instead of simulating\n\
         \x20 --json            Print JSON instead of text\n\
         \x20 --version, -V     Show version\n\
         \x20 --help, -h        Show this help"
    );
}

// ── Per-level Results ────────────────────────────────────────────────

#[derive(Serialize)]
struct LevelReport {
    level: u32,
    moves: u32,
    goal_total: u32,
    coverage: f64,
    is_boss: bool,
    estimate: DifficultyBreakdown,
    validation: ValidationResult,
}

fn run_level(
    generator: &LevelGenerator,
    estimator: &DifficultyEstimator,
    config: &CliConfig,
    level: u32,
) -> Result<LevelReport, String> {
    let def: LevelDef = generator
        .generate_level(level, &config.seed)
        .map_err(|e| format!("level {level}: {e}"))?;
    let validation = validate(&def, &SimConfig::new(config.iterations, def.seed))
        .map_err(|e| format!("level {level}: {e}"))?;
    Ok(LevelReport {
        level,
        moves: def.moves,
        goal_total: def.goal_total(),
        coverage: def.blocker_coverage(),
        is_boss: def.is_boss,
        estimate: estimator.analyze_level(&def),
        validation,
    })
}

// ── Report Output ────────────────────────────────────────────────────

fn print_suggestions(suggestions: &[LevelParams]) {
    println!("Level  Moves  Goal  Density  Board  Boss  Est.Win");
    println!("─────  ─────  ────  ───────  ─────  ────  ───────");
    for p in suggestions {
        let check = BalanceFormulas::validate_level_params(p);
        println!(
            "{:>5}  {:>5}  {:>4}  {:>7.3}  {:>2}x{:<2}  {:>4}  {:>6.1}%{}",
            p.level,
            p.moves,
            p.goal_count,
            p.density,
            p.board_size.rows,
            p.board_size.cols,
            if p.is_boss { "yes" } else { "" },
            p.estimated_win_rate * 100.0,
            if check.valid { "" } else { "  ⚠️" }
        );
    }
}

fn print_table(reports: &[LevelReport]) {
    println!("Level  Moves  Goal  Moss   Est.  Sim.  Win%    Verdict");
    println!("─────  ─────  ────  ─────  ────  ────  ──────  ───────────");
    for r in reports {
        let verdict = if !r.validation.is_playable {
            "UNPLAYABLE"
        } else if !r.estimate.warnings.is_empty() {
            "CHECK"
        } else {
            "ok"
        };
        println!(
            "{:>5}{} {:>5}  {:>4}  {:>4.0}%  {:>4.1}  {:>4.1}  {:>5.1}%  {}",
            r.level,
            if r.is_boss { "*" } else { " " },
            r.moves,
            r.goal_total,
            r.coverage * 100.0,
            r.estimate.score,
            r.validation.difficulty_score,
            r.validation.win_rate * 100.0,
            verdict
        );
    }
}

fn print_summary(reports: &[LevelReport]) {
    let n = reports.len().max(1) as f64;
    let avg_win = reports.iter().map(|r| r.validation.win_rate).sum::<f64>() / n;
    let avg_est = reports.iter().map(|r| r.estimate.score).sum::<f64>() / n;
    let unplayable: Vec<u32> = reports
        .iter()
        .filter(|r| !r.validation.is_playable)
        .map(|r| r.level)
        .collect();

    println!();
    println!("── SUMMARY ──────────────────────────────────────────────────────");
    println!("  Levels:              {}", reports.len());
    println!("  Avg Win Rate:        {:.1}%", avg_win * 100.0);
    println!("  Avg Estimate:        {avg_est:.1} / 10");
    if unplayable.is_empty() {
        println!("  Unplayable:          none");
    } else {
        println!("  Unplayable:          {unplayable:?}");
    }
    for r in reports.iter().filter(|r| !r.estimate.warnings.is_empty()) {
        for warning in &r.estimate.warnings {
            println!("  ⚠️  level {}: {warning}", r.level);
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────────

fn main() {
    let config = parse_args();

    let manager = Arc::new(BalanceConfigManager::default());
    if let Some(path) = &config.config_path {
        let json = fs::read_to_string(path)
            .unwrap_or_else(|e| fail(&format!("cannot read {path}: {e}")));
        if let Err(e) = manager.from_json(&json) {
            fail(&format!("cannot load {path}: {e}"));
        }
    }

    if config.suggest {
        let suggestions = manager
            .formulas()
            .generate_level_suggestions(config.start, config.end);
        if config.json {
            match serde_json::to_string_pretty(&suggestions) {
                Ok(json) => println!("{json}"),
                Err(e) => fail(&format!("cannot encode suggestions: {e}")),
            }
        } else {
            print_suggestions(&suggestions);
        }
        return;
    }

    let generator = LevelGenerator::new(Arc::clone(&manager), GeneratorOptions::default());
    let estimator = DifficultyEstimator::new(Arc::clone(&manager));

    if !config.json {
        println!("╔═══════════════════════════════════════════════════════════════╗");
        println!("║              LEVEL BALANCE SIMULATOR                          ║");
        println!("╚═══════════════════════════════════════════════════════════════╝");
        println!();
        println!("  Levels:      {}-{}", config.start, config.end);
        println!("  Seed:        {}", config.seed);
        println!("  Iterations:  {}", config.iterations);
        println!();
    }

    let mut reports = Vec::new();
    for level in config.start..=config.end {
        match run_level(&generator, &estimator, &config, level) {
            Ok(report) => reports.push(report),
            Err(e) => eprintln!("skipping {e}"),
        }
    }

    if config.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(&format!("cannot encode report: {e}")),
        }
    } else {
        print_table(&reports);
        print_summary(&reports);
    }
}
