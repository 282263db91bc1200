//! Simulation configuration.

use serde::{Deserialize, Serialize};

/// Playthroughs run by `quick_validate` when no count is given.
pub const QUICK_ITERATIONS: u32 = 20;

/// Configuration for a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of independent playthroughs
    pub iterations: u32,

    /// Base seed; playthrough `i` is seeded with `seed + i`
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            iterations: 200,
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn new(iterations: u32, seed: u64) -> Self {
        Self { iterations, seed }
    }

    /// Small run for smoke checks
    pub fn quick() -> Self {
        Self {
            iterations: QUICK_ITERATIONS,
            ..Default::default()
        }
    }

    /// Large run for tuning decisions
    pub fn thorough() -> Self {
        Self {
            iterations: 1000,
            ..Default::default()
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
}
