//! Live balance configuration: tunable constants, difficulty phases, event
//! levels and A/B tests, shared between generator, estimator and analyzer.
//!
//! Writes go through a single `RwLock`; readers get an `Arc` snapshot that
//! stays valid after later updates. Listeners run after the lock is released.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::formulas::{BalanceConstants, BalanceFormulas, ConstantKey};
use crate::error::ConfigError;

/// Current config schema version.
pub const CONFIG_VERSION: &str = "1.0.0";

/// How analytics should treat a phase's win rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Early levels: high win rates are intended.
    Onboarding,
    Progression,
    /// Deliberately hard stretch: low win rates are intended.
    Challenge,
}

/// A named range of levels with a target difficulty (1-10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub start_level: u32,
    /// Inclusive. `None` makes this the open-ended catch-all phase.
    pub end_level: Option<u32>,
    pub target_difficulty: f64,
    pub kind: PhaseKind,
}

impl Phase {
    pub fn new(
        name: &str,
        start_level: u32,
        end_level: Option<u32>,
        target_difficulty: f64,
        kind: PhaseKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            start_level,
            end_level,
            target_difficulty,
            kind,
        }
    }

    pub fn contains(&self, level: u32) -> bool {
        level >= self.start_level && self.end_level.map_or(true, |end| level <= end)
    }
}

/// Hand-picked levels that override the regular curves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelEvents {
    pub boss_levels: Vec<u32>,
    pub easy_levels: Vec<u32>,
    pub hard_levels: Vec<u32>,
}

/// One arm of an A/B test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbVariant {
    pub name: String,
    pub value: f64,
    pub weight: f64,
}

/// A weighted experiment on one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTest {
    pub test_id: String,
    pub parameter: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub variants: Vec<AbVariant>,
}

fn default_enabled() -> bool {
    true
}

impl AbTest {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidAbTest {
            test_id: self.test_id.clone(),
            reason: reason.to_string(),
        };
        if self.variants.is_empty() {
            return Err(invalid("no variants"));
        }
        if self
            .variants
            .iter()
            .any(|v| !v.weight.is_finite() || v.weight < 0.0)
        {
            return Err(invalid("variant weights must be finite and non-negative"));
        }
        if self.variants.iter().map(|v| v.weight).sum::<f64>() <= 0.0 {
            return Err(invalid("total weight must be positive"));
        }
        Ok(())
    }
}

/// The full live-ops balance payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub version: String,
    #[serde(default)]
    pub constants: BalanceConstants,
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub events: LevelEvents,
    #[serde(default)]
    pub ab_tests: Vec<AbTest>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            constants: BalanceConstants::default(),
            phases: default_phases(),
            events: LevelEvents::default(),
            ab_tests: Vec::new(),
        }
    }
}

/// Onboarding through Mastery, strictly increasing in difficulty.
pub fn default_phases() -> Vec<Phase> {
    vec![
        Phase::new("Onboarding", 1, Some(10), 2.0, PhaseKind::Onboarding),
        Phase::new("Learning", 11, Some(30), 3.5, PhaseKind::Progression),
        Phase::new("Growth", 31, Some(60), 5.0, PhaseKind::Progression),
        Phase::new("Challenge", 61, Some(100), 6.5, PhaseKind::Challenge),
        Phase::new("Mastery", 101, None, 8.0, PhaseKind::Challenge),
    ]
}

impl BalanceConfig {
    /// Check phases are ordered, non-overlapping and increasing in difficulty,
    /// and that every A/B test is well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        let mut previous: Option<&Phase> = None;
        for (i, phase) in self.phases.iter().enumerate() {
            if phase.end_level.is_some_and(|end| end < phase.start_level) {
                return Err(ConfigError::EmptyPhase {
                    name: phase.name.clone(),
                });
            }
            if phase.end_level.is_none() && i + 1 != self.phases.len() {
                return Err(ConfigError::OpenPhaseNotLast {
                    name: phase.name.clone(),
                });
            }
            if let Some(prev) = previous {
                let prev_end = prev.end_level.unwrap_or(u32::MAX);
                if phase.start_level <= prev_end {
                    return Err(ConfigError::OverlappingPhases {
                        name: phase.name.clone(),
                    });
                }
                if phase.target_difficulty <= prev.target_difficulty {
                    return Err(ConfigError::NonIncreasingDifficulty {
                        name: phase.name.clone(),
                    });
                }
            }
            previous = Some(phase);
        }
        self.ab_tests.iter().try_for_each(AbTest::validate)
    }

    /// The phase containing `level`. Levels past every range fall to the last
    /// phase; levels before the first range use the first phase.
    pub fn phase_for(&self, level: u32) -> Option<&Phase> {
        self.phases
            .iter()
            .find(|p| p.contains(level))
            .or_else(|| match self.phases.first() {
                Some(first) if level < first.start_level => Some(first),
                _ => self.phases.last(),
            })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BalanceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Partial update. Present fields replace the current ones wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub version: Option<String>,
    pub constants: Option<BalanceConstants>,
    pub phases: Option<Vec<Phase>>,
    pub events: Option<LevelEvents>,
    pub ab_tests: Option<Vec<AbTest>>,
}

/// Callback invoked with the new config after every change.
pub type ConfigListener = Arc<dyn Fn(&BalanceConfig) + Send + Sync>;

/// Handle returned by `add_listener`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Owner of the live `BalanceConfig`.
pub struct BalanceConfigManager {
    config: RwLock<Arc<BalanceConfig>>,
    listeners: Mutex<Vec<(ListenerId, ConfigListener)>>,
    next_listener: AtomicU64,
}

impl Default for BalanceConfigManager {
    fn default() -> Self {
        Self::with_config(BalanceConfig::default())
    }
}

impl std::fmt::Debug for BalanceConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceConfigManager")
            .field("config", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl BalanceConfigManager {
    /// Build a manager around a validated config.
    pub fn new(config: BalanceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: BalanceConfig) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Current config. Cheap; later updates do not affect the returned value.
    pub fn snapshot(&self) -> Arc<BalanceConfig> {
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Formulas over the current constants.
    pub fn formulas(&self) -> BalanceFormulas {
        BalanceFormulas::new(self.snapshot().constants.clone())
    }

    pub fn get_constant(&self, key: ConstantKey) -> f64 {
        self.snapshot().constants.get(key)
    }

    /// Phase for a level. Always returns a phase since configs hold at least one.
    pub fn get_phase(&self, level: u32) -> Phase {
        self.snapshot()
            .phase_for(level)
            .cloned()
            .unwrap_or_else(|| Phase::new("Default", 1, None, 5.0, PhaseKind::Progression))
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.snapshot().phases.clone()
    }

    /// Edit a copy of the current config under the write lock and store it if
    /// `edit` succeeds. Listeners run after the lock is released.
    fn modify<E>(
        &self,
        edit: impl FnOnce(&mut BalanceConfig) -> Result<(), E>,
    ) -> Result<Arc<BalanceConfig>, E> {
        let next = {
            let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
            let mut next = BalanceConfig::clone(&guard);
            edit(&mut next)?;
            let next = Arc::new(next);
            *guard = Arc::clone(&next);
            next
        };
        self.notify(&next);
        Ok(next)
    }

    /// Store a whole new config.
    fn replace(&self, next: BalanceConfig) -> Arc<BalanceConfig> {
        match self.modify::<Infallible>(|config| {
            *config = next;
            Ok(())
        }) {
            Ok(config) => config,
            Err(never) => match never {},
        }
    }

    fn notify(&self, config: &BalanceConfig) {
        let listeners: Vec<ConfigListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(config);
        }
    }

    /// Apply a shallow patch. The patched config must still validate.
    pub fn update_config(&self, patch: ConfigPatch) -> Result<Arc<BalanceConfig>, ConfigError> {
        let updated = self.modify(|next| {
            if let Some(version) = patch.version {
                next.version = version;
            }
            if let Some(constants) = patch.constants {
                next.constants = constants;
            }
            if let Some(phases) = patch.phases {
                next.phases = phases;
            }
            if let Some(events) = patch.events {
                next.events = events;
            }
            if let Some(ab_tests) = patch.ab_tests {
                next.ab_tests = ab_tests;
            }
            next.validate()
        });
        match &updated {
            Ok(config) => log::info!("balance config updated to version {}", config.version),
            Err(e) => log::warn!("rejected balance config patch: {e}"),
        }
        updated
    }

    /// Set one tunable constant. Non-finite values are ignored and listeners
    /// are not called.
    pub fn update_constant(&self, key: ConstantKey, value: f64) -> Arc<BalanceConfig> {
        if !value.is_finite() {
            log::warn!("ignoring non-finite value for {key:?}");
            return self.snapshot();
        }
        match self.modify::<Infallible>(|next| {
            next.constants.set(key, value);
            Ok(())
        }) {
            Ok(config) => config,
            Err(never) => match never {},
        }
    }

    /// Subscribe to config changes.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&BalanceConfig) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Unsubscribe. Returns false if the id was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Register (or replace) an A/B test.
    pub fn add_ab_test(&self, test: AbTest) -> Result<(), ConfigError> {
        test.validate()?;
        self.modify(|next| {
            next.ab_tests.retain(|t| t.test_id != test.test_id);
            next.ab_tests.push(test);
            Ok(())
        })
        .map(|_| ())
    }

    /// Variant for a player. Same (player, test) pair always lands in the same
    /// variant. `None` for unknown or disabled tests.
    pub fn get_ab_test_variant(&self, player_id: &str, test_id: &str) -> Option<AbVariant> {
        let config = self.snapshot();
        let test = config
            .ab_tests
            .iter()
            .find(|t| t.test_id == test_id && t.enabled)?;
        let total: f64 = test.variants.iter().map(|v| v.weight).sum();
        if total <= 0.0 {
            return None;
        }
        let point = bucket_fraction(player_id, test_id) * total;
        let mut cumulative = 0.0;
        for variant in &test.variants {
            cumulative += variant.weight;
            if point < cumulative {
                return Some(variant.clone());
            }
        }
        test.variants.iter().rev().find(|v| v.weight > 0.0).cloned()
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        self.snapshot().to_json()
    }

    /// Replace the whole config from JSON.
    pub fn from_json(&self, json: &str) -> Result<(), ConfigError> {
        let config = BalanceConfig::from_json(json)?;
        self.replace(config);
        Ok(())
    }

    /// Restore compiled defaults.
    pub fn reset(&self) {
        self.replace(BalanceConfig::default());
    }
}

/// Stable fraction in [0, 1) for a (player, test) pair.
fn bucket_fraction(player_id: &str, test_id: &str) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(player_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(test_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
}
