//! Balance curves and the live configuration they read from.

pub mod config;
pub mod constants;
pub mod formulas;

pub use config::{
    default_phases, AbTest, AbVariant, BalanceConfig, BalanceConfigManager, ConfigPatch,
    LevelEvents, ListenerId, Phase, PhaseKind,
};
pub use formulas::{
    create_default_config, BalanceConstants, BalanceFormulas, ConstantKey, LevelAdjustment,
    LevelParams, ParamValidation, WinRateTarget,
};
