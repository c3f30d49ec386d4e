//! Stop Enforcement Value Objects

mod stop_config;
mod stop_target_levels;
mod strategy_guard;
mod trigger_result;

pub use stop_config::SameTickPriority;
pub use stop_target_levels::{PositionDirection, StopTargetLevels};
pub use strategy_guard::{GuardLeg, StrategyGuard};
pub use trigger_result::TriggerResult;
