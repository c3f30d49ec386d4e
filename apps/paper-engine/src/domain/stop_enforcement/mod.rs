//! Stop Enforcement Bounded Context
//!
//! Stop-loss and target monitoring for open positions. Single-leg levels live
//! on the position itself. Multi-leg strategies are guarded at the net level by
//! a [`StrategyGuard`] so that a trigger exits every leg together.

pub mod services;
pub mod value_objects;

pub use services::PriceMonitor;
pub use value_objects::{
    GuardLeg, PositionDirection, SameTickPriority, StopTargetLevels, StrategyGuard, TriggerResult,
};
