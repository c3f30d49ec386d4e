// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Paper Engine - Rust Core Library
//!
//! Paper-trading order execution and position engine for exchange-listed
//! index options. Orders are validated, filled against incoming ticks with
//! adverse slippage, and turned into positions whose stop-loss and target
//! levels are enforced on every tick.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `instrument`: Option contracts and lot sizes
//!   - `session`: Exchange trading window (IST)
//!   - `order_execution`: Order aggregate, lifecycle, fill simulation
//!   - `stop_enforcement`: Stop-loss / target triggers, strategy guards
//!   - `position`: Positions, average price, realized/unrealized P&L
//!
//! - **Application**: Orchestration
//!   - `ports`: Interfaces (`FeeModel`, `LotValidator`, `PricePolicy`, `StateStore`)
//!   - `services`: `ExecutionEngine` and the single-writer `EngineLoop`
//!   - `dto`: Trade requests, ticks, commands, engine events
//!
//! - **Infrastructure**: Adapters
//!   - `fees`: Broker fee schedules with statutory charges
//!   - `lots`: Exchange lot table
//!   - `instruments`: Instrument registry
//!   - `persistence`: JSON snapshot store
//!   - `events`: Log and recording event publishers
//!   - `config`: Dependency injection container

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Engine services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Engine error taxonomy.
pub mod error;

/// Prometheus metrics.
pub mod observability;

/// Tracing subscriber setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::instrument::{Instrument, InstrumentSpec, OptionKind};
pub use domain::order_execution::{
    Order, OrderSide, OrderStatus, OrderType, StrategyShape, Validity,
};
pub use domain::position::{ExitReason, Position, TradeRecord};
pub use domain::session::MarketSession;
pub use domain::shared::{
    InstrumentToken, Money, OrderId, PositionKey, Quantity, StrategyTag, Timestamp,
};
pub use domain::stop_enforcement::{SameTickPriority, StopTargetLevels};

// Application re-exports
pub use application::dto::{
    EngineEvent, EngineInput, EngineSnapshot, PortfolioSummary, Tick, TradeRequest,
};
pub use application::ports::{EventPublisherPort, FeeModel, LotValidator, StateStore};
pub use application::services::{
    EngineHandle, EngineLoop, EngineLoopConfig, EngineSettings, ExecutionEngine,
};

// Infrastructure re-exports
pub use infrastructure::config::Container;
pub use infrastructure::fees::{Brokerage, FeeSchedule, ScheduleFeeModel};
pub use infrastructure::persistence::{InMemoryStateStore, JsonFileStateStore};

pub use error::{EngineError, ErrorCode};
