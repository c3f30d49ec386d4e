//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Records of state transitions
//! - **Domain Services**: Stateless business logic
//!
//! # Bounded Contexts
//!
//! - [`instrument`]: Option contracts and their lot sizes
//! - [`session`]: Market hours and validity boundaries
//! - [`order_execution`]: Order lifecycle and fill simulation
//! - [`stop_enforcement`]: Stop-loss and target monitoring
//! - [`position`]: Holdings, P&L and trade history

pub mod instrument;
pub mod order_execution;
pub mod position;
pub mod session;
pub mod shared;
pub mod stop_enforcement;
