//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;
mod money;
mod position_key;
mod quantity;
mod timestamp;

pub use identifiers::{InstrumentToken, OrderId, StrategyTag, TradeId};
pub use money::Money;
pub use position_key::PositionKey;
pub use quantity::Quantity;
pub use timestamp::Timestamp;
