//! Position Bounded Context
//!
//! Aggregated holdings per (instrument, strategy), realized and unrealized
//! P&L, and the immutable trade history.
//!
//! # Key Concepts
//!
//! - **Position**: signed net quantity at a volume-weighted average price
//! - **Trade Record**: fee-inclusive result of closing quantity
//! - **Position Book**: the owner of every position, enforcing book invariants

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod position_book;
pub mod value_objects;

pub use aggregate::Position;
pub use errors::PositionError;
pub use events::{ExitTriggered, PortfolioPnl, PositionClosed, PositionEvent, PositionUpdated};
pub use position_book::{FillOutcome, PositionBook};
pub use value_objects::{ExitReason, PositionFill, TradeRecord};
