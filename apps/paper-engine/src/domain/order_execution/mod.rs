//! Order Execution Bounded Context
//!
//! Manages the order lifecycle from placement to a terminal state.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: The root entity managing order state transitions
//! - **Order Book**: The engine-owned store of every order and the pending index
//! - **Fill Simulator**: Adverse slippage and limit crossing per strategy shape
//! - **Domain Events**: Capturing all state transitions

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod order_book;
pub mod services;
pub mod value_objects;

pub use aggregate::{Order, OrderFill, PlaceOrderCommand};
pub use errors::OrderError;
pub use events::{
    CancelRejected, LegFill, OrderCancelled, OrderChanges, OrderEvent, OrderExpired, OrderFilled,
    OrderModified, OrderPlaced, OrderRejected,
};
pub use order_book::OrderBook;
pub use services::{FillQuote, FillSimulator, OrderStateMachine, SlippageModel};
pub use value_objects::{
    CancelReason, OrderLeg, OrderOrigin, OrderSide, OrderStatus, OrderType, RejectReason,
    StrategyShape, Validity,
};
