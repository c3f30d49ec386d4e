//! Order Execution Domain Services
//!
//! Stateless business logic that doesn't fit in aggregates.

mod fill_simulator;
mod order_state_machine;

pub use fill_simulator::{FillQuote, FillSimulator, SlippageModel};
pub use order_state_machine::OrderStateMachine;
