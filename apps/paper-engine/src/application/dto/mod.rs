//! Data Transfer Objects (DTOs)
//!
//! DTOs are used at the engine boundary: inputs from producers, events and
//! summaries for subscribers, and the persisted snapshot.

mod commands;
mod events;
mod input;
mod snapshot;
mod summary;
mod tick;
mod trade_request;

pub use commands::{CancelCommand, ModifyCommand, ReconcileCommand, SquareOffCommand};
pub use events::{AlertEvent, DataGap, EngineEvent, StateCorruption};
pub use input::EngineInput;
pub use snapshot::{ClosedOrder, EngineSnapshot, HaltedKey, SNAPSHOT_VERSION};
pub use summary::PortfolioSummary;
pub use tick::Tick;
pub use trade_request::{LegRequest, MultiLegRequest, OrderTerms, SingleLegRequest, TradeRequest};
