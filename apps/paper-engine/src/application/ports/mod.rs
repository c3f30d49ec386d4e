//! Application Ports (Driven)
//!
//! Ports define interfaces for the external collaborators the engine uses.
//! Pure-function ports are synchronous; I/O ports are async.

mod event_publisher_port;
mod fee_model_port;
mod instrument_lookup_port;
mod lot_validator_port;
mod price_policy_port;
mod state_store_port;

pub use event_publisher_port::{EventPublishError, EventPublisherPort, NoOpEventPublisher};
pub use fee_model_port::{FeeBreakdown, FeeModel, ZeroFeeModel};
pub use instrument_lookup_port::InstrumentLookup;
pub use lot_validator_port::{InstrumentLotValidator, LotValidator};
pub use price_policy_port::{PricePolicy, QuoteFirstPolicy};
pub use state_store_port::{StateStore, StoreError};
