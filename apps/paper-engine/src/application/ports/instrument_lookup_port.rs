//! Instrument Lookup Port (Driven Port)
//!
//! Resolves the stable tokens an external instrument mapper assigns. Adapters
//! use interior mutability so the engine can register instruments announced
//! on its input stream.

use crate::domain::instrument::Instrument;
use crate::domain::shared::InstrumentToken;

/// Port for resolving instruments.
pub trait InstrumentLookup: Send + Sync {
    /// Resolve a token.
    fn resolve(&self, token: &InstrumentToken) -> Option<Instrument>;

    /// Add or replace an instrument. Returns true if the token was new.
    fn register(&self, instrument: Instrument) -> bool;
}
