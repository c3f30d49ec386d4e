//! In-memory instrument registry.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::application::ports::InstrumentLookup;
use crate::domain::instrument::Instrument;
use crate::domain::shared::InstrumentToken;

/// Instrument registry keyed by token.
#[derive(Debug, Default)]
pub struct InMemoryInstrumentRegistry {
    instruments: RwLock<HashMap<InstrumentToken, Instrument>>,
}

impl InMemoryInstrumentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry preloaded with instruments.
    #[must_use]
    pub fn with_instruments(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            instruments: RwLock::new(
                instruments
                    .into_iter()
                    .map(|i| (i.token().clone(), i))
                    .collect(),
            ),
        }
    }

    /// Number of registered instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instruments.read().len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruments.read().is_empty()
    }
}

impl InstrumentLookup for InMemoryInstrumentRegistry {
    fn resolve(&self, token: &InstrumentToken) -> Option<Instrument> {
        self.instruments.read().get(token).cloned()
    }

    fn register(&self, instrument: Instrument) -> bool {
        self.instruments
            .write()
            .insert(instrument.token().clone(), instrument)
            .is_none()
    }
}
