//! Position key: one holding per (instrument, strategy).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{InstrumentToken, StrategyTag};

/// Key identifying an aggregated position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    /// Instrument held.
    pub instrument: InstrumentToken,
    /// Strategy the holding belongs to.
    pub strategy: StrategyTag,
}

impl PositionKey {
    /// Create a new position key.
    #[must_use]
    pub fn new(instrument: impl Into<InstrumentToken>, strategy: impl Into<StrategyTag>) -> Self {
        Self {
            instrument: instrument.into(),
            strategy: strategy.into(),
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instrument, self.strategy)
    }
}
