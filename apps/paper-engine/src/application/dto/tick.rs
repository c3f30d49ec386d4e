//! Market tick as emitted by the data source.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{InstrumentToken, Timestamp};

/// One market data update for an instrument.
///
/// Absent price fields mean "no data", never zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument token.
    pub instrument_token: InstrumentToken,
    /// Last traded price.
    #[serde(default, alias = "ltp")]
    pub last_price: Option<Decimal>,
    /// Best bid.
    #[serde(default)]
    pub bid: Option<Decimal>,
    /// Best ask.
    #[serde(default)]
    pub ask: Option<Decimal>,
    /// Traded volume.
    #[serde(default)]
    pub volume: Option<u64>,
    /// Exchange timestamp.
    pub timestamp: Timestamp,
}

impl Tick {
    /// Create a tick carrying only a last traded price.
    #[must_use]
    pub fn last(instrument_token: impl Into<InstrumentToken>, price: Decimal, timestamp: Timestamp) -> Self {
        Self {
            instrument_token: instrument_token.into(),
            last_price: Some(price),
            bid: None,
            ask: None,
            volume: None,
            timestamp,
        }
    }

    /// Add a bid/ask quote.
    #[must_use]
    pub const fn with_quote(mut self, bid: Decimal, ask: Decimal) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Mid of bid and ask when both are present and positive.
    #[must_use]
    pub fn mid(&self) -> Option<Decimal> {
        match (positive(self.bid), positive(self.ask)) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Positive last price.
    #[must_use]
    pub fn last_price(&self) -> Option<Decimal> {
        positive(self.last_price)
    }

    /// Positive bid.
    #[must_use]
    pub fn bid(&self) -> Option<Decimal> {
        positive(self.bid)
    }

    /// Positive ask.
    #[must_use]
    pub fn ask(&self) -> Option<Decimal> {
        positive(self.ask)
    }

    /// Returns true if the tick carries no usable price.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_price().is_none() && self.bid().is_none() && self.ask().is_none()
    }
}

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts() -> Timestamp {
        Timestamp::parse("2024-12-02T05:00:00Z").unwrap()
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let tick: Tick = serde_json::from_str(
            r#"{"instrument_token": "NIFTY24DEC24000CE", "ltp": "101.5", "timestamp": "2024-12-02T05:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(tick.last_price(), Some(dec!(101.5)));
        assert_eq!(tick.bid(), None);
        assert!(!tick.is_empty());
    }

    #[test]
    fn zero_prices_count_as_missing() {
        let mut tick = Tick::last("A", dec!(0), ts());
        tick.bid = Some(dec!(0));
        assert!(tick.is_empty());
        assert_eq!(tick.mid(), None);
    }

    #[test]
    fn mid_from_quote() {
        let tick = Tick::last("A", dec!(100), ts()).with_quote(dec!(99), dec!(101));
        assert_eq!(tick.mid(), Some(dec!(100)));
    }
}
