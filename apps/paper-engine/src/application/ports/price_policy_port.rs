//! Price Policy Port (Driven Port)
//!
//! Chooses which price on a tick an order is evaluated against, and which
//! price marks open positions.

use rust_decimal::Decimal;

use crate::application::dto::Tick;
use crate::domain::order_execution::value_objects::OrderSide;

/// Port for price selection.
pub trait PricePolicy: Send + Sync {
    /// Reference price for an order leg on `side`. `None` means no usable price.
    fn reference_price(&self, tick: &Tick, side: OrderSide) -> Option<Decimal>;

    /// Mark price for valuing positions.
    fn mark_price(&self, tick: &Tick) -> Option<Decimal>;
}

/// Default policy: buys take the ask, sells take the bid, falling back to the
/// last traded price.
///
/// With `prefer_quotes` off every evaluation uses the last traded price and
/// only falls back to the quote.
#[derive(Debug, Clone, Copy)]
pub struct QuoteFirstPolicy {
    prefer_quotes: bool,
}

impl QuoteFirstPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(prefer_quotes: bool) -> Self {
        Self { prefer_quotes }
    }
}

impl Default for QuoteFirstPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PricePolicy for QuoteFirstPolicy {
    fn reference_price(&self, tick: &Tick, side: OrderSide) -> Option<Decimal> {
        let quote = match side {
            OrderSide::Buy => tick.ask(),
            OrderSide::Sell => tick.bid(),
        };
        if self.prefer_quotes {
            quote.or_else(|| tick.last_price())
        } else {
            tick.last_price().or(quote)
        }
    }

    fn mark_price(&self, tick: &Tick) -> Option<Decimal> {
        tick.last_price()
            .or_else(|| tick.mid())
            .or_else(|| tick.bid())
            .or_else(|| tick.ask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Timestamp;
    use rust_decimal_macros::dec;

    fn tick() -> Tick {
        Tick::last("A", dec!(100), Timestamp::parse("2024-12-02T05:00:00Z").unwrap())
            .with_quote(dec!(99), dec!(99.5))
    }

    #[test]
    fn buys_take_ask_sells_take_bid() {
        let policy = QuoteFirstPolicy::default();
        assert_eq!(policy.reference_price(&tick(), OrderSide::Buy), Some(dec!(99.5)));
        assert_eq!(policy.reference_price(&tick(), OrderSide::Sell), Some(dec!(99)));
    }

    #[test]
    fn falls_back_to_last_price() {
        let policy = QuoteFirstPolicy::default();
        let mut t = tick();
        t.ask = None;
        assert_eq!(policy.reference_price(&t, OrderSide::Buy), Some(dec!(100)));
    }

    #[test]
    fn last_price_first_when_quotes_not_preferred() {
        let policy = QuoteFirstPolicy::new(false);
        assert_eq!(policy.reference_price(&tick(), OrderSide::Buy), Some(dec!(100)));
    }

    #[test]
    fn mark_prefers_last_then_mid() {
        let policy = QuoteFirstPolicy::default();
        assert_eq!(policy.mark_price(&tick()), Some(dec!(100)));
        let mut t = tick();
        t.last_price = None;
        assert_eq!(policy.mark_price(&t), Some(dec!(99.25)));
    }
}
