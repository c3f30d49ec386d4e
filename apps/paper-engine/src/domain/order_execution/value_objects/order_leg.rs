//! One leg of an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderSide;
use crate::domain::shared::{InstrumentToken, Quantity};

/// A leg descriptor: instrument, side and ratio, plus the price it filled at.
///
/// Single-leg orders carry exactly one leg on the order's side with ratio 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLeg {
    /// Instrument traded by this leg.
    pub instrument: InstrumentToken,
    /// Leg side.
    pub side: OrderSide,
    /// Contracts per unit of order quantity.
    pub ratio: u32,
    /// Per-leg fill price once the order is filled.
    #[serde(default)]
    pub fill_price: Option<Decimal>,
}

impl OrderLeg {
    /// Create an unfilled leg.
    #[must_use]
    pub fn new(instrument: InstrumentToken, side: OrderSide, ratio: u32) -> Self {
        Self {
            instrument,
            side,
            ratio,
            fill_price: None,
        }
    }

    /// Contracts this leg trades for the given order quantity.
    #[must_use]
    pub fn quantity(&self, order_quantity: Quantity) -> Quantity {
        order_quantity.times(self.ratio).unwrap_or(Quantity::ZERO)
    }

    /// The same leg traded the other way, used to build exit orders.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.instrument.clone(), self.side.opposite(), self.ratio)
    }
}
