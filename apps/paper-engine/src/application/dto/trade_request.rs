//! Canonical trade request.
//!
//! Every producer (alert parsers, manual entry, replay files) converges on this
//! one tagged union. The engine never branches on where a request came from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::PlaceOrderCommand;
use crate::domain::order_execution::value_objects::{
    OrderLeg, OrderOrigin, OrderSide, OrderType, StrategyShape, Validity,
};
use crate::domain::shared::{InstrumentToken, OrderId, Quantity, StrategyTag};

/// One leg of a multi-leg request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRequest {
    /// Instrument token.
    pub instrument: InstrumentToken,
    /// Leg side.
    pub side: OrderSide,
    /// Contracts per unit of order quantity.
    #[serde(default = "default_ratio")]
    pub ratio: u32,
}

const fn default_ratio() -> u32 {
    1
}

/// Fields shared by every request shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerms {
    /// Strategy tag.
    pub strategy_tag: StrategyTag,
    /// Order side.
    pub side: OrderSide,
    /// Contracts, a whole number of lots.
    #[serde(alias = "quantity_lots")]
    pub quantity: Quantity,
    /// Order type.
    #[serde(default)]
    pub order_type: OrderType,
    /// Validity.
    #[serde(default)]
    pub validity: Validity,
    /// Limit price (net for multi-leg).
    pub limit_price: Decimal,
    /// Stop-loss (net for multi-leg).
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// Target (net for multi-leg).
    #[serde(default)]
    pub target: Option<Decimal>,
}

/// Single-instrument request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleLegRequest {
    /// Order terms.
    #[serde(flatten)]
    pub terms: OrderTerms,
    /// Instrument token.
    pub instrument: InstrumentToken,
}

/// Two-leg request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiLegRequest {
    /// Order terms.
    #[serde(flatten)]
    pub terms: OrderTerms,
    /// Legs.
    pub legs: Vec<LegRequest>,
}

/// Trade request tagged by strategy shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TradeRequest {
    /// One instrument.
    Single(SingleLegRequest),
    /// Two legs on opposite sides.
    Spread(MultiLegRequest),
    /// Two legs on the order side (straddle or strangle).
    Volatility(MultiLegRequest),
}

impl TradeRequest {
    /// Strategy shape.
    #[must_use]
    pub const fn shape(&self) -> StrategyShape {
        match self {
            Self::Single(_) => StrategyShape::Single,
            Self::Spread(_) => StrategyShape::Spread,
            Self::Volatility(_) => StrategyShape::Volatility,
        }
    }

    /// Shared order terms.
    #[must_use]
    pub const fn terms(&self) -> &OrderTerms {
        match self {
            Self::Single(r) => &r.terms,
            Self::Spread(r) | Self::Volatility(r) => &r.terms,
        }
    }

    /// Build the placement command under an engine-assigned id.
    #[must_use]
    pub fn to_command(&self, id: OrderId) -> PlaceOrderCommand {
        let terms = self.terms();
        let legs = match self {
            Self::Single(r) => vec![OrderLeg::new(r.instrument.clone(), terms.side, 1)],
            Self::Spread(r) | Self::Volatility(r) => r
                .legs
                .iter()
                .map(|l| OrderLeg::new(l.instrument.clone(), l.side, l.ratio))
                .collect(),
        };
        PlaceOrderCommand {
            id,
            strategy_tag: terms.strategy_tag.clone(),
            shape: self.shape(),
            side: terms.side,
            order_type: terms.order_type,
            quantity: terms.quantity,
            limit_price: terms.limit_price,
            validity: terms.validity,
            stop_loss: terms.stop_loss,
            target: terms.target,
            legs,
            origin: OrderOrigin::Request,
        }
    }
}
