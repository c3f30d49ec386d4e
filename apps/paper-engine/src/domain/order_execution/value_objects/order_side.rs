//! Order side (buy or sell).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy order.
    #[serde(alias = "buy", alias = "B")]
    Buy,
    /// Sell order.
    #[serde(alias = "sell", alias = "S")]
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns the sign for position calculations.
    ///
    /// Buy = +1, Sell = -1
    #[must_use]
    pub const fn sign(&self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

    /// Sign as a decimal multiplier.
    #[must_use]
    pub fn decimal_sign(&self) -> Decimal {
        Decimal::from(self.sign())
    }

    /// Whether an execution price satisfies a limit for this side.
    ///
    /// Buys fill at or below the limit, sells at or above it.
    #[must_use]
    pub fn crosses(&self, execution_price: Decimal, limit: Decimal) -> bool {
        match self {
            Self::Buy => execution_price <= limit,
            Self::Sell => execution_price >= limit,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}
