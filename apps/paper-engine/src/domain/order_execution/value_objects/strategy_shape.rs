//! Strategy shapes and their price-combination rule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::OrderSide;

/// The fixed set of order structures the engine understands.
///
/// Each shape has an exact leg count and a rule for how leg sides relate to
/// the order side. Prices combine the same way for every shape: a leg on the
/// order's side adds `ratio * price`, a leg on the opposite side subtracts it.
/// The result is a net debit for buy orders and a net credit for sell orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyShape {
    /// One instrument.
    Single,
    /// Two legs on opposite sides (vertical or calendar spread).
    Spread,
    /// Two legs on the order's side (straddle or strangle).
    Volatility,
}

impl StrategyShape {
    /// Number of legs this shape requires.
    #[must_use]
    pub const fn leg_count(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Spread | Self::Volatility => 2,
        }
    }

    /// Whether this shape has more than one leg.
    #[must_use]
    pub const fn is_multi_leg(&self) -> bool {
        !matches!(self, Self::Single)
    }

    /// Check leg count and leg sides against the order side.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch.
    pub fn validate_legs(&self, order_side: OrderSide, leg_sides: &[OrderSide]) -> Result<(), String> {
        if leg_sides.len() != self.leg_count() {
            return Err(format!(
                "{self} requires {} leg(s), got {}",
                self.leg_count(),
                leg_sides.len()
            ));
        }
        match self {
            Self::Single => {
                if leg_sides[0] != order_side {
                    return Err("single leg side must match the order side".to_string());
                }
            }
            Self::Spread => {
                let same = leg_sides.iter().filter(|s| **s == order_side).count();
                if same != 1 {
                    return Err("spread requires one leg on each side".to_string());
                }
            }
            Self::Volatility => {
                if leg_sides.iter().any(|s| *s != order_side) {
                    return Err("volatility legs must all be on the order side".to_string());
                }
            }
        }
        Ok(())
    }

    /// Signed contribution of one leg price to the net order price.
    #[must_use]
    pub fn leg_contribution(
        order_side: OrderSide,
        leg_side: OrderSide,
        ratio: u32,
        price: Decimal,
    ) -> Decimal {
        let weighted = price * Decimal::from(ratio);
        if leg_side == order_side { weighted } else { -weighted }
    }
}

impl fmt::Display for StrategyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "SINGLE"),
            Self::Spread => write!(f, "SPREAD"),
            Self::Volatility => write!(f, "VOLATILITY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn leg_counts() {
        assert_eq!(StrategyShape::Single.leg_count(), 1);
        assert_eq!(StrategyShape::Spread.leg_count(), 2);
        assert_eq!(StrategyShape::Volatility.leg_count(), 2);
    }

    #[test]
    fn spread_needs_opposite_sides() {
        let shape = StrategyShape::Spread;
        assert!(shape.validate_legs(OrderSide::Buy, &[OrderSide::Buy, OrderSide::Sell]).is_ok());
        assert!(shape.validate_legs(OrderSide::Buy, &[OrderSide::Buy, OrderSide::Buy]).is_err());
        assert!(shape.validate_legs(OrderSide::Buy, &[OrderSide::Buy]).is_err());
    }

    #[test]
    fn volatility_legs_follow_order_side() {
        let shape = StrategyShape::Volatility;
        assert!(shape.validate_legs(OrderSide::Sell, &[OrderSide::Sell, OrderSide::Sell]).is_ok());
        assert!(shape.validate_legs(OrderSide::Sell, &[OrderSide::Sell, OrderSide::Buy]).is_err());
    }

    #[test]
    fn single_leg_must_match_side() {
        assert!(StrategyShape::Single.validate_legs(OrderSide::Sell, &[OrderSide::Buy]).is_err());
    }

    #[test]
    fn net_debit_of_bull_call_spread() {
        let long = StrategyShape::leg_contribution(OrderSide::Buy, OrderSide::Buy, 1, dec!(120));
        let short = StrategyShape::leg_contribution(OrderSide::Buy, OrderSide::Sell, 1, dec!(45));
        assert_eq!(long + short, dec!(75));
    }

    #[test]
    fn ratio_weights_contribution() {
        let c = StrategyShape::leg_contribution(OrderSide::Sell, OrderSide::Sell, 2, dec!(10.5));
        assert_eq!(c, dec!(21.0));
    }
}
