//! Stop Target Levels Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::value_objects::OrderSide;

/// Position direction for stop/target calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionDirection {
    /// Long position (buy to open).
    Long,
    /// Short position (sell to open).
    Short,
}

impl PositionDirection {
    /// Direction of a signed net quantity. `None` when flat.
    #[must_use]
    pub const fn from_net(net_quantity: i64) -> Option<Self> {
        if net_quantity > 0 {
            Some(Self::Long)
        } else if net_quantity < 0 {
            Some(Self::Short)
        } else {
            None
        }
    }

    /// +1 for long, -1 for short.
    #[must_use]
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Side of the order that opens a position in this direction.
    #[must_use]
    pub const fn entry_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Side of the order that closes a position in this direction.
    #[must_use]
    pub const fn exit_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Sell,
            Self::Short => OrderSide::Buy,
        }
    }
}

impl From<OrderSide> for PositionDirection {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Long,
            OrderSide::Sell => Self::Short,
        }
    }
}

impl std::fmt::Display for PositionDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Optional stop-loss and target attached to a position or strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTargetLevels {
    /// Stop-loss price level.
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// Target price level.
    #[serde(default)]
    pub target: Option<Decimal>,
}

impl StopTargetLevels {
    /// Create levels.
    #[must_use]
    pub const fn new(stop_loss: Option<Decimal>, target: Option<Decimal>) -> Self {
        Self { stop_loss, target }
    }

    /// No levels.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            stop_loss: None,
            target: None,
        }
    }

    /// Returns true if neither level is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stop_loss.is_none() && self.target.is_none()
    }

    /// Combine with the levels of a fill that adds to the position.
    ///
    /// Long positions keep the higher of each level, short positions the
    /// lower. A level missing on one side takes the other side's value.
    #[must_use]
    pub fn merge(self, other: Self, direction: PositionDirection) -> Self {
        let pick = |a: Option<Decimal>, b: Option<Decimal>| match (a, b) {
            (Some(x), Some(y)) => Some(match direction {
                PositionDirection::Long => x.max(y),
                PositionDirection::Short => x.min(y),
            }),
            (x, y) => x.or(y),
        };
        Self {
            stop_loss: pick(self.stop_loss, other.stop_loss),
            target: pick(self.target, other.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn direction_from_net() {
        assert_eq!(PositionDirection::from_net(25), Some(PositionDirection::Long));
        assert_eq!(PositionDirection::from_net(-25), Some(PositionDirection::Short));
        assert_eq!(PositionDirection::from_net(0), None);
    }

    #[test]
    fn direction_sides() {
        assert_eq!(PositionDirection::Long.exit_side(), OrderSide::Sell);
        assert_eq!(PositionDirection::Short.exit_side(), OrderSide::Buy);
        assert_eq!(PositionDirection::Short.entry_side(), OrderSide::Sell);
        assert_eq!(PositionDirection::from(OrderSide::Buy), PositionDirection::Long);
    }

    #[test]
    fn merge_long_keeps_higher_levels() {
        let first = StopTargetLevels::new(Some(dec!(90)), Some(dec!(120)));
        let second = StopTargetLevels::new(Some(dec!(95)), Some(dec!(115)));
        let merged = first.merge(second, PositionDirection::Long);
        assert_eq!(merged.stop_loss, Some(dec!(95)));
        assert_eq!(merged.target, Some(dec!(120)));
    }

    #[test]
    fn merge_short_keeps_lower_levels() {
        let first = StopTargetLevels::new(Some(dec!(110)), Some(dec!(80)));
        let second = StopTargetLevels::new(Some(dec!(105)), Some(dec!(85)));
        let merged = first.merge(second, PositionDirection::Short);
        assert_eq!(merged.stop_loss, Some(dec!(105)));
        assert_eq!(merged.target, Some(dec!(80)));
    }

    #[test]
    fn merge_fills_missing_levels() {
        let first = StopTargetLevels::new(None, Some(dec!(120)));
        let second = StopTargetLevels::new(Some(dec!(90)), None);
        let merged = first.merge(second, PositionDirection::Long);
        assert_eq!(merged, StopTargetLevels::new(Some(dec!(90)), Some(dec!(120))));
        assert!(StopTargetLevels::none().is_empty());
    }
}
