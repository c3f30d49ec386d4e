//! Strategy Guard Value Object
//!
//! Net-level stop/target for a filled multi-leg order. The guard prices the
//! strategy from its legs' marks with the same sign convention used at entry,
//! and exits all legs together when a level is reached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PositionDirection, StopTargetLevels};
use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::value_objects::{OrderLeg, OrderSide, StrategyShape};
use crate::domain::shared::{InstrumentToken, OrderId, PositionKey, Quantity, StrategyTag};

/// One leg watched by a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardLeg {
    /// Instrument.
    pub instrument: InstrumentToken,
    /// Side the leg was entered on.
    pub side: OrderSide,
    /// Contracts per unit of strategy quantity.
    pub ratio: u32,
}

/// Net-level stop/target over the legs of one multi-leg strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyGuard {
    entry_order: OrderId,
    strategy: StrategyTag,
    shape: StrategyShape,
    side: OrderSide,
    quantity: Quantity,
    legs: Vec<GuardLeg>,
    levels: StopTargetLevels,
}

impl StrategyGuard {
    /// Build a guard for a filled multi-leg order that carries levels.
    ///
    /// Returns `None` for single-leg orders and orders without levels.
    #[must_use]
    pub fn from_order(order: &Order) -> Option<Self> {
        let levels = StopTargetLevels::new(order.stop_loss(), order.target());
        if !order.shape().is_multi_leg() || levels.is_empty() {
            return None;
        }
        Some(Self {
            entry_order: order.id().clone(),
            strategy: order.strategy_tag().clone(),
            shape: order.shape(),
            side: order.side(),
            quantity: order.quantity(),
            legs: order
                .legs()
                .iter()
                .map(|l| GuardLeg {
                    instrument: l.instrument.clone(),
                    side: l.side,
                    ratio: l.ratio,
                })
                .collect(),
            levels,
        })
    }

    /// Identity of the strategy: tag plus the sorted set of leg instruments.
    ///
    /// Two fills with the same identity belong to the same guarded strategy.
    #[must_use]
    pub fn identity(&self) -> String {
        let mut tokens: Vec<&str> = self.legs.iter().map(|l| l.instrument.as_str()).collect();
        tokens.sort_unstable();
        format!("{}:{}", self.strategy, tokens.join("+"))
    }

    /// Order that opened the guard.
    #[must_use]
    pub const fn entry_order(&self) -> &OrderId {
        &self.entry_order
    }

    /// Strategy tag.
    #[must_use]
    pub const fn strategy(&self) -> &StrategyTag {
        &self.strategy
    }

    /// Strategy shape.
    #[must_use]
    pub const fn shape(&self) -> StrategyShape {
        self.shape
    }

    /// Entry side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Open strategy quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Guarded legs.
    #[must_use]
    pub fn legs(&self) -> &[GuardLeg] {
        &self.legs
    }

    /// Net levels.
    #[must_use]
    pub const fn levels(&self) -> &StopTargetLevels {
        &self.levels
    }

    /// Direction of the net position.
    #[must_use]
    pub fn direction(&self) -> PositionDirection {
        PositionDirection::from(self.side)
    }

    /// Position keys of every leg.
    pub fn position_keys(&self) -> impl Iterator<Item = PositionKey> + '_ {
        self.legs
            .iter()
            .map(|l| PositionKey::new(l.instrument.clone(), self.strategy.clone()))
    }

    /// Whether any leg trades `instrument`.
    #[must_use]
    pub fn watches(&self, instrument: &InstrumentToken) -> bool {
        self.legs.iter().any(|l| &l.instrument == instrument)
    }

    /// Net strategy price from per-leg marks. `None` if any leg has no mark.
    pub fn net_mark<F>(&self, mut mark: F) -> Option<Decimal>
    where
        F: FnMut(&InstrumentToken) -> Option<Decimal>,
    {
        self.legs.iter().try_fold(Decimal::ZERO, |acc, leg| {
            let price = mark(&leg.instrument)?;
            Some(acc + StrategyShape::leg_contribution(self.side, leg.side, leg.ratio, price))
        })
    }

    /// Legs of the order that exits the strategy.
    #[must_use]
    pub fn exit_legs(&self) -> Vec<OrderLeg> {
        self.legs
            .iter()
            .map(|l| OrderLeg::new(l.instrument.clone(), l.side.opposite(), l.ratio))
            .collect()
    }

    /// Fold a later fill of the same strategy into the guard.
    ///
    /// Same-side fills add quantity and merge levels in the position's favour.
    /// Opposite-side fills reduce quantity. Returns `false` once the strategy
    /// is flat.
    pub fn absorb(&mut self, side: OrderSide, quantity: Quantity, levels: StopTargetLevels) -> bool {
        if side == self.side {
            self.quantity = Quantity::new(self.quantity.units().saturating_add(quantity.units()));
            self.levels = self.levels.merge(levels, self.direction());
        } else {
            self.quantity = Quantity::new(self.quantity.units().saturating_sub(quantity.units()));
        }
        !self.quantity.is_zero()
    }

    /// Cap the open quantity, used when leg positions were closed elsewhere.
    pub fn clamp_quantity(&mut self, max: Quantity) {
        if max < self.quantity {
            self.quantity = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::aggregate::PlaceOrderCommand;
    use crate::domain::order_execution::value_objects::{OrderOrigin, OrderType, Validity};
    use crate::domain::shared::Timestamp;
    use rust_decimal_macros::dec;

    fn straddle(stop_loss: Option<Decimal>) -> Order {
        Order::place(
            PlaceOrderCommand {
                id: OrderId::sequential(7),
                strategy_tag: StrategyTag::new("theta"),
                shape: StrategyShape::Volatility,
                side: OrderSide::Sell,
                order_type: OrderType::Limit,
                quantity: Quantity::new(25),
                limit_price: dec!(200),
                validity: Validity::Day,
                stop_loss,
                target: None,
                legs: vec![
                    OrderLeg::new(InstrumentToken::new("PE"), OrderSide::Sell, 1),
                    OrderLeg::new(InstrumentToken::new("CE"), OrderSide::Sell, 1),
                ],
                origin: OrderOrigin::Request,
            },
            Timestamp::parse("2024-12-02T05:00:00Z").unwrap(),
            None,
        )
    }

    #[test]
    fn no_guard_without_levels() {
        assert!(StrategyGuard::from_order(&straddle(None)).is_none());
    }

    #[test]
    fn guard_prices_net_credit() {
        let guard = StrategyGuard::from_order(&straddle(Some(dec!(260)))).unwrap();
        assert_eq!(guard.direction(), PositionDirection::Short);
        assert_eq!(guard.identity(), "theta:CE+PE");
        let net = guard.net_mark(|t| match t.as_str() {
            "CE" => Some(dec!(150)),
            "PE" => Some(dec!(120)),
            _ => None,
        });
        assert_eq!(net, Some(dec!(270)));
    }

    #[test]
    fn net_mark_needs_every_leg() {
        let guard = StrategyGuard::from_order(&straddle(Some(dec!(260)))).unwrap();
        assert_eq!(
            guard.net_mark(|t| (t.as_str() == "CE").then_some(dec!(1))),
            None
        );
    }

    #[test]
    fn exit_legs_reverse_sides() {
        let guard = StrategyGuard::from_order(&straddle(Some(dec!(260)))).unwrap();
        assert!(guard.exit_legs().iter().all(|l| l.side == OrderSide::Buy));
    }

    #[test]
    fn absorb_adds_and_reduces() {
        let mut guard = StrategyGuard::from_order(&straddle(Some(dec!(260)))).unwrap();
        assert!(guard.absorb(
            OrderSide::Sell,
            Quantity::new(25),
            StopTargetLevels::new(Some(dec!(250)), None)
        ));
        assert_eq!(guard.quantity(), Quantity::new(50));
        assert_eq!(guard.levels().stop_loss, Some(dec!(250)));
        assert!(!guard.absorb(OrderSide::Buy, Quantity::new(50), StopTargetLevels::none()));
    }
}
