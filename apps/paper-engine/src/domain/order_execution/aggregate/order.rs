//! Order Aggregate Root
//!
//! The Order aggregate manages the lifecycle of one simulated trading
//! instruction: `Pending` until a tick crosses its limit, then exactly one of
//! `Filled`, `Cancelled` or `Expired`. Orders that fail validation are created
//! directly in `Rejected`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::events::{
    LegFill, OrderCancelled, OrderChanges, OrderEvent, OrderExpired, OrderFilled, OrderModified,
    OrderPlaced, OrderRejected,
};
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{
    CancelReason, OrderLeg, OrderOrigin, OrderSide, OrderStatus, OrderType, RejectReason,
    StrategyShape, Validity,
};
use crate::domain::shared::{InstrumentToken, Money, OrderId, Quantity, StrategyTag, Timestamp};

/// Command to place a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderCommand {
    /// Engine-assigned order id.
    pub id: OrderId,
    /// Strategy tag.
    pub strategy_tag: StrategyTag,
    /// Strategy shape.
    pub shape: StrategyShape,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity per unit of leg ratio.
    pub quantity: Quantity,
    /// Limit price (net for multi-leg orders).
    pub limit_price: Decimal,
    /// Validity.
    pub validity: Validity,
    /// Stop-loss level (net for multi-leg orders).
    pub stop_loss: Option<Decimal>,
    /// Target level (net for multi-leg orders).
    pub target: Option<Decimal>,
    /// Legs. Single-leg orders carry one.
    pub legs: Vec<OrderLeg>,
    /// Who created the order.
    pub origin: OrderOrigin,
}

impl PlaceOrderCommand {
    /// Validate the parts of the command that need no external lookup.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason for the first failed check.
    pub fn validate(&self) -> Result<(), RejectReason> {
        if self.quantity.is_zero() {
            return Err(RejectReason::invalid_quantity("quantity must be positive"));
        }

        let sides: Vec<OrderSide> = self.legs.iter().map(|l| l.side).collect();
        self.shape
            .validate_legs(self.side, &sides)
            .map_err(|e| RejectReason::invalid_legs(&e))?;

        for leg in &self.legs {
            if leg.ratio == 0 {
                return Err(RejectReason::invalid_legs("leg ratio must be positive"));
            }
            if self.quantity.times(leg.ratio).is_none() {
                return Err(RejectReason::invalid_quantity("leg quantity overflows"));
            }
        }
        if self.shape.is_multi_leg() && self.legs[0].instrument == self.legs[1].instrument {
            return Err(RejectReason::invalid_legs("legs must trade different instruments"));
        }

        check_levels(self.side, self.limit_price, self.stop_loss, self.target)
    }
}

/// Check limit, stop-loss and target against each other for the order side.
fn check_levels(
    side: OrderSide,
    limit: Decimal,
    stop_loss: Option<Decimal>,
    target: Option<Decimal>,
) -> Result<(), RejectReason> {
    if limit <= Decimal::ZERO {
        return Err(RejectReason::invalid_price(&format!(
            "limit price must be positive, got {limit}"
        )));
    }
    if let Some(sl) = stop_loss {
        let ok = match side {
            OrderSide::Buy => sl > Decimal::ZERO && sl < limit,
            OrderSide::Sell => sl > limit,
        };
        if !ok {
            return Err(RejectReason::invalid_stop_target(&format!(
                "stop-loss {sl} is on the wrong side of limit {limit} for a {side} order"
            )));
        }
    }
    if let Some(tp) = target {
        let ok = match side {
            OrderSide::Buy => tp > limit,
            OrderSide::Sell => tp > Decimal::ZERO && tp < limit,
        };
        if !ok {
            return Err(RejectReason::invalid_stop_target(&format!(
                "target {tp} is on the wrong side of limit {limit} for a {side} order"
            )));
        }
    }
    Ok(())
}

/// Execution details handed to [`Order::fill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFill {
    /// Per-leg fills in leg order.
    pub legs: Vec<LegFill>,
    /// Net combined price.
    pub net_price: Decimal,
    /// Fill time.
    pub at: Timestamp,
}

/// Order Aggregate Root.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    strategy_tag: StrategyTag,
    shape: StrategyShape,
    side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    limit_price: Decimal,
    validity: Validity,
    stop_loss: Option<Decimal>,
    target: Option<Decimal>,
    legs: Vec<OrderLeg>,
    origin: OrderOrigin,
    status: OrderStatus,
    status_reason: Option<String>,
    expires_at: Option<Timestamp>,
    filled_price: Option<Decimal>,
    filled_at: Option<Timestamp>,
    fees: Money,
    evaluations: u32,
    #[serde(skip)]
    events: Vec<OrderEvent>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Create a pending order from a validated command.
    ///
    /// Generates an `OrderPlaced` event.
    #[must_use]
    pub fn place(cmd: PlaceOrderCommand, at: Timestamp, expires_at: Option<Timestamp>) -> Self {
        let mut order = Self::from_command(cmd, OrderStatus::Pending, at);
        order.expires_at = expires_at;
        order.events.push(OrderEvent::Placed(OrderPlaced {
            order_id: order.id.clone(),
            strategy_tag: order.strategy_tag.clone(),
            shape: order.shape,
            side: order.side,
            quantity: order.quantity,
            limit_price: order.limit_price,
            validity: order.validity,
            stop_loss: order.stop_loss,
            target: order.target,
            legs: order.legs.clone(),
            origin: order.origin,
            occurred_at: at,
        }));
        order
    }

    /// Create an order that failed validation.
    ///
    /// Generates an `OrderRejected` event. The order never becomes pending.
    #[must_use]
    pub fn rejected(cmd: PlaceOrderCommand, reason: RejectReason, at: Timestamp) -> Self {
        let mut order = Self::from_command(cmd, OrderStatus::Rejected, at);
        order.status_reason = Some(reason.to_string());
        order.events.push(OrderEvent::Rejected(OrderRejected {
            order_id: order.id.clone(),
            strategy_tag: order.strategy_tag.clone(),
            reason,
            occurred_at: at,
        }));
        order
    }

    fn from_command(cmd: PlaceOrderCommand, status: OrderStatus, at: Timestamp) -> Self {
        Self {
            id: cmd.id,
            strategy_tag: cmd.strategy_tag,
            shape: cmd.shape,
            side: cmd.side,
            order_type: cmd.order_type,
            quantity: cmd.quantity,
            limit_price: cmd.limit_price,
            validity: cmd.validity,
            stop_loss: cmd.stop_loss,
            target: cmd.target,
            legs: cmd.legs,
            origin: cmd.origin,
            status,
            status_reason: None,
            expires_at: None,
            filled_price: None,
            filled_at: None,
            fees: Money::ZERO,
            evaluations: 0,
            events: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Order id.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Strategy tag.
    #[must_use]
    pub const fn strategy_tag(&self) -> &StrategyTag {
        &self.strategy_tag
    }

    /// Strategy shape.
    #[must_use]
    pub const fn shape(&self) -> StrategyShape {
        self.shape
    }

    /// Order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Quantity per unit of leg ratio.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Limit price.
    #[must_use]
    pub const fn limit_price(&self) -> Decimal {
        self.limit_price
    }

    /// Validity.
    #[must_use]
    pub const fn validity(&self) -> Validity {
        self.validity
    }

    /// Stop-loss level.
    #[must_use]
    pub const fn stop_loss(&self) -> Option<Decimal> {
        self.stop_loss
    }

    /// Target level.
    #[must_use]
    pub const fn target(&self) -> Option<Decimal> {
        self.target
    }

    /// Legs.
    #[must_use]
    pub fn legs(&self) -> &[OrderLeg] {
        &self.legs
    }

    /// Instruments traded by this order.
    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentToken> {
        self.legs.iter().map(|l| &l.instrument)
    }

    /// Whether the order trades `instrument` on any leg.
    #[must_use]
    pub fn trades(&self, instrument: &InstrumentToken) -> bool {
        self.legs.iter().any(|l| &l.instrument == instrument)
    }

    /// Who created the order.
    #[must_use]
    pub const fn origin(&self) -> OrderOrigin {
        self.origin
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Reason attached to the latest terminal transition.
    #[must_use]
    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    /// Session boundary after which a pending order expires.
    #[must_use]
    pub const fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Net fill price once filled.
    #[must_use]
    pub const fn filled_price(&self) -> Option<Decimal> {
        self.filled_price
    }

    /// Fill time once filled.
    #[must_use]
    pub const fn filled_at(&self) -> Option<Timestamp> {
        self.filled_at
    }

    /// Fees charged on the fill.
    #[must_use]
    pub const fn fees(&self) -> Money {
        self.fees
    }

    /// Number of tick evaluations that did not fill the order.
    #[must_use]
    pub const fn evaluations(&self) -> u32 {
        self.evaluations
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Last update time.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true if the order is pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.status.is_active()
    }

    /// Returns true if the validity window has elapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|boundary| now >= boundary)
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Fill the order.
    ///
    /// Generates an `OrderFilled` event.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not pending or the legs do not match.
    pub fn fill(&mut self, fill: OrderFill) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Filled)?;
        if fill.legs.len() != self.legs.len() {
            return Err(OrderError::InvalidParameters {
                field: "legs".to_string(),
                message: format!(
                    "fill has {} legs, order has {}",
                    fill.legs.len(),
                    self.legs.len()
                ),
            });
        }

        for (leg, leg_fill) in self.legs.iter_mut().zip(&fill.legs) {
            leg.fill_price = Some(leg_fill.price);
        }
        self.fees = fill.legs.iter().map(|l| l.fees).sum();
        self.filled_price = Some(fill.net_price);
        self.filled_at = Some(fill.at);
        self.status = OrderStatus::Filled;
        self.updated_at = fill.at;

        self.events.push(OrderEvent::Filled(OrderFilled {
            order_id: self.id.clone(),
            strategy_tag: self.strategy_tag.clone(),
            side: self.side,
            quantity: self.quantity,
            fill_price: fill.net_price,
            legs: fill.legs,
            fees: self.fees,
            origin: self.origin,
            occurred_at: fill.at,
        }));

        Ok(())
    }

    /// Cancel the order.
    ///
    /// Generates an `OrderCancelled` event.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFilled` if the order filled first, `NotPending` for
    /// other terminal states.
    pub fn cancel(&mut self, reason: CancelReason, at: Timestamp) -> Result<(), OrderError> {
        self.ensure_pending()?;

        self.status = OrderStatus::Cancelled;
        self.status_reason = Some(reason.to_string());
        self.updated_at = at;

        self.events.push(OrderEvent::Cancelled(OrderCancelled {
            order_id: self.id.clone(),
            reason,
            occurred_at: at,
        }));

        Ok(())
    }

    /// Mark order as expired.
    ///
    /// Generates an `OrderExpired` event.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not pending.
    pub fn expire(&mut self, at: Timestamp) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, OrderStatus::Expired)?;

        self.status = OrderStatus::Expired;
        self.status_reason = Some(format!("{} validity elapsed", self.validity));
        self.updated_at = at;

        self.events.push(OrderEvent::Expired(OrderExpired {
            order_id: self.id.clone(),
            expired_at: self.expires_at,
            occurred_at: at,
        }));

        Ok(())
    }

    /// Amend a pending order.
    ///
    /// Quantity changes must already be checked against the lot size by the
    /// caller. Generates an `OrderModified` event.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not pending or the new levels are invalid.
    pub fn modify(&mut self, changes: OrderChanges, at: Timestamp) -> Result<(), OrderError> {
        self.ensure_pending()?;

        let limit = changes.limit_price.unwrap_or(self.limit_price);
        let stop_loss = changes.stop_loss.or(self.stop_loss);
        let target = changes.target.or(self.target);
        check_levels(self.side, limit, stop_loss, target).map_err(|reason| {
            OrderError::InvalidParameters {
                field: reason.code.to_lowercase(),
                message: reason.message,
            }
        })?;
        if let Some(quantity) = changes.quantity {
            if quantity.is_zero() || self.legs.iter().any(|l| quantity.times(l.ratio).is_none()) {
                return Err(OrderError::InvalidParameters {
                    field: "quantity".to_string(),
                    message: format!("invalid quantity {quantity}"),
                });
            }
            self.quantity = quantity;
        }

        self.limit_price = limit;
        self.stop_loss = stop_loss;
        self.target = target;
        self.updated_at = at;

        self.events.push(OrderEvent::Modified(OrderModified {
            order_id: self.id.clone(),
            changes,
            occurred_at: at,
        }));

        Ok(())
    }

    /// Record a tick evaluation that did not fill the order.
    pub const fn record_unfilled_evaluation(&mut self) {
        self.evaluations = self.evaluations.saturating_add(1);
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Drain accumulated domain events.
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get pending events without draining.
    #[must_use]
    pub fn pending_events(&self) -> &[OrderEvent] {
        &self.events
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn ensure_pending(&self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending => Ok(()),
            OrderStatus::Filled => Err(OrderError::AlreadyFilled {
                order_id: self.id.to_string(),
            }),
            status => Err(OrderError::NotPending {
                order_id: self.id.to_string(),
                status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn single_buy() -> PlaceOrderCommand {
        PlaceOrderCommand {
            id: OrderId::sequential(1),
            strategy_tag: StrategyTag::new("breakout"),
            shape: StrategyShape::Single,
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: Quantity::new(25),
            limit_price: dec!(100),
            validity: Validity::Day,
            stop_loss: Some(dec!(90)),
            target: Some(dec!(120)),
            legs: vec![OrderLeg::new(
                InstrumentToken::new("NIFTY24DEC24000CE"),
                OrderSide::Buy,
                1,
            )],
            origin: OrderOrigin::Request,
        }
    }

    fn leg_fill(price: Decimal) -> LegFill {
        LegFill {
            instrument: InstrumentToken::new("NIFTY24DEC24000CE"),
            side: OrderSide::Buy,
            quantity: Quantity::new(25),
            price,
            fees: Money::new(dec!(20)),
        }
    }

    #[test]
    fn place_generates_placed_event() {
        let order = Order::place(single_buy(), ts("2024-12-02T05:00:00Z"), None);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.pending_events().len(), 1);
        assert!(matches!(order.pending_events()[0], OrderEvent::Placed(_)));
    }

    #[test]
    fn rejected_order_is_terminal() {
        let order = Order::rejected(
            single_buy(),
            RejectReason::market_closed(false),
            ts("2024-12-02T12:00:00Z"),
        );
        assert_eq!(order.status(), OrderStatus::Rejected);
        assert!(matches!(order.pending_events()[0], OrderEvent::Rejected(_)));
    }

    #[test]
    fn validate_rejects_stop_above_limit_for_buy() {
        let mut cmd = single_buy();
        cmd.stop_loss = Some(dec!(105));
        let Err(reason) = cmd.validate() else {
            panic!("expected rejection");
        };
        assert_eq!(reason.code, "INVALID_STOP_TARGET");
    }

    #[test]
    fn validate_rejects_target_above_limit_for_sell() {
        let mut cmd = single_buy();
        cmd.side = OrderSide::Sell;
        cmd.legs[0].side = OrderSide::Sell;
        cmd.stop_loss = Some(dec!(110));
        cmd.target = Some(dec!(130));
        assert!(cmd.validate().is_err());
        cmd.target = Some(dec!(80));
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_limit() {
        let mut cmd = single_buy();
        cmd.limit_price = Decimal::ZERO;
        cmd.stop_loss = None;
        let Err(reason) = cmd.validate() else {
            panic!("expected rejection");
        };
        assert_eq!(reason.code, "INVALID_PRICE");
    }

    #[test]
    fn fill_records_price_and_fees() {
        let mut order = Order::place(single_buy(), ts("2024-12-02T05:00:00Z"), None);
        order.drain_events();
        order
            .fill(OrderFill {
                legs: vec![leg_fill(dec!(99.5995))],
                net_price: dec!(99.5995),
                at: ts("2024-12-02T05:01:00Z"),
            })
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.filled_price(), Some(dec!(99.5995)));
        assert_eq!(order.fees(), Money::new(dec!(20)));
        assert_eq!(order.legs()[0].fill_price, Some(dec!(99.5995)));
        assert!(matches!(order.pending_events()[0], OrderEvent::Filled(_)));
    }

    #[test]
    fn cancel_after_fill_is_too_late() {
        let mut order = Order::place(single_buy(), ts("2024-12-02T05:00:00Z"), None);
        order
            .fill(OrderFill {
                legs: vec![leg_fill(dec!(99))],
                net_price: dec!(99),
                at: ts("2024-12-02T05:01:00Z"),
            })
            .unwrap();
        let result = order.cancel(CancelReason::user_requested(), ts("2024-12-02T05:02:00Z"));
        assert!(matches!(result, Err(OrderError::AlreadyFilled { .. })));
    }

    #[test]
    fn expired_order_cannot_fill() {
        let mut order = Order::place(
            single_buy(),
            ts("2024-12-02T05:00:00Z"),
            Some(ts("2024-12-02T10:00:00Z")),
        );
        assert!(order.is_expired_at(ts("2024-12-02T10:00:00Z")));
        order.expire(ts("2024-12-02T10:00:00Z")).unwrap();
        let result = order.fill(OrderFill {
            legs: vec![leg_fill(dec!(99))],
            net_price: dec!(99),
            at: ts("2024-12-02T10:01:00Z"),
        });
        assert!(result.is_err());
        assert_eq!(order.status(), OrderStatus::Expired);
    }

    #[test]
    fn modify_updates_levels() {
        let mut order = Order::place(single_buy(), ts("2024-12-02T05:00:00Z"), None);
        order
            .modify(
                OrderChanges {
                    limit_price: Some(dec!(101)),
                    quantity: Some(Quantity::new(50)),
                    ..OrderChanges::default()
                },
                ts("2024-12-02T05:00:30Z"),
            )
            .unwrap();
        assert_eq!(order.limit_price(), dec!(101));
        assert_eq!(order.quantity(), Quantity::new(50));
        assert_eq!(order.stop_loss(), Some(dec!(90)));
    }

    #[test]
    fn modify_rejects_stop_crossing_new_limit() {
        let mut order = Order::place(single_buy(), ts("2024-12-02T05:00:00Z"), None);
        let result = order.modify(
            OrderChanges {
                limit_price: Some(dec!(85)),
                ..OrderChanges::default()
            },
            ts("2024-12-02T05:00:30Z"),
        );
        assert!(matches!(result, Err(OrderError::InvalidParameters { .. })));
        assert_eq!(order.limit_price(), dec!(100));
    }

    #[test]
    fn serde_round_trip_skips_events() {
        let order = Order::place(single_buy(), ts("2024-12-02T05:00:00Z"), None);
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert!(back.pending_events().is_empty());
        assert_eq!(back.id(), order.id());
        assert_eq!(back.status(), OrderStatus::Pending);
    }
}
