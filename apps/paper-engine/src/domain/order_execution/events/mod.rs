//! Domain events for order execution.
//!
//! Events capture state transitions and are fanned out to subscribers by the
//! engine loop.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::{
    CancelReason, OrderLeg, OrderOrigin, OrderSide, RejectReason, StrategyShape, Validity,
};
use crate::domain::shared::{InstrumentToken, Money, OrderId, Quantity, StrategyTag, Timestamp};

/// All possible order events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    /// Order validated and waiting for a matching price.
    #[serde(rename = "ORDER_PLACED")]
    Placed(OrderPlaced),
    /// Order filled.
    #[serde(rename = "ORDER_FILLED")]
    Filled(OrderFilled),
    /// Order rejected at placement.
    #[serde(rename = "ORDER_REJECTED")]
    Rejected(OrderRejected),
    /// Order cancelled.
    #[serde(rename = "ORDER_CANCELLED")]
    Cancelled(OrderCancelled),
    /// Order expired at the session boundary.
    #[serde(rename = "ORDER_EXPIRED")]
    Expired(OrderExpired),
    /// Pending order amended.
    #[serde(rename = "ORDER_MODIFIED")]
    Modified(OrderModified),
    /// Cancel or modify request arrived too late or for a terminal order.
    #[serde(rename = "CANCEL_REJECTED")]
    CancelRejected(CancelRejected),
}

impl OrderEvent {
    /// Get the order ID for this event.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::Placed(e) => &e.order_id,
            Self::Filled(e) => &e.order_id,
            Self::Rejected(e) => &e.order_id,
            Self::Cancelled(e) => &e.order_id,
            Self::Expired(e) => &e.order_id,
            Self::Modified(e) => &e.order_id,
            Self::CancelRejected(e) => &e.order_id,
        }
    }

    /// Get the timestamp when this event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::Placed(e) => e.occurred_at,
            Self::Filled(e) => e.occurred_at,
            Self::Rejected(e) => e.occurred_at,
            Self::Cancelled(e) => e.occurred_at,
            Self::Expired(e) => e.occurred_at,
            Self::Modified(e) => e.occurred_at,
            Self::CancelRejected(e) => e.occurred_at,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Placed(_) => "ORDER_PLACED",
            Self::Filled(_) => "ORDER_FILLED",
            Self::Rejected(_) => "ORDER_REJECTED",
            Self::Cancelled(_) => "ORDER_CANCELLED",
            Self::Expired(_) => "ORDER_EXPIRED",
            Self::Modified(_) => "ORDER_MODIFIED",
            Self::CancelRejected(_) => "CANCEL_REJECTED",
        }
    }
}

/// Event: order placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// Order ID.
    pub order_id: OrderId,
    /// Strategy tag.
    pub strategy_tag: StrategyTag,
    /// Strategy shape.
    pub shape: StrategyShape,
    /// Side.
    pub side: OrderSide,
    /// Quantity per unit ratio.
    pub quantity: Quantity,
    /// Limit price (net for multi-leg).
    pub limit_price: Decimal,
    /// Validity.
    pub validity: Validity,
    /// Stop-loss level.
    pub stop_loss: Option<Decimal>,
    /// Target level.
    pub target: Option<Decimal>,
    /// Legs.
    pub legs: Vec<OrderLeg>,
    /// Who created the order.
    pub origin: OrderOrigin,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Fill details for one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegFill {
    /// Instrument.
    pub instrument: InstrumentToken,
    /// Leg side.
    pub side: OrderSide,
    /// Contracts filled.
    pub quantity: Quantity,
    /// Execution price after slippage.
    pub price: Decimal,
    /// Fees charged on this leg.
    pub fees: Money,
}

/// Event: order filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilled {
    /// Order ID.
    pub order_id: OrderId,
    /// Strategy tag.
    pub strategy_tag: StrategyTag,
    /// Side.
    pub side: OrderSide,
    /// Quantity per unit ratio.
    pub quantity: Quantity,
    /// Net fill price.
    pub fill_price: Decimal,
    /// Per-leg fills.
    pub legs: Vec<LegFill>,
    /// Total fees for the order.
    pub fees: Money,
    /// Who created the order.
    pub origin: OrderOrigin,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: order rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    /// Order ID.
    pub order_id: OrderId,
    /// Strategy tag.
    pub strategy_tag: StrategyTag,
    /// Rejection reason.
    pub reason: RejectReason,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: order cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    /// Order ID.
    pub order_id: OrderId,
    /// Cancellation reason.
    pub reason: CancelReason,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: order expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpired {
    /// Order ID.
    pub order_id: OrderId,
    /// Session boundary the order expired at.
    pub expired_at: Option<Timestamp>,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Fields changed by a modify request. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChanges {
    /// New limit price.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// New quantity.
    #[serde(default, alias = "quantity_lots")]
    pub quantity: Option<Quantity>,
    /// New stop-loss.
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// New target.
    #[serde(default)]
    pub target: Option<Decimal>,
}

impl OrderChanges {
    /// Returns true if no field is changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.limit_price.is_none()
            && self.quantity.is_none()
            && self.stop_loss.is_none()
            && self.target.is_none()
    }
}

/// Event: order modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModified {
    /// Order ID.
    pub order_id: OrderId,
    /// Applied changes.
    pub changes: OrderChanges,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: cancel or modify request refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRejected {
    /// Order ID.
    pub order_id: OrderId,
    /// True when the order had already filled.
    pub too_late: bool,
    /// Human-readable message.
    pub message: String,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_serde_tag() {
        let event = OrderEvent::Expired(OrderExpired {
            order_id: OrderId::new("ORD-000001"),
            expired_at: None,
            occurred_at: Timestamp::parse("2024-12-02T10:00:00Z").unwrap(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(event.order_id().as_str(), "ORD-000001");
    }

    #[test]
    fn order_changes_empty() {
        assert!(OrderChanges::default().is_empty());
        let changes = OrderChanges {
            target: Some(Decimal::ONE),
            ..OrderChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
