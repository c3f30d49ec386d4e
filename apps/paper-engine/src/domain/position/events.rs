//! Domain events for positions and P&L.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::TradeRecord;
use crate::domain::shared::{InstrumentToken, Money, OrderId, PositionKey, Quantity, StrategyTag, Timestamp};

/// All possible position events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionEvent {
    /// Position created, changed or re-marked.
    #[serde(rename = "POSITION_UPDATED")]
    Updated(PositionUpdated),
    /// Position quantity returned to zero.
    #[serde(rename = "POSITION_CLOSED")]
    Closed(PositionClosed),
    /// Stop-loss exit executed.
    #[serde(rename = "SL_TRIGGERED")]
    SlTriggered(ExitTriggered),
    /// Target exit executed.
    #[serde(rename = "TARGET_TRIGGERED")]
    TargetTriggered(ExitTriggered),
    /// Portfolio totals after a tick or fill.
    #[serde(rename = "PORTFOLIO_PNL_UPDATED")]
    PortfolioPnlUpdated(PortfolioPnl),
}

impl PositionEvent {
    /// Get the timestamp when this event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::Updated(e) => e.occurred_at,
            Self::Closed(e) => e.occurred_at,
            Self::SlTriggered(e) | Self::TargetTriggered(e) => e.occurred_at,
            Self::PortfolioPnlUpdated(e) => e.occurred_at,
        }
    }

    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Updated(_) => "POSITION_UPDATED",
            Self::Closed(_) => "POSITION_CLOSED",
            Self::SlTriggered(_) => "SL_TRIGGERED",
            Self::TargetTriggered(_) => "TARGET_TRIGGERED",
            Self::PortfolioPnlUpdated(_) => "PORTFOLIO_PNL_UPDATED",
        }
    }
}

/// Event: position snapshot after a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdated {
    /// Position key.
    pub key: PositionKey,
    /// Signed net quantity.
    pub net_quantity: i64,
    /// Average entry price.
    pub avg_price: Decimal,
    /// Last mark.
    pub mark_price: Option<Decimal>,
    /// Gross unrealized P&L.
    pub unrealized_pnl: Money,
    /// Realized P&L while open.
    pub realized_pnl: Money,
    /// Stop-loss level.
    pub stop_loss: Option<Decimal>,
    /// Target level.
    pub target: Option<Decimal>,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: position closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionClosed {
    /// Position key.
    pub key: PositionKey,
    /// Trade record for the final close.
    pub trade: TradeRecord,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: a stop-loss or target fired and its exit filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitTriggered {
    /// Internal exit order.
    pub order_id: OrderId,
    /// Strategy tag.
    pub strategy_tag: StrategyTag,
    /// Instruments exited.
    pub instruments: Vec<InstrumentToken>,
    /// Configured level.
    pub level: Decimal,
    /// Mark that reached the level (net for multi-leg strategies).
    pub trigger_price: Decimal,
    /// Net exit execution price.
    pub exit_price: Decimal,
    /// Quantity exited per unit ratio.
    pub quantity: Quantity,
    /// Realized P&L of the exit after fees.
    pub net_pnl: Money,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: portfolio totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioPnl {
    /// Realized P&L after fees.
    pub realized_pnl: Money,
    /// Gross unrealized P&L.
    pub unrealized_pnl: Money,
    /// Unrealized P&L after open entry fees.
    pub unrealized_net: Money,
    /// Realized plus net unrealized.
    pub total_pnl: Money,
    /// All fees charged.
    pub total_fees: Money,
    /// Open positions.
    pub open_positions: usize,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_serde_tag() {
        let event = PositionEvent::PortfolioPnlUpdated(PortfolioPnl {
            realized_pnl: Money::ZERO,
            unrealized_pnl: Money::ZERO,
            unrealized_net: Money::ZERO,
            total_pnl: Money::ZERO,
            total_fees: Money::ZERO,
            open_positions: 0,
            occurred_at: Timestamp::parse("2024-12-02T05:00:00Z").unwrap(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
    }
}
