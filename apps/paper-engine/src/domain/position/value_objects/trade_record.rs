//! Trade Record Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ExitReason;
use crate::domain::shared::{Money, OrderId, PositionKey, Quantity, Timestamp, TradeId};
use crate::domain::stop_enforcement::PositionDirection;

/// Immutable record of a closed (or partially closed) holding.
///
/// P&L is fee-inclusive: `net_pnl = gross_pnl - entry_fees - exit_fees`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Trade id.
    pub trade_id: TradeId,
    /// Order whose fill closed the quantity.
    pub order_id: OrderId,
    /// Position key.
    pub key: PositionKey,
    /// Direction of the closed holding.
    pub direction: PositionDirection,
    /// Contracts closed.
    pub quantity: Quantity,
    /// Average entry price of the closed quantity.
    pub entry_price: Decimal,
    /// Exit execution price.
    pub exit_price: Decimal,
    /// Entry fees attributed to the closed quantity.
    pub entry_fees: Money,
    /// Exit fees attributed to the closed quantity.
    pub exit_fees: Money,
    /// Entry plus exit fees.
    pub fees: Money,
    /// Price P&L before fees.
    pub gross_pnl: Money,
    /// Realized P&L after fees.
    pub net_pnl: Money,
    /// When the position was opened.
    pub opened_at: Timestamp,
    /// When the quantity was closed.
    pub closed_at: Timestamp,
    /// Seconds held.
    pub holding_secs: i64,
    /// Why the quantity was closed.
    pub exit_reason: ExitReason,
}
