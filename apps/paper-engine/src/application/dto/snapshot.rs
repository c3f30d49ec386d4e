//! Persisted engine state.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::OrderStatus;
use crate::domain::position::{Position, TradeRecord};
use crate::domain::shared::{Money, OrderId, PositionKey, Timestamp};
use crate::domain::stop_enforcement::StrategyGuard;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A position key whose mutation is halted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltedKey {
    /// Position key.
    pub key: PositionKey,
    /// Breach that halted it.
    pub detail: String,
}

/// Final status of an order that is no longer pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedOrder {
    /// Order id.
    pub order_id: OrderId,
    /// Terminal status.
    pub status: OrderStatus,
}

/// Everything needed to resume the engine after a restart.
///
/// A fill and the position/trade updates it caused are always captured in the
/// same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Format version.
    pub version: u32,
    /// When the snapshot was taken.
    pub saved_at: Timestamp,
    /// Orders still pending.
    pub pending_orders: Vec<Order>,
    /// Open positions.
    pub positions: Vec<Position>,
    /// Closed trade records.
    pub trades: Vec<TradeRecord>,
    /// Net-level guards for open multi-leg strategies.
    #[serde(default)]
    pub guards: Vec<StrategyGuard>,
    /// Realized P&L after fees.
    pub realized_pnl: Money,
    /// All fees charged.
    pub total_fees: Money,
    /// Last order sequence number issued.
    pub order_counter: u64,
    /// Halted position keys.
    #[serde(default)]
    pub halted: Vec<HaltedKey>,
    /// Terminal orders, so late cancels still get the right refusal.
    #[serde(default)]
    pub closed_orders: Vec<ClosedOrder>,
}
