//! Portfolio summary returned to callers.

use serde::{Deserialize, Serialize};

use crate::domain::position::PortfolioPnl;
use crate::domain::shared::{Money, Timestamp};

/// Portfolio totals as of the most recent tick processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Realized P&L after fees (sum of trade records).
    pub realized_pnl: Money,
    /// Gross unrealized P&L at the latest marks.
    pub unrealized_pnl: Money,
    /// Unrealized P&L after entry fees still attached to open positions.
    pub unrealized_net: Money,
    /// Realized plus net unrealized.
    pub total_pnl: Money,
    /// All fees charged.
    pub total_fees: Money,
    /// Open positions.
    pub open_positions: usize,
    /// Pending orders.
    pub pending_orders: usize,
    /// Closed trade records.
    pub closed_trades: usize,
    /// Halted position keys.
    pub halted_keys: usize,
    /// Time of the most recent tick processed.
    pub as_of: Option<Timestamp>,
}

impl PortfolioSummary {
    /// Build a summary from position totals and book counts.
    #[must_use]
    pub const fn from_totals(
        totals: &PortfolioPnl,
        pending_orders: usize,
        closed_trades: usize,
        halted_keys: usize,
        as_of: Option<Timestamp>,
    ) -> Self {
        Self {
            realized_pnl: totals.realized_pnl,
            unrealized_pnl: totals.unrealized_pnl,
            unrealized_net: totals.unrealized_net,
            total_pnl: totals.total_pnl,
            total_fees: totals.total_fees,
            open_positions: totals.open_positions,
            pending_orders,
            closed_trades,
            halted_keys,
            as_of,
        }
    }
}
