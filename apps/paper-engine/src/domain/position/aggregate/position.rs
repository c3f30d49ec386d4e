//! Position Aggregate
//!
//! One aggregated holding per (instrument, strategy). Adding fills average the
//! entry price by volume; reducing fills realize P&L at the existing average;
//! a fill larger than the holding closes it and opens the remainder on the
//! other side at the fill price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::position::value_objects::{ExitReason, PositionFill, TradeRecord};
use crate::domain::shared::{Money, OrderId, PositionKey, Quantity, Timestamp, TradeId};
use crate::domain::stop_enforcement::{PositionDirection, StopTargetLevels};

/// Aggregated holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    key: PositionKey,
    net_quantity: i64,
    avg_price: Decimal,
    realized_pnl: Money,
    mark_price: Option<Decimal>,
    entry_fees: Money,
    levels: StopTargetLevels,
    lot_size: u32,
    entry_order: OrderId,
    opened_at: Timestamp,
    updated_at: Timestamp,
}

impl Position {
    /// Open a position from its first fill.
    #[must_use]
    pub fn open(fill: &PositionFill) -> Self {
        Self {
            key: fill.key.clone(),
            net_quantity: fill.signed_quantity(),
            avg_price: fill.price,
            realized_pnl: Money::ZERO,
            mark_price: None,
            entry_fees: fill.fees,
            levels: fill.levels,
            lot_size: fill.lot_size,
            entry_order: fill.order_id.clone(),
            opened_at: fill.at,
            updated_at: fill.at,
        }
    }

    /// Rebuild a position from reconciled values.
    #[must_use]
    pub fn reconciled(
        key: PositionKey,
        net_quantity: i64,
        avg_price: Decimal,
        lot_size: u32,
        at: Timestamp,
    ) -> Self {
        Self {
            key,
            net_quantity,
            avg_price,
            realized_pnl: Money::ZERO,
            mark_price: None,
            entry_fees: Money::ZERO,
            levels: StopTargetLevels::none(),
            lot_size,
            entry_order: OrderId::new("RECONCILED"),
            opened_at: at,
            updated_at: at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Position key.
    #[must_use]
    pub const fn key(&self) -> &PositionKey {
        &self.key
    }

    /// Signed net quantity (positive long, negative short).
    #[must_use]
    pub const fn net_quantity(&self) -> i64 {
        self.net_quantity
    }

    /// Open contracts regardless of direction.
    #[must_use]
    pub fn open_quantity(&self) -> Quantity {
        Quantity::new(u32::try_from(self.net_quantity.unsigned_abs()).unwrap_or(u32::MAX))
    }

    /// Direction, `None` when flat.
    #[must_use]
    pub const fn direction(&self) -> Option<PositionDirection> {
        PositionDirection::from_net(self.net_quantity)
    }

    /// Volume-weighted average entry price.
    #[must_use]
    pub const fn avg_price(&self) -> Decimal {
        self.avg_price
    }

    /// Realized P&L accumulated while this position was open.
    #[must_use]
    pub const fn realized_pnl(&self) -> Money {
        self.realized_pnl
    }

    /// Last mark price.
    #[must_use]
    pub const fn mark_price(&self) -> Option<Decimal> {
        self.mark_price
    }

    /// Entry fees not yet attributed to a trade record.
    #[must_use]
    pub const fn entry_fees(&self) -> Money {
        self.entry_fees
    }

    /// Stop/target levels.
    #[must_use]
    pub const fn levels(&self) -> &StopTargetLevels {
        &self.levels
    }

    /// Exchange lot size.
    #[must_use]
    pub const fn lot_size(&self) -> u32 {
        self.lot_size
    }

    /// Order that opened the position.
    #[must_use]
    pub const fn entry_order(&self) -> &OrderId {
        &self.entry_order
    }

    /// Opened-at time.
    #[must_use]
    pub const fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    /// Last update time.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true once net quantity is zero.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.net_quantity == 0
    }

    /// Gross unrealized P&L at the last mark: `(mark - avg) * net`.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Money {
        self.mark_price.map_or(Money::ZERO, |mark| {
            Money::new((mark - self.avg_price) * Decimal::from(self.net_quantity))
        })
    }

    /// Unrealized P&L after the entry fees still attached to the position.
    #[must_use]
    pub fn unrealized_net(&self) -> Money {
        self.unrealized_pnl() - self.entry_fees
    }

    /// Price used to value an exit: last mark, or average entry when no tick
    /// has been seen.
    #[must_use]
    pub fn exit_reference(&self) -> Decimal {
        self.mark_price.unwrap_or(self.avg_price)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Record a new mark price.
    pub fn mark(&mut self, price: Decimal, at: Timestamp) {
        self.mark_price = Some(price);
        self.updated_at = at;
    }

    /// Apply a fill for this key.
    ///
    /// Returns the trade record when the fill closes quantity.
    pub fn apply(&mut self, fill: &PositionFill) -> Option<TradeRecord> {
        let signed = fill.signed_quantity();
        self.updated_at = fill.at;

        let Some(direction) = self.direction() else {
            *self = Self {
                realized_pnl: self.realized_pnl,
                ..Self::open(fill)
            };
            return None;
        };

        if (self.net_quantity > 0) == (signed > 0) {
            self.add(fill, direction);
            return None;
        }

        let held = self.open_quantity().units();
        let filled = fill.quantity.units();
        let closing = held.min(filled);

        let exit_fees = fill.fees.share(closing, filled);
        let entry_share = self.entry_fees.share(closing, held);
        let gross = Money::new((fill.price - self.avg_price) * Decimal::from(closing) * direction.sign());
        let net_pnl = gross - entry_share - exit_fees;

        let reverses = filled > held;
        let exit_reason = if reverses && fill.exit_reason == ExitReason::Manual {
            ExitReason::Reversal
        } else {
            fill.exit_reason
        };

        let trade = TradeRecord {
            trade_id: TradeId::generate(),
            order_id: fill.order_id.clone(),
            key: self.key.clone(),
            direction,
            quantity: Quantity::new(closing),
            entry_price: self.avg_price,
            exit_price: fill.price,
            entry_fees: entry_share,
            exit_fees,
            fees: entry_share + exit_fees,
            gross_pnl: gross,
            net_pnl,
            opened_at: self.opened_at,
            closed_at: fill.at,
            holding_secs: fill.at.duration_since(self.opened_at).num_seconds(),
            exit_reason,
        };

        self.entry_fees -= entry_share;
        self.realized_pnl += net_pnl;
        self.net_quantity += signed;

        if reverses {
            self.avg_price = fill.price;
            self.entry_fees = fill.fees - exit_fees;
            self.levels = fill.levels;
            self.entry_order = fill.order_id.clone();
            self.opened_at = fill.at;
        }

        Some(trade)
    }

    /// Overwrite quantity and average price after an external reconciliation.
    pub fn reconcile(&mut self, net_quantity: i64, avg_price: Decimal, at: Timestamp) {
        self.net_quantity = net_quantity;
        self.avg_price = avg_price;
        self.updated_at = at;
    }

    /// Check the position invariants.
    ///
    /// # Errors
    ///
    /// Returns a description of the first breach.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.net_quantity == 0 {
            return Err("position with zero quantity was not removed".to_string());
        }
        if self.avg_price <= Decimal::ZERO {
            return Err(format!("average price {} is not positive", self.avg_price));
        }
        if self.lot_size == 0
            || self.net_quantity.unsigned_abs() % u64::from(self.lot_size) != 0
        {
            return Err(format!(
                "net quantity {} is not a multiple of lot size {}",
                self.net_quantity, self.lot_size
            ));
        }
        Ok(())
    }

    fn add(&mut self, fill: &PositionFill, direction: PositionDirection) {
        let old_qty = Decimal::from(self.net_quantity.unsigned_abs());
        let add_qty = Decimal::from(fill.quantity.units());
        self.avg_price = (self.avg_price * old_qty + fill.price * add_qty) / (old_qty + add_qty);
        self.net_quantity += fill.signed_quantity();
        self.entry_fees += fill.fees;
        self.levels = self.levels.merge(fill.levels, direction);
    }
}
