//! One leg fill as seen by position accounting.

use rust_decimal::Decimal;

use super::ExitReason;
use crate::domain::order_execution::value_objects::OrderSide;
use crate::domain::shared::{Money, OrderId, PositionKey, Quantity, Timestamp};
use crate::domain::stop_enforcement::StopTargetLevels;

/// Input to [`PositionBook::apply_fill`](crate::domain::position::PositionBook::apply_fill).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionFill {
    /// Order that produced the fill.
    pub order_id: OrderId,
    /// Position key.
    pub key: PositionKey,
    /// Fill side.
    pub side: OrderSide,
    /// Contracts filled.
    pub quantity: Quantity,
    /// Execution price.
    pub price: Decimal,
    /// Fees charged on this fill.
    pub fees: Money,
    /// Stop/target carried by the order. Empty for multi-leg legs.
    pub levels: StopTargetLevels,
    /// Reason recorded if the fill closes quantity.
    pub exit_reason: ExitReason,
    /// Exchange lot size of the instrument.
    pub lot_size: u32,
    /// Fill time.
    pub at: Timestamp,
}

impl PositionFill {
    /// Signed quantity: positive for buys, negative for sells.
    #[must_use]
    pub fn signed_quantity(&self) -> i64 {
        i64::from(self.quantity.units()) * self.side.sign()
    }
}
