//! Commands addressed to existing orders and positions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::events::OrderChanges;
use crate::domain::shared::{InstrumentToken, OrderId, PositionKey, StrategyTag};

/// Cancel a pending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelCommand {
    /// Order to cancel.
    pub order_id: OrderId,
}

/// Amend a pending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyCommand {
    /// Order to amend.
    pub order_id: OrderId,
    /// Fields to change.
    #[serde(flatten)]
    pub changes: OrderChanges,
}

/// Close one position at the latest mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareOffCommand {
    /// Instrument held.
    pub instrument: InstrumentToken,
    /// Strategy the holding belongs to.
    pub strategy_tag: StrategyTag,
}

impl SquareOffCommand {
    /// Position key addressed by the command.
    #[must_use]
    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.instrument.clone(), self.strategy_tag.clone())
    }
}

/// Overwrite a position with externally reconciled values and lift its halt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileCommand {
    /// Instrument held.
    pub instrument: InstrumentToken,
    /// Strategy the holding belongs to.
    pub strategy_tag: StrategyTag,
    /// Signed net quantity. Zero removes the position.
    pub net_quantity: i64,
    /// Average entry price.
    #[serde(default)]
    pub avg_price: Decimal,
}

impl ReconcileCommand {
    /// Position key addressed by the command.
    #[must_use]
    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.instrument.clone(), self.strategy_tag.clone())
    }
}
