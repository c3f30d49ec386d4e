//! Reasons for order rejection and cancellation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason an order was rejected at placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RejectReason {
    /// Machine-readable rejection code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl RejectReason {
    /// Create a new reject reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Quantity is zero or overflows.
    #[must_use]
    pub fn invalid_quantity(reason: &str) -> Self {
        Self::new("INVALID_QUANTITY", format!("Invalid quantity: {reason}"))
    }

    /// Quantity is not a whole number of lots.
    #[must_use]
    pub fn lot_size_mismatch(symbol: &str, quantity: u32, lot_size: u32) -> Self {
        Self::new(
            "LOT_SIZE_MISMATCH",
            format!("Quantity {quantity} for {symbol} must be a multiple of lot size {lot_size}"),
        )
    }

    /// Instrument token could not be resolved.
    #[must_use]
    pub fn unknown_instrument(token: &str) -> Self {
        Self::new("UNKNOWN_INSTRUMENT", format!("Unknown instrument: {token}"))
    }

    /// Instrument exists but is not open for trading.
    #[must_use]
    pub fn not_tradable(token: &str) -> Self {
        Self::new(
            "INSTRUMENT_NOT_TRADABLE",
            format!("Instrument is not tradable: {token}"),
        )
    }

    /// Limit price is missing or not positive.
    #[must_use]
    pub fn invalid_price(reason: &str) -> Self {
        Self::new("INVALID_PRICE", format!("Invalid price: {reason}"))
    }

    /// Stop-loss or target is on the wrong side of the limit.
    #[must_use]
    pub fn invalid_stop_target(reason: &str) -> Self {
        Self::new("INVALID_STOP_TARGET", reason)
    }

    /// Market is closed for this validity.
    #[must_use]
    pub fn market_closed(amo_allowed: bool) -> Self {
        let message = if amo_allowed {
            "Market is closed. Use AMO validity to queue the order for the next session"
        } else {
            "Market is closed"
        };
        Self::new("MARKET_CLOSED", message)
    }

    /// Legs do not match the strategy shape.
    #[must_use]
    pub fn invalid_legs(reason: &str) -> Self {
        Self::new("INVALID_LEGS", reason)
    }

    /// A position touched by the order is halted pending reconciliation.
    #[must_use]
    pub fn key_halted(key: &str) -> Self {
        Self::new(
            "KEY_HALTED",
            format!("Position {key} is halted pending manual reconciliation"),
        )
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Reason for order cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CancelReason {
    /// Cancellation code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl CancelReason {
    /// Create a new cancel reason.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// User requested cancellation.
    #[must_use]
    pub fn user_requested() -> Self {
        Self::new("USER_REQUESTED", "Cancelled by user request")
    }

    /// IOC order did not fill on its first evaluation.
    #[must_use]
    pub fn ioc_unfilled() -> Self {
        Self::new(
            "IOC_UNFILLED",
            "Immediate-or-cancel order not filled on first evaluation",
        )
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
