//! Engine error taxonomy.
//!
//! Every failure the engine reports to a caller is an [`EngineError`]. Each
//! variant maps to a stable [`ErrorCode`] so replay logs and subscribers can
//! match on a string without parsing messages.
//!
//! | Code | Recoverable | Usage |
//! |------|-------------|-------|
//! | `VALIDATION` | yes | Order rejected at placement or modify |
//! | `DATA_GAP` | yes | No usable price for an instrument |
//! | `RACE_REJECTION` | yes | Cancel/modify arrived after the fill |
//! | `STATE_CORRUPTION` | no | Position key halted until reconciled |
//! | `NOT_FOUND` | yes | Unknown order or position |
//! | `INVALID_STATE` | yes | Order is terminal |
//! | `PERSISTENCE` | yes | Snapshot store failure |
//! | `ENGINE_STOPPED` | no | Engine loop is no longer running |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::StoreError;
use crate::domain::order_execution::value_objects::{OrderStatus, RejectReason};
use crate::domain::shared::{InstrumentToken, OrderId, PositionKey};

/// Error codes for the paper engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Order failed validation.
    Validation,
    /// Price data missing for an instrument.
    DataGap,
    /// Request lost the race against a fill.
    RaceRejection,
    /// Position invariant breached.
    StateCorruption,
    /// Order or position unknown.
    NotFound,
    /// Order not pending.
    InvalidState,
    /// Snapshot store failure.
    Persistence,
    /// Engine loop stopped.
    EngineStopped,
}

impl ErrorCode {
    /// Get the error reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::DataGap => "DATA_GAP",
            Self::RaceRejection => "RACE_REJECTION",
            Self::StateCorruption => "STATE_CORRUPTION",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
            Self::Persistence => "PERSISTENCE",
            Self::EngineStopped => "ENGINE_STOPPED",
        }
    }

    /// Whether the caller can carry on after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::StateCorruption | Self::EngineStopped)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Order rejected. The order exists in `Rejected` state.
    #[error("order {order_id} rejected: {reason}")]
    Validation {
        /// Order id assigned to the request.
        order_id: OrderId,
        /// Rejection reason.
        reason: RejectReason,
    },

    /// No usable price for an instrument.
    #[error("no usable price for {instrument} for {cycles} consecutive ticks")]
    DataGap {
        /// Instrument without data.
        instrument: InstrumentToken,
        /// Consecutive ticks without a price.
        cycles: u32,
    },

    /// Cancel or modify arrived after the order filled.
    #[error("order {order_id} already filled, too late to {action}")]
    RaceRejection {
        /// Order id.
        order_id: OrderId,
        /// Refused action.
        action: &'static str,
    },

    /// Position halted after an invariant breach.
    #[error("position {key} halted: {detail}")]
    StateCorruption {
        /// Halted key.
        key: PositionKey,
        /// Breach description.
        detail: String,
    },

    /// Order not found.
    #[error("order {order_id} not found")]
    NotFound {
        /// Order id.
        order_id: OrderId,
    },

    /// No open position for a key.
    #[error("no open position for {key}")]
    PositionNotFound {
        /// Position key.
        key: PositionKey,
    },

    /// Order is in a terminal state.
    #[error("order {order_id} is {status}, not pending")]
    InvalidState {
        /// Order id.
        order_id: OrderId,
        /// Current status.
        status: OrderStatus,
    },

    /// Snapshot store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The engine loop has shut down.
    #[error("engine loop stopped")]
    Stopped,
}

impl EngineError {
    /// Stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::Validation,
            Self::DataGap { .. } => ErrorCode::DataGap,
            Self::RaceRejection { .. } => ErrorCode::RaceRejection,
            Self::StateCorruption { .. } => ErrorCode::StateCorruption,
            Self::NotFound { .. } | Self::PositionNotFound { .. } => ErrorCode::NotFound,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::Store(_) => ErrorCode::Persistence,
            Self::Stopped => ErrorCode::EngineStopped,
        }
    }

    /// Rejection reason for validation errors.
    #[must_use]
    pub const fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Validation { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_variants() {
        let err = EngineError::RaceRejection {
            order_id: OrderId::sequential(3),
            action: "cancel",
        };
        assert_eq!(err.code(), ErrorCode::RaceRejection);
        assert!(err.code().is_recoverable());
        assert_eq!(err.to_string(), "order ORD-000003 already filled, too late to cancel");
    }

    #[test]
    fn validation_exposes_reason() {
        let err = EngineError::Validation {
            order_id: OrderId::sequential(1),
            reason: RejectReason::market_closed(true),
        };
        assert_eq!(err.reject_reason().map(|r| r.code.as_str()), Some("MARKET_CLOSED"));
    }

    #[test]
    fn corruption_is_not_recoverable() {
        let err = EngineError::StateCorruption {
            key: PositionKey::new("A", "s"),
            detail: "zero quantity".to_string(),
        };
        assert!(!err.code().is_recoverable());
        assert_eq!(err.code().to_string(), "STATE_CORRUPTION");
    }
}
