//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors that can occur in order execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Order was filled before the request was sequenced.
    AlreadyFilled {
        /// Order ID.
        order_id: String,
    },

    /// Order is terminal for a reason other than a fill.
    NotPending {
        /// Order ID.
        order_id: String,
        /// Current status.
        status: OrderStatus,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Order not found.
    NotFound {
        /// Order ID.
        order_id: String,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { from, to, reason } => {
                write!(
                    f,
                    "Invalid order state transition: {from} -> {to}: {reason}"
                )
            }
            Self::AlreadyFilled { order_id } => {
                write!(f, "Too late: order {order_id} is already filled")
            }
            Self::NotPending { order_id, status } => {
                write!(f, "Order {order_id} is not pending (status: {status})")
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
            Self::NotFound { order_id } => {
                write!(f, "Order not found: {order_id}")
            }
        }
    }
}

impl std::error::Error for OrderError {}
