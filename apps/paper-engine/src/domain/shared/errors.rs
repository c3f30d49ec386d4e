//! Domain errors for value objects.

use thiserror::Error;

/// Construction or validation failure of a domain value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A field holds a value outside its allowed range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// A contract count is not a whole number of lots.
    #[error("Quantity {quantity} is not a multiple of lot size {lot_size}")]
    NotLotMultiple {
        /// Contracts requested.
        quantity: u32,
        /// Exchange lot size.
        lot_size: u32,
    },
}

impl DomainError {
    /// Build a [`DomainError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
