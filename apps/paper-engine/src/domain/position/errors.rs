//! Position Errors

use thiserror::Error;

/// Errors raised by position accounting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// Position not found.
    #[error("Position not found: {key}")]
    NotFound {
        /// Missing key.
        key: String,
    },

    /// Key halted after an invariant breach.
    #[error("Position {key} is halted: {detail}")]
    Halted {
        /// Halted key.
        key: String,
        /// Breach that caused the halt.
        detail: String,
    },

    /// Fill or reconciliation values are unusable.
    #[error("Invalid fill for {key}: {message}")]
    InvalidFill {
        /// Affected key.
        key: String,
        /// Error details.
        message: String,
    },
}
