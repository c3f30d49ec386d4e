//! Who created an order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of an order.
///
/// Requests come from the external trade request source. The other variants
/// are exit orders the engine generates itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderOrigin {
    /// Canonical trade request.
    #[default]
    Request,
    /// Exit generated by a stop-loss trigger.
    StopLoss,
    /// Exit generated by a target trigger.
    Target,
    /// Exit generated by a square-off command.
    SquareOff,
}

impl fmt::Display for OrderOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Request => "REQUEST",
            Self::StopLoss => "STOP_LOSS",
            Self::Target => "TARGET",
            Self::SquareOff => "SQUARE_OFF",
        };
        write!(f, "{s}")
    }
}
