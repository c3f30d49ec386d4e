//! Why a position (or part of it) was closed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::order_execution::value_objects::OrderOrigin;

/// Exit reason recorded on a trade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// A caller-submitted order reduced the position.
    Manual,
    /// Stop-loss exit.
    StopLoss,
    /// Target exit.
    Target,
    /// Square-off command.
    SquareOff,
    /// A caller-submitted order flipped the position to the other side.
    Reversal,
}

impl From<OrderOrigin> for ExitReason {
    fn from(origin: OrderOrigin) -> Self {
        match origin {
            OrderOrigin::Request => Self::Manual,
            OrderOrigin::StopLoss => Self::StopLoss,
            OrderOrigin::Target => Self::Target,
            OrderOrigin::SquareOff => Self::SquareOff,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Manual => "MANUAL",
            Self::StopLoss => "STOP_LOSS",
            Self::Target => "TARGET",
            Self::SquareOff => "SQUARE_OFF",
            Self::Reversal => "REVERSAL",
        };
        write!(f, "{s}")
    }
}
