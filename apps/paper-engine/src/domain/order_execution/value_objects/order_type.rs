//! Order type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type specifying execution behavior.
///
/// Every simulated order is a limit order; exits generated by the stop/target
/// monitor carry the execution price as their limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Limit order - execute at specified price or better.
    #[default]
    #[serde(alias = "limit")]
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
        }
    }
}
