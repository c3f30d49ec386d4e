//! Stop Configuration Value Objects

use serde::{Deserialize, Serialize};

/// Rule for a tick that reaches both the stop-loss and the target.
///
/// A single price can only do that when the levels have crossed, which
/// averaging can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameTickPriority {
    /// Stop-loss takes priority (pessimistic assumption).
    #[default]
    StopFirst,
    /// Target takes priority (optimistic assumption).
    TargetFirst,
}
