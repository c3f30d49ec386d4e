//! Engine events fanned out to subscribers.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::events::OrderEvent;
use crate::domain::position::events::PositionEvent;
use crate::domain::shared::{InstrumentToken, PositionKey, Timestamp};

/// Operational alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertEvent {
    /// Pending orders on an instrument have gone several ticks without a usable price.
    #[serde(rename = "DATA_GAP")]
    DataGap(DataGap),
    /// A position invariant broke and the key was halted.
    #[serde(rename = "STATE_CORRUPTION")]
    StateCorruption(StateCorruption),
}

/// Alert: sustained missing prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGap {
    /// Instrument without a usable price.
    pub instrument: InstrumentToken,
    /// Consecutive ticks without a usable price.
    pub cycles: u32,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Alert: halted key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCorruption {
    /// Halted key.
    pub key: PositionKey,
    /// Breach description.
    pub detail: String,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Any event the engine emits.
///
/// Serialized without an extra wrapper: every variant already carries its own
/// `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineEvent {
    /// Order lifecycle.
    Order(OrderEvent),
    /// Positions and P&L.
    Position(PositionEvent),
    /// Operational alerts.
    Alert(AlertEvent),
}

impl EngineEvent {
    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Order(e) => e.event_type(),
            Self::Position(e) => e.event_type(),
            Self::Alert(AlertEvent::DataGap(_)) => "DATA_GAP",
            Self::Alert(AlertEvent::StateCorruption(_)) => "STATE_CORRUPTION",
        }
    }

    /// Get the timestamp when this event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::Order(e) => e.occurred_at(),
            Self::Position(e) => e.occurred_at(),
            Self::Alert(AlertEvent::DataGap(e)) => e.occurred_at,
            Self::Alert(AlertEvent::StateCorruption(e)) => e.occurred_at,
        }
    }
}

impl From<OrderEvent> for EngineEvent {
    fn from(event: OrderEvent) -> Self {
        Self::Order(event)
    }
}

impl From<PositionEvent> for EngineEvent {
    fn from(event: PositionEvent) -> Self {
        Self::Position(event)
    }
}

impl From<AlertEvent> for EngineEvent {
    fn from(event: AlertEvent) -> Self {
        Self::Alert(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_serializes_flat_with_type_tag() {
        let event = EngineEvent::from(AlertEvent::DataGap(DataGap {
            instrument: InstrumentToken::new("NIFTY24DEC24000CE"),
            cycles: 5,
            occurred_at: Timestamp::parse("2024-12-02T05:00:00Z").unwrap(),
        }));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DATA_GAP");
        assert_eq!(json["cycles"], 5);
        let back: EngineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
