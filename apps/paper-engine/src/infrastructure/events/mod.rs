//! Event publisher adapters.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::dto::EngineEvent;
use crate::application::ports::{EventPublishError, EventPublisherPort};

/// Publisher that writes every event to the log as one JSON line.
///
/// Alerts are logged at `warn`, everything else at `info`.
#[derive(Debug, Clone, Default)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisherPort for LogEventPublisher {
    async fn publish_events(&self, events: Vec<EngineEvent>) -> Result<(), EventPublishError> {
        for event in events {
            let payload = serde_json::to_string(&event).map_err(|e| {
                EventPublishError::SerializationError {
                    message: e.to_string(),
                }
            })?;
            match event {
                EngineEvent::Alert(_) => {
                    tracing::warn!(event_type = event.event_type(), payload = %payload, "Engine alert");
                }
                _ => {
                    tracing::info!(event_type = event.event_type(), payload = %payload, "Engine event");
                }
            }
        }
        Ok(())
    }
}

/// Publisher that keeps every event in memory, for tests and replays.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingEventPublisher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event received so far.
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Event type names in arrival order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(EngineEvent::event_type).collect()
    }
}

#[async_trait]
impl EventPublisherPort for RecordingEventPublisher {
    async fn publish_events(&self, events: Vec<EngineEvent>) -> Result<(), EventPublishError> {
        self.events.lock().extend(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::{AlertEvent, DataGap};
    use crate::domain::shared::{InstrumentToken, Timestamp};

    fn gap() -> EngineEvent {
        EngineEvent::Alert(AlertEvent::DataGap(DataGap {
            instrument: InstrumentToken::new("X"),
            cycles: 5,
            occurred_at: Timestamp::parse("2024-12-02T05:00:00Z").unwrap(),
        }))
    }

    #[tokio::test]
    async fn log_publisher_accepts_events() {
        assert!(LogEventPublisher.publish_events(vec![gap()]).await.is_ok());
    }

    #[tokio::test]
    async fn recorder_keeps_order() {
        let recorder = RecordingEventPublisher::new();
        recorder.publish_event(gap()).await.unwrap();
        recorder.publish_events(vec![gap(), gap()]).await.unwrap();
        assert_eq!(recorder.event_types(), vec!["DATA_GAP"; 3]);
    }
}
