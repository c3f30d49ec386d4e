//! Event Publisher Port (Driven Port)
//!
//! Interface for pushing engine events to external subscribers (UI,
//! persistence, reporting).

use async_trait::async_trait;

use crate::application::dto::EngineEvent;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError {
        /// Error details.
        message: String,
    },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed {
        /// Error details.
        message: String,
    },
}

/// Port for publishing engine events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish a batch of events in emission order.
    async fn publish_events(&self, events: Vec<EngineEvent>) -> Result<(), EventPublishError>;

    /// Publish a single event.
    async fn publish_event(&self, event: EngineEvent) -> Result<(), EventPublishError> {
        self.publish_events(vec![event]).await
    }
}

/// No-op event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish_events(&self, _events: Vec<EngineEvent>) -> Result<(), EventPublishError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::{AlertEvent, DataGap};
    use crate::domain::shared::{InstrumentToken, Timestamp};

    #[tokio::test]
    async fn no_op_publisher_succeeds() {
        let publisher = NoOpEventPublisher;
        let event = EngineEvent::Alert(AlertEvent::DataGap(DataGap {
            instrument: InstrumentToken::new("X"),
            cycles: 5,
            occurred_at: Timestamp::now(),
        }));
        assert!(publisher.publish_event(event).await.is_ok());
    }
}
