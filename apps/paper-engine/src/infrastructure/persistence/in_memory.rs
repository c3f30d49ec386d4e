//! In-memory snapshot store for testing.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::dto::EngineSnapshot;
use crate::application::ports::{StateStore, StoreError};

/// In-memory implementation of `StateStore`.
///
/// Keeps only the latest snapshot. Suitable for testing and development.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    latest: RwLock<Option<EngineSnapshot>>,
    saves: RwLock<usize>,
}

impl InMemoryStateStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a snapshot.
    #[must_use]
    pub fn with_snapshot(snapshot: EngineSnapshot) -> Self {
        Self {
            latest: RwLock::new(Some(snapshot)),
            saves: RwLock::new(0),
        }
    }

    /// Number of saves performed.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }

    /// Latest snapshot without going through the port.
    #[must_use]
    pub fn latest(&self) -> Option<EngineSnapshot> {
        self.latest.read().clone()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(&self, snapshot: &EngineSnapshot) -> Result<(), StoreError> {
        *self.latest.write() = Some(snapshot.clone());
        *self.saves.write() += 1;
        Ok(())
    }

    async fn load(&self) -> Result<Option<EngineSnapshot>, StoreError> {
        Ok(self.latest.read().clone())
    }
}
