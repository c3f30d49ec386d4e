//! State Store Port (Driven Port)
//!
//! Durable storage for engine snapshots. Any technology works as long as a
//! save is atomic.

use async_trait::async_trait;

use crate::application::dto::EngineSnapshot;

/// State store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure.
    #[error("State store I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded or decoded.
    #[error("State store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot written by an unsupported format version.
    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found.
        found: u32,
        /// Version supported.
        expected: u32,
    },
}

/// Port for saving and loading snapshots.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a snapshot, replacing the previous one atomically.
    async fn save(&self, snapshot: &EngineSnapshot) -> Result<(), StoreError>;

    /// Load the latest snapshot, if any.
    async fn load(&self) -> Result<Option<EngineSnapshot>, StoreError>;
}
