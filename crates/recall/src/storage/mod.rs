//! Storage backends for per-user memory snapshots
//!
//! Defines the `MemoryStore` trait the service depends on, plus the two
//! shipped implementations: a JSON-file-per-user durable store and an
//! ephemeral in-memory store.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::memory::types::Snapshot;

pub use file::FileStore;
pub use memory::MemStore;

/// Storage-layer errors.
///
/// `Unavailable` means the backend could not be reached and the operation
/// may be retried; `Corrupt` means the stored document could not be
/// decoded and retrying will not help.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Corrupt memory document: {0}")]
    Corrupt(String),
}

/// Durable key-value persistence of one snapshot per user id.
///
/// Implementations must provide read-your-writes consistency within the
/// same process. Nothing else mutates snapshots; the service owns the
/// load-merge-save cycle.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Load the snapshot for a user, or `None` if none has been saved.
    async fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Save (upsert) the snapshot for a user.
    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Delete one field from a user's snapshot. Returns whether the field
    /// existed and was removed.
    async fn delete_field(&self, user_id: &str, field: &str) -> Result<bool, StoreError>;

    /// Wipe the user's snapshot entirely. Returns whether anything was
    /// stored for the user.
    async fn delete_all(&self, user_id: &str) -> Result<bool, StoreError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
