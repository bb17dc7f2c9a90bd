//! Memory service
//!
//! Orchestrates one consolidation cycle per incoming message
//! (load -> oracle -> consolidate -> save) and exposes the read, delete,
//! and context-formatting operations the HTTP surface wraps.
//!
//! The snapshot is shared per-user mutable state, so the whole cycle runs
//! under a per-user-id async mutex: two concurrent messages for the same
//! user apply in lock-admission order instead of racing load-then-save.
//! Different user ids never contend.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use crate::error::{RecallError, Result};
use crate::memory::consolidate::{ConflictPairs, consolidate};
use crate::memory::context::format_context;
use crate::memory::types::{ChangeEntry, Snapshot};
use crate::oracle::ExtractionOracle;
use crate::storage::{MemoryStore, StoreError};

/// Service tying the oracle, the consolidation engine, and the store
/// together.
pub struct MemoryService {
    store: Arc<dyn MemoryStore>,
    oracle: Arc<dyn ExtractionOracle>,
    conflict_pairs: ConflictPairs,
    user_locks: DashMap<String, Arc<TokioMutex<()>>>,
    max_retries: u32,
    retry_delay: Duration,
}

impl MemoryService {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        oracle: Arc<dyn ExtractionOracle>,
        conflict_pairs: ConflictPairs,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        info!(
            "MemoryService initialized (store: {}, oracle: {})",
            store.name(),
            oracle.name()
        );
        Self {
            store,
            oracle,
            conflict_pairs,
            user_locks: DashMap::new(),
            max_retries,
            retry_delay,
        }
    }

    /// Extract memory updates from a message and consolidate them into
    /// the user's snapshot.
    ///
    /// Oracle failure or garbage output degrades to "no update" and an
    /// empty change log. Store failure after retry exhaustion surfaces
    /// as `StorageUnavailable`.
    pub async fn record_message(&self, user_id: &str, message: &str) -> Result<Vec<ChangeEntry>> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let current = self.load_snapshot(user_id).await?;

        let ops = match self.oracle.propose(message, &current).await {
            Ok(ops) => ops,
            Err(e) => {
                warn!("Oracle failed for user {user_id}, skipping memory update: {e}");
                return Ok(Vec::new());
            }
        };

        if ops.is_empty() {
            debug!("No memory updates for user {user_id}");
            return Ok(Vec::new());
        }

        let (next, changes) = consolidate(&current, &ops, &self.conflict_pairs);

        self.with_retry(|| self.store.save(user_id, &next)).await?;
        info!(
            "Updated {} memory field(s) for user {user_id}",
            changes.len()
        );

        Ok(changes)
    }

    /// Current snapshot for a user; empty if none exists.
    pub async fn snapshot(&self, user_id: &str) -> Result<Snapshot> {
        self.load_snapshot(user_id).await
    }

    /// Delete one field. Returns whether it existed.
    pub async fn delete_field(&self, user_id: &str, field: &str) -> Result<bool> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        self.with_retry(|| self.store.delete_field(user_id, field))
            .await
    }

    /// Wipe the user's snapshot. Returns whether anything was stored.
    pub async fn delete_all(&self, user_id: &str) -> Result<bool> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        self.with_retry(|| self.store.delete_all(user_id)).await
    }

    /// Render the user's snapshot for prompt injection.
    pub async fn context(&self, user_id: &str) -> Result<String> {
        let snapshot = self.load_snapshot(user_id).await?;
        Ok(format_context(&snapshot))
    }

    async fn load_snapshot(&self, user_id: &str) -> Result<Snapshot> {
        let loaded = self.with_retry(|| self.store.load(user_id)).await?;
        Ok(loaded.unwrap_or_default())
    }

    fn lock_for(&self, user_id: &str) -> Arc<TokioMutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Run a store operation with bounded retries on `Unavailable`.
    ///
    /// Corrupt documents are not retried; retry exhaustion maps to the
    /// distinct `StorageUnavailable` error so callers can tell "backend
    /// down" apart from an empty snapshot.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        let attempts = self.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(StoreError::Unavailable(msg)) => {
                    warn!("Store operation failed (attempt {attempt}/{attempts}): {msg}");
                    last_error = Some(msg);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(StoreError::Corrupt(msg)) => {
                    return Err(RecallError::Storage(msg));
                }
            }
        }

        Err(RecallError::StorageUnavailable(format!(
            "Store operation failed after {attempts} attempts: {}",
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;
    use crate::testing::{FlakyStore, MockOracle};
    use serde_json::json;

    fn service_with(oracle: MockOracle) -> MemoryService {
        MemoryService::new(
            Arc::new(MemStore::new()),
            Arc::new(oracle),
            ConflictPairs::default(),
            3,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_record_message_creates_and_returns_changes() {
        let service = service_with(MockOracle::proposing(json!({"name": "John", "age": 28})));

        let changes = service.record_message("u", "I'm John, 28").await.unwrap();
        assert_eq!(changes.len(), 2);

        let snapshot = service.snapshot("u").await.unwrap();
        assert_eq!(snapshot, Snapshot::from_json(&json!({"name": "John", "age": 28})));
    }

    #[tokio::test]
    async fn test_oracle_failure_degrades_to_no_update() {
        let service = service_with(MockOracle::failing());

        let changes = service.record_message("u", "anything").await.unwrap();
        assert!(changes.is_empty());
        assert!(service.snapshot("u").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_proposal_skips_save() {
        let service = service_with(MockOracle::proposing(json!({})));

        let changes = service.record_message("u", "hello").await.unwrap();
        assert!(changes.is_empty());
        assert!(service.snapshot("u").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_renders_snapshot() {
        let service = service_with(MockOracle::proposing(json!({"name": "John"})));

        assert_eq!(service.context("u").await.unwrap(), "");
        service.record_message("u", "I'm John").await.unwrap();
        assert_eq!(
            service.context("u").await.unwrap(),
            "User Personal Information:\n- name: John"
        );
    }

    #[tokio::test]
    async fn test_delete_field_and_all() {
        let service = service_with(MockOracle::proposing(json!({"name": "John", "age": 28})));
        service.record_message("u", "msg").await.unwrap();

        assert!(service.delete_field("u", "age").await.unwrap());
        assert!(!service.delete_field("u", "age").await.unwrap());
        assert!(service.delete_all("u").await.unwrap());
        assert!(!service.delete_all("u").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_retry_recovers_from_transient_failure() {
        let store = Arc::new(FlakyStore::failing_next(2));
        let service = MemoryService::new(
            store,
            Arc::new(MockOracle::proposing(json!({"name": "John"}))),
            ConflictPairs::default(),
            3,
            Duration::from_millis(1),
        );

        let changes = service.record_message("u", "I'm John").await.unwrap();
        assert_eq!(changes.len(), 1);
    }

    #[tokio::test]
    async fn test_store_retry_exhaustion_is_storage_unavailable() {
        let store = Arc::new(FlakyStore::failing_next(u32::MAX));
        let service = MemoryService::new(
            store,
            Arc::new(MockOracle::proposing(json!({"name": "John"}))),
            ConflictPairs::default(),
            2,
            Duration::from_millis(1),
        );

        let err = service.record_message("u", "I'm John").await.unwrap_err();
        assert!(matches!(err, RecallError::StorageUnavailable(_)));
    }
}
