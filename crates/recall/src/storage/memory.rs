//! In-memory store
//!
//! DashMap-backed implementation used by tests and as an ephemeral mode
//! when no durability is wanted. Semantics match `FileStore`.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::memory::types::Snapshot;
use crate::storage::{MemoryStore, StoreError};

/// Ephemeral memory store keyed by user id.
#[derive(Debug, Default)]
pub struct MemStore {
    docs: DashMap<String, Snapshot>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for MemStore {
    async fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.docs.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.docs.insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn delete_field(&self, user_id: &str, field: &str) -> Result<bool, StoreError> {
        let Some(mut entry) = self.docs.get_mut(user_id) else {
            return Ok(false);
        };
        Ok(entry.value_mut().remove(field).is_some())
    }

    async fn delete_all(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.docs.remove(user_id).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mem_store_round_trip() {
        let store = MemStore::new();
        let snap = Snapshot::from_json(&json!({"name": "John"}));

        assert!(store.load("u").await.unwrap().is_none());
        store.save("u", &snap).await.unwrap();
        assert_eq!(store.load("u").await.unwrap().unwrap(), snap);
    }

    #[tokio::test]
    async fn test_mem_store_delete_field_and_all() {
        let store = MemStore::new();
        let snap = Snapshot::from_json(&json!({"name": "John", "age": 28}));
        store.save("u", &snap).await.unwrap();

        assert!(store.delete_field("u", "age").await.unwrap());
        assert!(!store.delete_field("u", "age").await.unwrap());
        assert!(store.delete_all("u").await.unwrap());
        assert!(!store.delete_all("u").await.unwrap());
    }
}
