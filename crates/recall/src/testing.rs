//! Test utilities for recall - shared mocks
//!
//! Deterministic stand-ins for the two external collaborators, so the
//! engine and service can be tested without a real LLM or a real backend.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::memory::types::{OperationSet, Snapshot};
use crate::oracle::{ExtractionOracle, OracleError};
use crate::storage::{MemStore, MemoryStore, StoreError};

/// Scripted extraction oracle.
///
/// Replays canned JSON proposals instead of calling an LLM. With a
/// single proposal it repeats it forever; with a sequence it replays
/// them in order and proposes nothing once exhausted.
pub struct MockOracle {
    proposals: Mutex<VecDeque<serde_json::Value>>,
    repeat: Option<serde_json::Value>,
    fail: bool,
}

impl MockOracle {
    /// Oracle that proposes the same raw operations for every message
    pub fn proposing(ops: serde_json::Value) -> Self {
        Self {
            proposals: Mutex::new(VecDeque::new()),
            repeat: Some(ops),
            fail: false,
        }
    }

    /// Oracle that replays one proposal per message, in order
    pub fn sequence(proposals: Vec<serde_json::Value>) -> Self {
        Self {
            proposals: Mutex::new(proposals.into()),
            repeat: None,
            fail: false,
        }
    }

    /// Oracle that simulates failures
    pub fn failing() -> Self {
        Self {
            proposals: Mutex::new(VecDeque::new()),
            repeat: None,
            fail: true,
        }
    }
}

#[async_trait]
impl ExtractionOracle for MockOracle {
    async fn propose(
        &self,
        _message: &str,
        _current: &Snapshot,
    ) -> Result<OperationSet, OracleError> {
        if self.fail {
            return Err(OracleError::Api("Mock failure".into()));
        }

        let next = self
            .proposals
            .lock()
            .expect("proposal queue poisoned")
            .pop_front();

        let raw = match next.or_else(|| self.repeat.clone()) {
            Some(raw) => raw,
            None => return Ok(OperationSet::default()),
        };

        Ok(OperationSet::from_json(&raw))
    }

    async fn is_available(&self) -> bool {
        !self.fail
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Store that fails its next N operations with `Unavailable`, then
/// behaves like a normal in-memory store. Used to exercise the service's
/// retry path.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemStore,
    failures_left: AtomicU32,
}

impl FlakyStore {
    pub fn failing_next(failures: u32) -> Self {
        Self {
            inner: MemStore::new(),
            failures_left: AtomicU32::new(failures),
        }
    }

    fn maybe_fail(&self) -> Result<(), StoreError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            // Saturating decrement so u32::MAX means "fail forever"
            if left != u32::MAX {
                self.failures_left.store(left - 1, Ordering::SeqCst);
            }
            return Err(StoreError::Unavailable("Injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for FlakyStore {
    async fn load(&self, user_id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.maybe_fail()?;
        self.inner.load(user_id).await
    }

    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.maybe_fail()?;
        self.inner.save(user_id, snapshot).await
    }

    async fn delete_field(&self, user_id: &str, field: &str) -> Result<bool, StoreError> {
        self.maybe_fail()?;
        self.inner.delete_field(user_id, field).await
    }

    async fn delete_all(&self, user_id: &str) -> Result<bool, StoreError> {
        self.maybe_fail()?;
        self.inner.delete_all(user_id).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_oracle_repeats_proposal() {
        let oracle = MockOracle::proposing(json!({"name": "John"}));
        let snapshot = Snapshot::new();

        for _ in 0..3 {
            let ops = oracle.propose("msg", &snapshot).await.unwrap();
            assert_eq!(ops.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_mock_oracle_sequence_exhausts() {
        let oracle = MockOracle::sequence(vec![json!({"name": "John"}), json!({"age": 28})]);
        let snapshot = Snapshot::new();

        assert_eq!(oracle.propose("a", &snapshot).await.unwrap().len(), 1);
        assert_eq!(oracle.propose("b", &snapshot).await.unwrap().len(), 1);
        assert!(oracle.propose("c", &snapshot).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flaky_store_recovers() {
        let store = FlakyStore::failing_next(1);
        assert!(store.load("u").await.is_err());
        assert!(store.load("u").await.is_ok());
    }
}
