//! Extraction oracle for memory updates
//!
//! The oracle analyzes a user message against the current snapshot and
//! proposes update operations. It is opaque, fallible, and
//! non-deterministic; the rest of the system tolerates empty or garbage
//! output from it.

pub mod prompts;
pub mod remote;
pub mod types;

use async_trait::async_trait;

use crate::memory::types::{OperationSet, Snapshot};

pub use remote::RemoteOracle;
pub use types::OracleError;

/// Trait for extraction oracle backends
///
/// Implementations turn a free-text message plus the user's current
/// snapshot into a set of proposed update operations.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Propose update operations for one message.
    ///
    /// An empty operation set is a valid outcome (nothing personal in the
    /// message). Failure must be tolerated by the caller, not propagated
    /// to the end user.
    async fn propose(&self, message: &str, current: &Snapshot)
    -> Result<OperationSet, OracleError>;

    /// Check if the oracle can handle requests (API key present, etc.)
    async fn is_available(&self) -> bool;

    /// Oracle name for logging
    fn name(&self) -> &'static str;
}

/// Oracle that never proposes anything.
///
/// Used when extraction is disabled in config; messages flow through
/// without touching memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

#[async_trait]
impl ExtractionOracle for NullOracle {
    async fn propose(
        &self,
        _message: &str,
        _current: &Snapshot,
    ) -> Result<OperationSet, OracleError> {
        Ok(OperationSet::default())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
