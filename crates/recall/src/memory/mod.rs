//! Memory types and consolidation
//!
//! The core of Recall: the snapshot data model, the pure consolidation
//! engine, the context formatter, and the service that orchestrates one
//! consolidation cycle per incoming message.

pub mod consolidate;
pub mod context;
pub mod service;
pub mod types;

pub use consolidate::{ConflictPairs, consolidate};
pub use context::format_context;
pub use service::MemoryService;
pub use types::{
    ChangeEntry, ChangeEvent, FieldValue, Operation, OperationSet, RemoveTarget, Scalar, Snapshot,
};
