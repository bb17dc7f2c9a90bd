//! Error types for Recall

use thiserror::Error;

/// Main error type for Recall operations
#[derive(Error, Debug)]
pub enum RecallError {
    /// Storage-related errors (corrupt documents, file system, etc.)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Storage could not be reached after retry exhaustion.
    ///
    /// Kept distinct from `Storage` so callers can tell "backend down"
    /// apart from a valid empty-snapshot state.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Extraction oracle errors
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Recall operations
pub type Result<T> = std::result::Result<T, RecallError>;
