//! Oracle-specific errors

/// Errors an extraction oracle can produce.
///
/// All of these are soft from the service's point of view: any oracle
/// failure degrades to "no memory update" for the message.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for oracle operations
pub type Result<T> = std::result::Result<T, OracleError>;
