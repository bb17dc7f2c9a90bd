use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Recall
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Snapshot storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Extraction oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Consolidation behavior configuration
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8177")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8177".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory for all storage data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Bounded retry attempts for store operations
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between store retries, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".recall"))
        .unwrap_or_else(|| PathBuf::from(".recall"))
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    200
}

/// Extraction oracle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Enable LLM-based extraction (disabled = messages never touch memory)
    #[serde(default = "default_oracle_enabled")]
    pub enabled: bool,
    /// OpenAI-compatible API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Model to use for extraction
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: default_oracle_enabled(),
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

fn default_oracle_enabled() -> bool {
    true
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_oracle_timeout_secs() -> u64 {
    30
}

/// Consolidation behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Field-name pairs kept mutually exclusive during consolidation
    #[serde(default = "default_conflict_pairs")]
    pub conflict_pairs: Vec<(String, String)>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            conflict_pairs: default_conflict_pairs(),
        }
    }
}

fn default_conflict_pairs() -> Vec<(String, String)> {
    vec![("likes".to_string(), "dislikes".to_string())]
}
