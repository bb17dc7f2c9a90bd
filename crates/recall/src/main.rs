//! Recall Daemon - durable per-user memory for chat applications

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use recall_server::config::Config;
use recall_server::error::Result;
use recall_server::memory::{ConflictPairs, MemoryService};
use recall_server::oracle::{ExtractionOracle, NullOracle, RemoteOracle};
use recall_server::server::RecallServer;
use recall_server::storage::FileStore;

/// Recall - durable per-user memory for chat applications
#[derive(Parser)]
#[command(name = "recall")]
#[command(about = "A small HTTP service that gives your chat app durable per-user memory")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the memory server (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,recall_server=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = config_path {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(&path).map_err(|e| {
            recall_server::RecallError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            recall_server::RecallError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    } else {
        let default_paths = [
            dirs::home_dir().map(|h| h.join(".recall").join("config.toml")),
            dirs::config_dir().map(|c| c.join("recall").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path_opt in default_paths.iter().flatten() {
            if path_opt.exists() {
                tracing::info!("Loading config from: {}", path_opt.display());
                let content = std::fs::read_to_string(path_opt).map_err(|e| {
                    recall_server::RecallError::Config(format!(
                        "Failed to read config file {}: {}",
                        path_opt.display(),
                        e
                    ))
                })?;
                let config: Config = toml::from_str(&content).map_err(|e| {
                    recall_server::RecallError::Config(format!("Failed to parse config: {e}"))
                })?;
                return Ok(config);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    tracing::info!("Starting Recall daemon");

    let config = load_config(config_path)?;
    tracing::debug!("Config loaded: {:?}", config);

    let data_dir = &config.storage.data_dir;
    tracing::info!("Initializing storage at: {}", data_dir.display());
    let store = FileStore::new(data_dir)
        .map_err(|e| recall_server::RecallError::Storage(e.to_string()))?;

    let oracle: Arc<dyn ExtractionOracle> = if config.oracle.enabled {
        let remote = RemoteOracle::new(&config.oracle)
            .map_err(|e| recall_server::RecallError::Config(e.to_string()))?;
        Arc::new(remote)
    } else {
        tracing::warn!("Extraction disabled; messages will not update memory");
        Arc::new(NullOracle)
    };

    let service = Arc::new(MemoryService::new(
        Arc::new(store),
        oracle,
        ConflictPairs::new(config.memory.conflict_pairs.clone()),
        config.storage.max_retries,
        Duration::from_millis(config.storage.retry_delay_ms),
    ));

    let server = RecallServer::new(config.server.clone(), service);
    tracing::info!("Starting memory server on {}", config.server.listen_addr);

    server.serve().await?;

    tracing::info!("Recall daemon stopped");
    Ok(())
}
