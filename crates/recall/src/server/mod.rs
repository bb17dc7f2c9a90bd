//! HTTP surface for the memory service
//!
//! A thin axum layer over `MemoryService`; the endpoints carry no logic
//! of their own beyond status mapping.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{RecallError, Result};
use crate::memory::MemoryService;

use handlers::{
    context_handler, delete_all_handler, delete_field_handler, memories_handler,
    record_message_handler,
};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// The memory service every endpoint wraps
    pub service: Arc<MemoryService>,
}

/// The main HTTP server
pub struct RecallServer {
    config: ServerConfig,
    service: Arc<MemoryService>,
}

impl RecallServer {
    /// Create a new server with the given configuration and service
    pub fn new(config: ServerConfig, service: Arc<MemoryService>) -> Self {
        Self { config, service }
    }

    /// Start the server and listen for requests
    pub async fn serve(&self) -> Result<()> {
        let state = Arc::new(AppState {
            service: self.service.clone(),
        });

        let app = create_router(state, Duration::from_secs(self.config.timeout_secs));

        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|e| RecallError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Starting memory server on {addr}");

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RecallError::Server(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RecallError::Server(format!("Server error: {e}")))?;

        tracing::info!("Memory server shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>, timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/users/{user_id}/messages", post(record_message_handler))
        .route(
            "/users/{user_id}/memories",
            get(memories_handler).delete(delete_all_handler),
        )
        .route(
            "/users/{user_id}/memories/{field}",
            delete(delete_field_handler),
        )
        .route("/users/{user_id}/context", get(context_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

/// Health check endpoint - returns JSON status
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
