//! Todo Sync Server
//!
//! Serves the todo REST API and pushes every change to clients connected on
//! the `/ws` WebSocket endpoint. State is held in memory only.
//!
//! # Configuration
//!
//! Environment variables:
//! - `TODO_HOST`: Address to bind (default: 0.0.0.0)
//! - `TODO_PORT`: Port to listen on (default: 8000)
//! - `RUST_LOG`: Log filter (default: todo_sync=info,todo_server=info,tower_http=info)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check
//! - `GET|POST /api/todos`: List or create todos
//! - `GET|PUT|DELETE /api/todos/{id}`: Read, retitle or delete a todo
//! - `GET /ws`: Live sync (init snapshot, then create/update/delete events)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use todo_sync::server::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// Configuration
// ============================================================================

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Address to bind
    host: IpAddr,
    /// Port to listen on
    port: u16,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let host = std::env::var("TODO_HOST")
            .ok()
            .and_then(|h| h.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let port = std::env::var("TODO_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        Self { host, port }
    }

    fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "todo_sync=info,todo_server=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::new());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
