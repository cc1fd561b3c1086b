//! Server-side modules for the todo sync server.

pub mod api;
pub mod registry;
pub mod store;
pub mod sync;

pub use api::ApiError;
pub use registry::{Connection, ConnectionId, ConnectionRegistry, TransportError};
pub use store::{StoreError, TodoStore, TodoTable};
pub use sync::SyncHub;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<SyncHub>,
}

impl AppState {
    /// Creates state around a fresh, empty hub.
    pub fn new() -> Self {
        Self::with_hub(Arc::new(SyncHub::new()))
    }

    pub fn with_hub(hub: Arc<SyncHub>) -> Self {
        Self { hub }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the full HTTP + WebSocket router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(sync::ws_handler))
        .route("/api/todos", get(api::list_todos).post(api::create_todo))
        .route(
            "/api/todos/{id}",
            get(api::get_todo)
                .put(api::update_todo)
                .delete(api::delete_todo),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
