//! # Echoscope HTTP API Module
//!
//! This module implements the HTTP JSON API server using axum. The server
//! owns exactly one simulation session.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /load` - Upload a graph (`{"edges": [[u, v], ...]}` or `{"text": "..."}`)
//! - `POST /edges/add` - Add an edge (`{"source", "target"}`)
//! - `POST /edges/remove` - Remove an edge
//! - `GET /metrics` - Modularity, polarization, bridge count
//! - `GET /partition` - Node → community assignment
//! - `GET /bridges` - Bridge table
//! - `GET /report` - Everything above in one document
//! - `GET /verify` - Compare incremental metrics with a full recompute
//!
//! ## CORS
//!
//! `server.cors_origins` in `echoscope.toml` (or `ECHOSCOPE_CORS_ORIGINS`):
//! empty means localhost only, `*` allows every origin.

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `echoscope::api::*`)
pub use handlers::{
    ApiError, add_edge_handler, bridges_handler, health_handler, load_handler, metrics_handler,
    partition_handler, remove_edge_handler, report_handler, status_for, verify_handler,
};
pub use types::{
    BridgesResponse, EdgeRequest, EdgeResponse, ErrorResponse, HealthResponse, LoadRequest,
    LoadResponse, LoadSource, MetricsResponse, PartitionResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use echoscope_core::{EchoError, SimulationController};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (16 MB), sized for edge-list uploads.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the simulation session.
#[derive(Clone, Default)]
pub struct AppState {
    /// The one controller of this process. Writers are serialized by the lock.
    pub controller: Arc<RwLock<SimulationController>>,
}

impl AppState {
    /// Create new app state around a controller.
    #[must_use]
    pub fn new(controller: SimulationController) -> Self {
        Self {
            controller: Arc::new(RwLock::new(controller)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from configured origins.
///
/// - `["*"]`: allows all origins
/// - empty: localhost only
/// - otherwise: the listed origins; invalid entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/load", post(handlers::load_handler))
        .route("/edges/add", post(handlers::add_edge_handler))
        .route("/edges/remove", post(handlers::remove_edge_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/partition", get(handlers::partition_handler))
        .route("/bridges", get(handlers::bridges_handler))
        .route("/report", get(handlers::report_handler))
        .route("/verify", get(handlers::verify_handler))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(build_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(
    addr: &str,
    controller: SimulationController,
    cors_origins: &[String],
) -> Result<(), EchoError> {
    let router = create_router(AppState::new(controller), cors_origins);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EchoError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Echoscope HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| EchoError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
