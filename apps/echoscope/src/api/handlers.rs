//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        BridgesResponse, EdgeRequest, EdgeResponse, ErrorResponse, HealthResponse, LoadRequest,
        LoadResponse, LoadSource, MetricsResponse, PartitionResponse,
    },
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use echoscope_core::{AnalysisReport, EchoError, GraphStore};

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for an engine error.
#[must_use]
pub fn status_for(e: &EchoError) -> StatusCode {
    match e {
        EchoError::MalformedInput { .. }
        | EchoError::EmptyGraph
        | EchoError::SelfLoop(_)
        | EchoError::Serialization(_) => StatusCode::BAD_REQUEST,
        EchoError::InvalidNode(_) => StatusCode::NOT_FOUND,
        EchoError::NotLoaded => StatusCode::CONFLICT,
        EchoError::InvalidOperation(_) | EchoError::Config(_) | EchoError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn api_error(e: &EchoError) -> ApiError {
    let status = status_for(e);
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    } else {
        tracing::debug!(error = %e, "request rejected");
    }
    (status, Json(ErrorResponse::from(e)))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let controller = state.controller.read().await;
    Json(HealthResponse::new(controller.is_loaded()))
}

// =============================================================================
// LOAD HANDLER
// =============================================================================

/// Replace the session with a freshly uploaded graph.
pub async fn load_handler(
    State(state): State<AppState>,
    Json(request): Json<LoadRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    let source = request.into_source().map_err(|e| api_error(&e))?;

    let mut controller = state.controller.write().await;
    let loaded = match source {
        LoadSource::Edges(edges) => controller.load(edges),
        LoadSource::Text(text) => controller.load_text(&text),
    };
    let snapshot = loaded.map_err(|e| api_error(&e))?;

    let (node_count, edge_count) = controller
        .graph()
        .map(|g| (g.node_count(), g.edge_count()))
        .unwrap_or_default();
    let community_count = controller
        .partition()
        .map(|p| p.community_count())
        .unwrap_or_default();

    Ok(Json(LoadResponse {
        node_count,
        edge_count,
        community_count,
        metrics: MetricsResponse::from(&snapshot),
    }))
}

// =============================================================================
// EDGE HANDLERS
// =============================================================================

/// Add an edge.
pub async fn add_edge_handler(
    State(state): State<AppState>,
    Json(request): Json<EdgeRequest>,
) -> Result<Json<EdgeResponse>, ApiError> {
    apply_edge(&state, &request, true).await
}

/// Remove an edge.
pub async fn remove_edge_handler(
    State(state): State<AppState>,
    Json(request): Json<EdgeRequest>,
) -> Result<Json<EdgeResponse>, ApiError> {
    apply_edge(&state, &request, false).await
}

async fn apply_edge(
    state: &AppState,
    request: &EdgeRequest,
    add: bool,
) -> Result<Json<EdgeResponse>, ApiError> {
    request.validate().map_err(|e| api_error(&e))?;

    let mut controller = state.controller.write().await;
    let result = if add {
        controller.add_edge(&request.source, &request.target)
    } else {
        controller.remove_edge(&request.source, &request.target)
    };
    let update = result.map_err(|e| api_error(&e))?;

    Ok(Json(EdgeResponse {
        outcome: update.outcome,
        metrics: MetricsResponse::from(update.metrics),
    }))
}

// =============================================================================
// READ HANDLERS
// =============================================================================

fn require_loaded<T>(value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| api_error(&EchoError::NotLoaded))
}

/// Current headline metrics.
pub async fn metrics_handler(
    State(state): State<AppState>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let controller = state.controller.read().await;
    let snapshot = require_loaded(controller.snapshot())?;
    Ok(Json(MetricsResponse::from(snapshot)))
}

/// Node → community assignment.
pub async fn partition_handler(
    State(state): State<AppState>,
) -> Result<Json<PartitionResponse>, ApiError> {
    let controller = state.controller.read().await;
    let assignments = require_loaded(controller.current_partition())?;
    let community_count = controller
        .partition()
        .map(|p| p.community_count())
        .unwrap_or_default();
    Ok(Json(PartitionResponse {
        community_count,
        assignments,
    }))
}

/// Bridge table.
pub async fn bridges_handler(
    State(state): State<AppState>,
) -> Result<Json<BridgesResponse>, ApiError> {
    let controller = state.controller.read().await;
    let report = require_loaded(controller.report())?;
    Ok(Json(BridgesResponse {
        bridges: report.bridges,
    }))
}

/// Full report.
pub async fn report_handler(
    State(state): State<AppState>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let controller = state.controller.read().await;
    require_loaded(controller.report()).map(Json)
}

/// Compare the maintained snapshot with a full recompute.
pub async fn verify_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let controller = state.controller.read().await;
    let consistent = controller.verify().map_err(|e| api_error(&e))?;
    Ok(Json(serde_json::json!({ "consistent": consistent })))
}
