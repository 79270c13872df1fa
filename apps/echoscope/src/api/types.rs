//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use echoscope_core::{
    BridgeRow, CommunityId, EchoError, EdgeOutcome, MetricsSnapshot, MetricsSummary, NodeLabel,
    primitives::MAX_LABEL_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether a graph is currently loaded.
    pub loaded: bool,
}

impl HealthResponse {
    #[must_use]
    pub fn new(loaded: bool) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            loaded,
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

impl From<&EchoError> for ErrorResponse {
    fn from(e: &EchoError) -> Self {
        Self::new(e.to_string())
    }
}

// =============================================================================
// METRICS RESPONSE
// =============================================================================

/// Headline numbers of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub modularity: f64,
    pub polarization: f64,
    pub bridge_count: usize,
    pub edge_count: u64,
}

impl From<MetricsSummary> for MetricsResponse {
    fn from(summary: MetricsSummary) -> Self {
        Self {
            modularity: summary.modularity,
            polarization: summary.polarization,
            bridge_count: summary.bridge_count,
            edge_count: summary.edge_count,
        }
    }
}

impl From<&MetricsSnapshot> for MetricsResponse {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self::from(snapshot.summary())
    }
}

// =============================================================================
// LOAD REQUEST/RESPONSE
// =============================================================================

/// Graph upload. Exactly one of `edges` or `text` must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Label pairs, e.g. `[["alice", "bob"], ["bob", "carol"]]`.
    ///
    /// Kept as plain lists so a wrong-sized entry becomes a `MalformedInput`
    /// naming the pair, not an extractor rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<Vec<String>>>,
    /// Raw edge-list text, one pair per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Where a load request gets its edges from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Edges(Vec<(String, String)>),
    Text(String),
}

impl LoadRequest {
    /// Pick the single edge source of the request.
    ///
    /// # Errors
    /// `Serialization` unless exactly one source is present,
    /// `MalformedInput` (1-based pair index) for an entry that is not a pair.
    pub fn into_source(self) -> Result<LoadSource, EchoError> {
        match (self.edges, self.text) {
            (Some(edges), None) => edges
                .into_iter()
                .enumerate()
                .map(|(index, entry)| into_pair(index + 1, entry))
                .collect::<Result<Vec<_>, _>>()
                .map(LoadSource::Edges),
            (None, Some(text)) => Ok(LoadSource::Text(text)),
            (Some(_), Some(_)) => Err(EchoError::Serialization(
                "Provide either \"edges\" or \"text\", not both".to_string(),
            )),
            (None, None) => Err(EchoError::Serialization(
                "Request must contain \"edges\" or \"text\"".to_string(),
            )),
        }
    }
}

fn into_pair(position: usize, entry: Vec<String>) -> Result<(String, String), EchoError> {
    let content = entry.join(" ");
    let mut labels = entry.into_iter();
    match (labels.next(), labels.next(), labels.next()) {
        (Some(source), Some(target), None) => Ok((source, target)),
        _ => Err(EchoError::MalformedInput {
            line: position,
            content,
        }),
    }
}

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResponse {
    pub node_count: usize,
    pub edge_count: usize,
    pub community_count: usize,
    pub metrics: MetricsResponse,
}

// =============================================================================
// EDGE REQUEST/RESPONSE
// =============================================================================

/// Add or remove one edge by label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRequest {
    pub source: String,
    pub target: String,
}

impl EdgeRequest {
    /// Reject labels no loaded graph could contain before taking the lock.
    pub fn validate(&self) -> Result<(), EchoError> {
        for label in [&self.source, &self.target] {
            if label.len() > MAX_LABEL_LENGTH {
                return Err(EchoError::InvalidNode(format!(
                    "label of {} bytes exceeds maximum {}",
                    label.len(),
                    MAX_LABEL_LENGTH
                )));
            }
        }
        Ok(())
    }
}

/// Result of an add/remove request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeResponse {
    pub outcome: EdgeOutcome,
    pub metrics: MetricsResponse,
}

// =============================================================================
// PARTITION / BRIDGES RESPONSES
// =============================================================================

/// Node label → community id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionResponse {
    pub community_count: usize,
    pub assignments: BTreeMap<NodeLabel, CommunityId>,
}

/// The bridge table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgesResponse {
    pub bridges: Vec<BridgeRow>,
}
