//! # Analysis Report
//!
//! Read-only, serializable views of a session for rendering layers: headline
//! numbers, per-community summaries and the bridge table with community
//! labels on both ends.
//!
//! Nothing here writes back into engine state.

use crate::graph::{Graph, GraphStore};
use crate::metrics::MetricsSnapshot;
use crate::partition::Partition;
use crate::{CommunityId, NodeLabel};
use serde::{Deserialize, Serialize};

/// One detected community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: CommunityId,
    pub size: usize,
    /// Edges with both endpoints inside the community.
    pub internal_edges: u64,
    /// Sum of member degrees.
    pub degree_sum: u64,
    pub members: Vec<NodeLabel>,
}

/// One row of the bridge table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRow {
    pub source: NodeLabel,
    pub source_community: CommunityId,
    pub target: NodeLabel,
    pub target_community: CommunityId,
}

/// Everything a display needs for one session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub community_count: usize,
    pub modularity: f64,
    pub polarization: f64,
    pub communities: Vec<CommunitySummary>,
    pub bridges: Vec<BridgeRow>,
}

impl AnalysisReport {
    /// Assemble a report. Communities are listed by id, bridges in canonical
    /// edge order.
    #[must_use]
    pub fn build(graph: &Graph, partition: &Partition, snapshot: &MetricsSnapshot) -> Self {
        let tallies = snapshot.tallies();

        let communities = (0..partition.community_count() as u32)
            .map(CommunityId)
            .map(|id| {
                let members: Vec<NodeLabel> = partition
                    .members(id)
                    .into_iter()
                    .filter_map(|node| graph.label(node).cloned())
                    .collect();
                CommunitySummary {
                    id,
                    size: members.len(),
                    internal_edges: tallies.internal_edges(id),
                    degree_sum: tallies.degree_sum(id),
                    members,
                }
            })
            .collect();

        let bridges = snapshot
            .bridge_edges
            .iter()
            .filter_map(|&edge| {
                let (source, target) = graph.edge_labels(edge)?;
                Some(BridgeRow {
                    source: source.clone(),
                    source_community: partition.community_of(edge.lo())?,
                    target: target.clone(),
                    target_community: partition.community_of(edge.hi())?,
                })
            })
            .collect();

        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            community_count: partition.community_count(),
            modularity: snapshot.modularity,
            polarization: snapshot.polarization,
            communities,
            bridges,
        }
    }
}
