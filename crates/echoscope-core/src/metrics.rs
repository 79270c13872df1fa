//! # Metrics Engine
//!
//! Modularity, community assortativity ("polarization") and the bridge-edge
//! set, computed from a graph and a frozen partition.
//!
//! ## Aggregates
//!
//! Both scalar metrics are pure functions of three integer tallies:
//! - `L`: total edge count
//! - `L_c`: edges with both endpoints in community `c`
//! - `D_c`: degree sum of the members of `c`
//!
//! ```text
//! Q = Σ_c [ L_c / L − (D_c / 2L)² ]
//! r = (Σ_c e_cc − Σ_c a_c²) / (1 − Σ_c a_c²)     e_cc = L_c / L,  a_c = D_c / 2L
//! ```
//!
//! With the running sums Σ L_c and Σ D_c² the formulas read
//! `Q = ΣL_c/L − ΣD_c²/4L²`. A full pass builds the tallies from every edge.
//! An incremental update adjusts them, sums included, in O(1) for a single
//! add/remove. Because the tallies are integers, both paths evaluate to the
//! same floats for the same graph and partition.

use crate::graph::GraphStore;
use crate::partition::Partition;
use crate::primitives::DEGENERATE_DENOMINATOR;
use crate::{CommunityId, EchoError, Edge, EdgeOp, NodeId};
use serde::Serialize;
use std::collections::BTreeSet;

// =============================================================================
// COMMUNITY TALLIES
// =============================================================================

/// Integer aggregates the metrics are evaluated from.
///
/// Besides the per-community counts it carries the running sums Σ L_c and
/// Σ D_c², so a single edge change and the re-evaluation of both formulas
/// are O(1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommunityTallies {
    edge_count: u64,
    /// L_c, indexed by community id
    internal: Vec<u64>,
    /// D_c, indexed by community id
    degree_sum: Vec<u64>,
    /// Σ_c L_c
    internal_total: u64,
    /// Σ_c D_c²
    degree_squares: u128,
}

impl CommunityTallies {
    fn with_communities(count: usize) -> Self {
        Self {
            edge_count: 0,
            internal: vec![0; count],
            degree_sum: vec![0; count],
            internal_total: 0,
            degree_squares: 0,
        }
    }

    /// Recompute the running sums from the per-community counts.
    fn refresh_totals(&mut self) {
        self.internal_total = self.internal.iter().sum();
        self.degree_squares = self
            .degree_sum
            .iter()
            .map(|&d| u128::from(d) * u128::from(d))
            .sum();
    }

    /// Total edge count `L`.
    #[must_use]
    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    /// Internal edge count `L_c` of a community.
    #[must_use]
    pub fn internal_edges(&self, community: CommunityId) -> u64 {
        self.internal.get(community.index()).copied().unwrap_or(0)
    }

    /// Degree sum `D_c` of a community.
    #[must_use]
    pub fn degree_sum(&self, community: CommunityId) -> u64 {
        self.degree_sum.get(community.index()).copied().unwrap_or(0)
    }

    fn check_community(&self, community: CommunityId) -> Result<(), EchoError> {
        if community.index() < self.degree_sum.len() {
            Ok(())
        } else {
            Err(EchoError::InvalidOperation(format!(
                "community {} is outside the partition",
                community
            )))
        }
    }

    /// Set `D_c` and keep Σ D_c² in step. `community` must be in range.
    fn set_degree_sum(&mut self, community: CommunityId, value: u64) {
        if let Some(slot) = self.degree_sum.get_mut(community.index()) {
            let old = u128::from(*slot);
            let new = u128::from(value);
            self.degree_squares = (self.degree_squares + new * new).saturating_sub(old * old);
            *slot = value;
        }
    }

    /// Set `L_c` and keep Σ L_c in step. `community` must be in range.
    fn set_internal(&mut self, community: CommunityId, value: u64) {
        if let Some(slot) = self.internal.get_mut(community.index()) {
            self.internal_total = (self.internal_total + value).saturating_sub(*slot);
            *slot = value;
        }
    }

    /// Account for one more edge between communities `cu` and `cv`.
    ///
    /// Both ids are checked before anything changes.
    fn record_add(&mut self, cu: CommunityId, cv: CommunityId) -> Result<(), EchoError> {
        self.check_community(cu)?;
        self.check_community(cv)?;

        self.edge_count = self.edge_count.saturating_add(1);
        if cu == cv {
            self.set_degree_sum(cu, self.degree_sum(cu).saturating_add(2));
            self.set_internal(cu, self.internal_edges(cu).saturating_add(1));
        } else {
            self.set_degree_sum(cu, self.degree_sum(cu).saturating_add(1));
            self.set_degree_sum(cv, self.degree_sum(cv).saturating_add(1));
        }
        Ok(())
    }

    /// Account for one edge less between communities `cu` and `cv`.
    ///
    /// Checks every decrement before applying any, so a failure leaves the
    /// tallies untouched.
    fn record_remove(&mut self, cu: CommunityId, cv: CommunityId) -> Result<(), EchoError> {
        self.check_community(cu)?;
        self.check_community(cv)?;

        let need_degree = if cu == cv { 2 } else { 1 };
        let underflow = self.edge_count == 0
            || self.degree_sum(cu) < need_degree
            || self.degree_sum(cv) < need_degree
            || (cu == cv && self.internal_edges(cu) == 0);
        if underflow {
            return Err(EchoError::InvalidOperation(format!(
                "removing an edge between communities {} and {} underflows the tallies",
                cu, cv
            )));
        }

        self.edge_count -= 1;
        if cu == cv {
            self.set_degree_sum(cu, self.degree_sum(cu) - 2);
            self.set_internal(cu, self.internal_edges(cu) - 1);
        } else {
            self.set_degree_sum(cu, self.degree_sum(cu) - 1);
            self.set_degree_sum(cv, self.degree_sum(cv) - 1);
        }
        Ok(())
    }

    /// Σ_c e_cc and Σ_c a_c², or `None` when there are no edges.
    fn fractions(&self) -> Option<(f64, f64)> {
        if self.edge_count == 0 {
            return None;
        }
        let l = self.edge_count as f64;
        let two_l = 2.0 * l;
        let internal = self.internal_total as f64 / l;
        let expected = self.degree_squares as f64 / (two_l * two_l);
        Some((internal, expected))
    }

    /// Newman modularity. 0.0 for an edgeless graph.
    #[must_use]
    pub fn modularity(&self) -> f64 {
        self.fractions()
            .map_or(0.0, |(internal, expected)| internal - expected)
    }

    /// Discrete assortativity over community labels.
    ///
    /// 0.0 for an edgeless graph and whenever the denominator vanishes
    /// (every edge endpoint sits in one community).
    #[must_use]
    pub fn assortativity(&self) -> f64 {
        let Some((internal, expected)) = self.fractions() else {
            return 0.0;
        };
        let denominator = 1.0 - expected;
        if denominator.abs() <= DEGENERATE_DENOMINATOR {
            return 0.0;
        }
        (internal - expected) / denominator
    }
}

fn slot_mut(values: &mut [u64], community: CommunityId) -> Result<&mut u64, EchoError> {
    values.get_mut(community.index()).ok_or_else(|| {
        EchoError::InvalidOperation(format!("community {} is outside the partition", community))
    })
}

// =============================================================================
// METRICS SNAPSHOT
// =============================================================================

/// The three headline metrics for one (graph, partition) state.
///
/// Advanced in place by [`MetricsEngine::apply_update`] during simulation.
/// [`MetricsEngine::incremental_update`] returns a fresh copy instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Newman modularity Q.
    pub modularity: f64,
    /// Community assortativity r.
    pub polarization: f64,
    /// Edges whose endpoints lie in different communities.
    pub bridge_edges: BTreeSet<Edge>,
    #[serde(skip)]
    tallies: CommunityTallies,
}

impl MetricsSnapshot {
    fn from_parts(tallies: CommunityTallies, bridge_edges: BTreeSet<Edge>) -> Self {
        Self {
            modularity: tallies.modularity(),
            polarization: tallies.assortativity(),
            bridge_edges,
            tallies,
        }
    }

    /// The aggregates this snapshot was evaluated from.
    #[must_use]
    pub fn tallies(&self) -> &CommunityTallies {
        &self.tallies
    }

    /// Number of edges in the graph this snapshot describes.
    #[must_use]
    pub fn edge_count(&self) -> u64 {
        self.tallies.edge_count
    }

    /// The scalar metrics and counts, without the bridge set.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            modularity: self.modularity,
            polarization: self.polarization,
            bridge_count: self.bridge_edges.len(),
            edge_count: self.tallies.edge_count,
        }
    }

    /// Whether two snapshots agree: identical bridge sets and tallies, metrics
    /// within `tolerance`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.bridge_edges == other.bridge_edges
            && self.tallies == other.tallies
            && (self.modularity - other.modularity).abs() <= tolerance
            && (self.polarization - other.polarization).abs() <= tolerance
    }
}

/// Fixed-size view of a snapshot, cheap to copy out of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub modularity: f64,
    pub polarization: f64,
    pub bridge_count: usize,
    pub edge_count: u64,
}

// =============================================================================
// METRICS ENGINE
// =============================================================================

/// Full and incremental metric computation.
///
/// Community assignments are read-only input; nothing here can re-run
/// detection.
pub struct MetricsEngine;

impl MetricsEngine {
    /// Compute a snapshot from scratch: one pass over nodes, one over edges.
    ///
    /// # Errors
    /// `InvalidOperation` if the partition does not cover every node.
    pub fn full_compute<G: GraphStore>(
        graph: &G,
        partition: &Partition,
    ) -> Result<MetricsSnapshot, EchoError> {
        if partition.len() != graph.node_count() {
            return Err(EchoError::InvalidOperation(format!(
                "partition covers {} nodes but the graph has {}",
                partition.len(),
                graph.node_count()
            )));
        }

        let mut tallies = CommunityTallies::with_communities(partition.community_count());

        for node in graph.node_ids() {
            let c = community(partition, node)?;
            let degree = graph.degree(node)? as u64;
            let slot = slot_mut(&mut tallies.degree_sum, c)?;
            *slot = slot.saturating_add(degree);
        }

        let mut bridges = BTreeSet::new();
        for edge in graph.edges() {
            let cu = community(partition, edge.lo())?;
            let cv = community(partition, edge.hi())?;
            tallies.edge_count = tallies.edge_count.saturating_add(1);
            if cu == cv {
                let slot = slot_mut(&mut tallies.internal, cu)?;
                *slot = slot.saturating_add(1);
            } else {
                bridges.insert(edge);
            }
        }

        tallies.refresh_totals();
        let snapshot = MetricsSnapshot::from_parts(tallies, bridges);
        tracing::debug!(
            modularity = snapshot.modularity,
            polarization = snapshot.polarization,
            bridges = snapshot.bridge_edges.len(),
            "full metrics pass"
        );
        Ok(snapshot)
    }

    /// Derive the snapshot that follows `previous` after `op` was applied to
    /// `graph`, leaving `previous` intact.
    ///
    /// Copies the bridge set once. The simulation loop uses
    /// [`MetricsEngine::apply_update`] instead.
    ///
    /// # Errors
    /// Same as [`MetricsEngine::apply_update`].
    pub fn incremental_update<G: GraphStore>(
        graph: &G,
        partition: &Partition,
        previous: &MetricsSnapshot,
        op: EdgeOp,
    ) -> Result<MetricsSnapshot, EchoError> {
        let mut next = previous.clone();
        Self::apply_update(graph, partition, &mut next, op)?;
        Ok(next)
    }

    /// Advance `snapshot` in place to reflect `op`, already applied to
    /// `graph`.
    ///
    /// Must be called after the graph mutation. Neither the edges nor the
    /// communities are rescanned: the tallies and both formulas are O(1) and
    /// the bridge set gains or loses at most one edge (O(log |B|)). Every
    /// check runs before anything is written, so on error `snapshot` is
    /// untouched.
    ///
    /// # Errors
    /// `InvalidOperation` if an endpoint is outside the partition, if the
    /// graph does not reflect `op`, or if the snapshot disagrees with `op`
    /// (bridge already present/missing, tally underflow).
    pub fn apply_update<G: GraphStore>(
        graph: &G,
        partition: &Partition,
        snapshot: &mut MetricsSnapshot,
        op: EdgeOp,
    ) -> Result<(), EchoError> {
        let edge = op.edge();
        let cu = community(partition, edge.lo())?;
        let cv = community(partition, edge.hi())?;

        if graph.has_edge(edge.lo(), edge.hi()) != op.is_add() {
            return Err(EchoError::InvalidOperation(format!(
                "graph does not reflect {:?}",
                op
            )));
        }

        let is_bridge = cu != cv;
        if is_bridge && snapshot.bridge_edges.contains(&edge) == op.is_add() {
            return Err(EchoError::InvalidOperation(format!(
                "bridge set does not match {:?}",
                op
            )));
        }

        if op.is_add() {
            snapshot.tallies.record_add(cu, cv)?;
        } else {
            snapshot.tallies.record_remove(cu, cv)?;
        }

        if is_bridge {
            if op.is_add() {
                snapshot.bridge_edges.insert(edge);
            } else {
                snapshot.bridge_edges.remove(&edge);
            }
        }
        snapshot.modularity = snapshot.tallies.modularity();
        snapshot.polarization = snapshot.tallies.assortativity();

        tracing::debug!(
            ?op,
            modularity = snapshot.modularity,
            polarization = snapshot.polarization,
            "incremental metrics update"
        );
        Ok(())
    }
}

fn community(partition: &Partition, node: NodeId) -> Result<CommunityId, EchoError> {
    partition.community_of(node).ok_or_else(|| {
        EchoError::InvalidOperation(format!("node #{} is not in the partition", node.0))
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partitioner;
    use crate::Graph;

    const TOLERANCE: f64 = 1e-9;

    fn two_triangles() -> (Graph, Partition) {
        let graph = Graph::load([
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("D", "E"),
            ("E", "F"),
            ("F", "D"),
        ])
        .expect("load");
        let partition = Partitioner::default().detect(&graph);
        (graph, partition)
    }

    fn id(graph: &Graph, label: &str) -> NodeId {
        graph.require_node(label).expect("node")
    }

    #[test]
    fn two_triangles_full_compute() {
        let (graph, partition) = two_triangles();
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        assert!((snapshot.modularity - 0.5).abs() < TOLERANCE);
        assert!((snapshot.polarization - 1.0).abs() < TOLERANCE);
        assert!(snapshot.bridge_edges.is_empty());
        assert_eq!(snapshot.edge_count(), 6);
    }

    #[test]
    fn adding_bridge_lowers_both_metrics() {
        let (mut graph, partition) = two_triangles();
        let before = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        let (a, d) = (id(&graph, "A"), id(&graph, "D"));
        assert!(graph.add_edge(a, d).expect("add"));
        let after = MetricsEngine::incremental_update(&graph, &partition, &before, EdgeOp::Add(a, d))
            .expect("update");

        assert_eq!(after.bridge_edges, BTreeSet::from([Edge::new(a, d)]));
        assert!(after.modularity < before.modularity);
        assert!(after.polarization < before.polarization);
        // L = 7, L_c = 3, D_c = 7 for both communities
        assert!((after.modularity - 2.0 * (3.0 / 7.0 - 0.25)).abs() < TOLERANCE);
        assert!((after.polarization - 2.0 * (2.0 * (3.0 / 7.0 - 0.25))).abs() < TOLERANCE);

        let full = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        assert_eq!(after, full);
    }

    #[test]
    fn intra_community_add_keeps_bridges() {
        let graph = Graph::load([("a", "b"), ("b", "c"), ("c", "d"), ("d", "a"), ("x", "y")])
            .expect("load");
        let partition = Partitioner::default().detect(&graph);
        let before = MetricsEngine::full_compute(&graph, &partition).expect("compute");

        let mut graph = graph;
        let (a, c) = (id(&graph, "a"), id(&graph, "c"));
        assert_eq!(partition.community_of(a), partition.community_of(c));
        assert!(graph.add_edge(a, c).expect("add"));
        let after = MetricsEngine::incremental_update(&graph, &partition, &before, EdgeOp::Add(a, c))
            .expect("update");

        assert_eq!(after.bridge_edges, before.bridge_edges);
        assert_eq!(
            after.tallies().internal_edges(partition.community_of(a).expect("c")),
            before.tallies().internal_edges(partition.community_of(a).expect("c")) + 1
        );
    }

    #[test]
    fn add_then_remove_restores_snapshot() {
        let (mut graph, partition) = two_triangles();
        let original = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        let (b, e) = (id(&graph, "B"), id(&graph, "E"));

        graph.add_edge(b, e).expect("add");
        let added = MetricsEngine::incremental_update(&graph, &partition, &original, EdgeOp::Add(b, e))
            .expect("add update");
        graph.remove_edge(b, e).expect("remove");
        let restored =
            MetricsEngine::incremental_update(&graph, &partition, &added, EdgeOp::Remove(e, b))
                .expect("remove update");

        assert_eq!(restored, original);
    }

    #[test]
    fn single_community_polarization_is_zero() {
        let graph = Graph::load([("a", "b"), ("b", "c"), ("c", "a")]).expect("load");
        let partition = Partitioner::default().detect(&graph);
        assert_eq!(partition.community_count(), 1);

        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        assert_eq!(snapshot.polarization, 0.0);
        assert!(snapshot.modularity.abs() < TOLERANCE);
    }

    #[test]
    fn singleton_partition_all_edges_are_bridges() {
        let mut graph = Graph::with_nodes(["a", "b", "c", "d"]).expect("nodes");
        let partition = Partitioner::default().detect(&graph);
        for (u, v) in [("a", "b"), ("b", "c"), ("c", "d"), ("a", "c")] {
            let (u, v) = (id(&graph, u), id(&graph, v));
            graph.add_edge(u, v).expect("add");
        }

        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        let all: BTreeSet<_> = graph.edges().collect();
        assert_eq!(snapshot.bridge_edges, all);
        assert!(snapshot.modularity <= 0.0);
    }

    #[test]
    fn edgeless_metrics_are_zero() {
        let graph = Graph::with_nodes(["a", "b"]).expect("nodes");
        let partition = Partitioner::default().detect(&graph);
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        assert_eq!(snapshot.modularity, 0.0);
        assert_eq!(snapshot.polarization, 0.0);
        assert!(snapshot.bridge_edges.is_empty());
    }

    #[test]
    fn partition_mismatch_rejected() {
        let (graph, _) = two_triangles();
        let other = Graph::load([("p", "q")]).expect("load");
        let small = Partitioner::default().detect(&other);
        let result = MetricsEngine::full_compute(&graph, &small);
        assert!(matches!(result, Err(EchoError::InvalidOperation(_))));
    }

    #[test]
    fn node_outside_partition_rejected() {
        let (graph, partition) = two_triangles();
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        let result = MetricsEngine::incremental_update(
            &graph,
            &partition,
            &snapshot,
            EdgeOp::Add(NodeId(0), NodeId(42)),
        );
        assert!(matches!(result, Err(EchoError::InvalidOperation(_))));
    }

    #[test]
    fn update_without_graph_mutation_rejected() {
        let (graph, partition) = two_triangles();
        let snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        let (a, d) = (id(&graph, "A"), id(&graph, "D"));
        let result =
            MetricsEngine::incremental_update(&graph, &partition, &snapshot, EdgeOp::Add(a, d));
        assert!(matches!(result, Err(EchoError::InvalidOperation(_))));
    }

    #[test]
    fn removing_every_edge_zeroes_metrics() {
        let (mut graph, partition) = two_triangles();
        let mut snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        let edges: Vec<_> = graph.edges().collect();
        for edge in edges {
            graph.remove_edge(edge.lo(), edge.hi()).expect("remove");
            snapshot = MetricsEngine::incremental_update(
                &graph,
                &partition,
                &snapshot,
                EdgeOp::Remove(edge.lo(), edge.hi()),
            )
            .expect("update");
        }
        assert_eq!(snapshot.edge_count(), 0);
        assert_eq!(snapshot.modularity, 0.0);
        assert_eq!(snapshot.polarization, 0.0);
    }

    #[test]
    fn apply_update_matches_incremental_update() {
        let (mut graph, partition) = two_triangles();
        let before = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        let (c, e) = (id(&graph, "C"), id(&graph, "E"));
        graph.add_edge(c, e).expect("add");

        let copied = MetricsEngine::incremental_update(&graph, &partition, &before, EdgeOp::Add(c, e))
            .expect("update");
        let mut in_place = before.clone();
        MetricsEngine::apply_update(&graph, &partition, &mut in_place, EdgeOp::Add(c, e))
            .expect("apply");

        assert_eq!(in_place, copied);
        assert_ne!(in_place, before);
        assert_eq!(in_place.summary().bridge_count, 1);
        assert_eq!(in_place.summary().edge_count, 7);
    }

    #[test]
    fn rejected_apply_update_leaves_snapshot_untouched() {
        let (graph, partition) = two_triangles();
        let mut snapshot = MetricsEngine::full_compute(&graph, &partition).expect("compute");
        let before = snapshot.clone();
        let (a, d) = (id(&graph, "A"), id(&graph, "D"));

        let result = MetricsEngine::apply_update(&graph, &partition, &mut snapshot, EdgeOp::Remove(a, d));
        assert!(matches!(result, Err(EchoError::InvalidOperation(_))));
        assert_eq!(snapshot, before);
    }

    #[test]
    fn running_sums_track_per_community_counts() {
        let mut tallies = CommunityTallies::with_communities(3);
        let (c0, c1, c2) = (CommunityId(0), CommunityId(1), CommunityId(2));
        for (cu, cv) in [(c0, c0), (c0, c1), (c1, c2), (c2, c2), (c0, c0)] {
            tallies.record_add(cu, cv).expect("add");
        }
        tallies.record_remove(c0, c1).expect("remove");
        tallies.record_remove(c0, c0).expect("remove");

        let mut recounted = tallies.clone();
        recounted.refresh_totals();
        assert_eq!(tallies, recounted);
        assert_eq!(tallies.internal_edges(c0), 1);
        assert_eq!(tallies.degree_sum(c2), 3);
    }

    #[test]
    fn out_of_range_community_leaves_tallies_untouched() {
        let mut tallies = CommunityTallies::with_communities(2);
        let result = tallies.record_add(CommunityId(0), CommunityId(7));
        assert!(matches!(result, Err(EchoError::InvalidOperation(_))));
        assert_eq!(tallies, CommunityTallies::with_communities(2));
    }

    #[test]
    fn tally_underflow_leaves_tallies_untouched() {
        let mut tallies = CommunityTallies::with_communities(2);
        let result = tallies.record_remove(CommunityId(0), CommunityId(1));
        assert!(matches!(result, Err(EchoError::InvalidOperation(_))));
        assert_eq!(tallies, CommunityTallies::with_communities(2));
    }
}
