//! # Graph Store
//!
//! The mutable undirected graph owned by one simulation session.
//!
//! This module implements the `GraphStore` trait. Node ids are dense and
//! adjacency sets are `BTreeSet`s, so neighbour and edge iteration order is
//! identical on every run.

use crate::primitives::{MAX_EDGE_LIST_LEN, MAX_LABEL_LENGTH};
use crate::{EchoError, Edge, NodeId, NodeLabel};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The capability set the rest of the engine needs from a graph.
///
/// Node ids are dense: a store with `node_count() == n` contains exactly the
/// ids `0..n`. Nodes are fixed after load; only edges mutate.
pub trait GraphStore {
    /// Insert the undirected edge `(u, v)`.
    /// Returns `false` without changing anything if the edge already exists.
    fn add_edge(&mut self, u: NodeId, v: NodeId) -> Result<bool, EchoError>;

    /// Delete the undirected edge `(u, v)`.
    /// Returns `false` if the edge did not exist.
    fn remove_edge(&mut self, u: NodeId, v: NodeId) -> Result<bool, EchoError>;

    /// Check whether the undirected edge `(u, v)` exists.
    fn has_edge(&self, u: NodeId, v: NodeId) -> bool;

    /// Check whether a node exists.
    fn contains_node(&self, id: NodeId) -> bool;

    /// Number of edges incident to `node`.
    fn degree(&self, node: NodeId) -> Result<usize, EchoError>;

    /// Neighbours of `node` in ascending id order.
    fn neighbors(&self, node: NodeId) -> Result<Vec<NodeId>, EchoError>;

    /// Get the total number of nodes.
    fn node_count(&self) -> usize;

    /// Get the total number of edges.
    fn edge_count(&self) -> usize;

    /// All edges in canonical ascending order.
    fn edges(&self) -> impl Iterator<Item = Edge> + '_;

    /// All node ids in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_count() as u64).map(NodeId)
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// Adjacency-set graph keyed by dense node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// NodeId -> label
    labels: Vec<NodeLabel>,

    /// Reverse lookup: label -> NodeId
    label_index: BTreeMap<NodeLabel, NodeId>,

    /// NodeId -> neighbour set (both directions stored)
    adjacency: Vec<BTreeSet<NodeId>>,

    edge_count: usize,
}

impl Graph {
    /// Build a graph from `(label, label)` pairs.
    ///
    /// Labels are trimmed and interned in order of first appearance.
    /// Duplicate edges (in either orientation) collapse to one.
    ///
    /// # Errors
    /// - `MalformedInput` for an empty or oversized label, or a self-loop
    /// - `MalformedInput` if the list exceeds `MAX_EDGE_LIST_LEN` pairs
    /// - `EmptyGraph` if no nodes result
    pub fn load<I, A, B>(pairs: I) -> Result<Self, EchoError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut graph = Self::default();

        for (index, (raw_u, raw_v)) in pairs.into_iter().enumerate() {
            let line = index.saturating_add(1);
            let malformed = || EchoError::MalformedInput {
                line,
                content: format!("{} {}", raw_u.as_ref(), raw_v.as_ref()),
            };

            if index >= MAX_EDGE_LIST_LEN {
                return Err(EchoError::MalformedInput {
                    line,
                    content: format!("edge list exceeds {} pairs", MAX_EDGE_LIST_LEN),
                });
            }

            let u = raw_u.as_ref().trim();
            let v = raw_v.as_ref().trim();
            if !is_valid_label(u) || !is_valid_label(v) || u == v {
                return Err(malformed());
            }

            let u = graph.intern(u);
            let v = graph.intern(v);
            graph.link(u, v);
        }

        if graph.labels.is_empty() {
            return Err(EchoError::EmptyGraph);
        }

        tracing::debug!(
            nodes = graph.labels.len(),
            edges = graph.edge_count,
            "graph loaded"
        );
        Ok(graph)
    }

    /// Build an edgeless graph over the given labels.
    ///
    /// Repeated labels are interned once.
    pub fn with_nodes<I, S>(labels: I) -> Result<Self, EchoError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut graph = Self::default();
        for (index, raw) in labels.into_iter().enumerate() {
            let label = raw.as_ref().trim();
            if !is_valid_label(label) {
                return Err(EchoError::MalformedInput {
                    line: index.saturating_add(1),
                    content: raw.as_ref().to_string(),
                });
            }
            graph.intern(label);
        }
        Ok(graph)
    }

    /// Resolve a label to its node id.
    #[must_use]
    pub fn node_id(&self, label: &str) -> Option<NodeId> {
        self.label_index.get(label.trim()).copied()
    }

    /// Resolve a label, failing with `InvalidNode` when unknown.
    pub fn require_node(&self, label: &str) -> Result<NodeId, EchoError> {
        self.node_id(label)
            .ok_or_else(|| EchoError::InvalidNode(label.to_string()))
    }

    /// Get the label of a node.
    #[must_use]
    pub fn label(&self, id: NodeId) -> Option<&NodeLabel> {
        self.labels.get(id.index())
    }

    /// All labels in node id order.
    pub fn labels(&self) -> impl Iterator<Item = &NodeLabel> {
        self.labels.iter()
    }

    /// Labels of both endpoints of an edge, smaller id first.
    #[must_use]
    pub fn edge_labels(&self, edge: Edge) -> Option<(&NodeLabel, &NodeLabel)> {
        Some((self.label(edge.lo())?, self.label(edge.hi())?))
    }

    fn intern(&mut self, label: &str) -> NodeId {
        if let Some(&id) = self.label_index.get(label) {
            return id;
        }
        let id = NodeId(self.labels.len() as u64);
        let label = NodeLabel::new(label);
        self.labels.push(label.clone());
        self.label_index.insert(label, id);
        self.adjacency.push(BTreeSet::new());
        id
    }

    /// Insert without validation. Both ids must exist and differ.
    fn link(&mut self, u: NodeId, v: NodeId) -> bool {
        let inserted = self
            .adjacency
            .get_mut(u.index())
            .is_some_and(|set| set.insert(v));
        if inserted {
            if let Some(set) = self.adjacency.get_mut(v.index()) {
                set.insert(u);
            }
            self.edge_count = self.edge_count.saturating_add(1);
        }
        inserted
    }

    fn check_pair(&self, u: NodeId, v: NodeId) -> Result<(), EchoError> {
        for id in [u, v] {
            if !self.contains_node(id) {
                return Err(EchoError::InvalidNode(format!("#{}", id.0)));
            }
        }
        if u == v {
            let name = self
                .label(u)
                .map_or_else(|| format!("#{}", u.0), |l| l.to_string());
            return Err(EchoError::SelfLoop(name));
        }
        Ok(())
    }

    fn adjacent(&self, node: NodeId) -> Result<&BTreeSet<NodeId>, EchoError> {
        self.adjacency
            .get(node.index())
            .ok_or_else(|| EchoError::InvalidNode(format!("#{}", node.0)))
    }
}

/// A label is usable if it is non-empty and within the length limit.
fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.len() <= MAX_LABEL_LENGTH
}

impl GraphStore for Graph {
    fn add_edge(&mut self, u: NodeId, v: NodeId) -> Result<bool, EchoError> {
        self.check_pair(u, v)?;
        Ok(self.link(u, v))
    }

    fn remove_edge(&mut self, u: NodeId, v: NodeId) -> Result<bool, EchoError> {
        self.check_pair(u, v)?;
        let removed = self
            .adjacency
            .get_mut(u.index())
            .is_some_and(|set| set.remove(&v));
        if removed {
            if let Some(set) = self.adjacency.get_mut(v.index()) {
                set.remove(&u);
            }
            self.edge_count = self.edge_count.saturating_sub(1);
        }
        Ok(removed)
    }

    fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.adjacency
            .get(u.index())
            .is_some_and(|set| set.contains(&v))
    }

    fn contains_node(&self, id: NodeId) -> bool {
        id.index() < self.labels.len()
    }

    fn degree(&self, node: NodeId) -> Result<usize, EchoError> {
        Ok(self.adjacent(node)?.len())
    }

    fn neighbors(&self, node: NodeId) -> Result<Vec<NodeId>, EchoError> {
        Ok(self.adjacent(node)?.iter().copied().collect())
    }

    fn node_count(&self) -> usize {
        self.labels.len()
    }

    fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(index, set)| {
            let lo = NodeId(index as u64);
            set.range(NodeId(lo.0.saturating_add(1))..)
                .map(move |&hi| Edge::new(lo, hi))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph::load([("a", "b"), ("b", "c"), ("c", "a")]).expect("load")
    }

    #[test]
    fn load_interns_in_first_appearance_order() {
        let graph = Graph::load([("x", "y"), ("z", "x")]).expect("load");
        assert_eq!(graph.node_id("x"), Some(NodeId(0)));
        assert_eq!(graph.node_id("y"), Some(NodeId(1)));
        assert_eq!(graph.node_id("z"), Some(NodeId(2)));
        assert_eq!(graph.label(NodeId(2)).map(NodeLabel::as_str), Some("z"));
    }

    #[test]
    fn load_deduplicates_both_orientations() {
        let graph = Graph::load([("a", "b"), ("b", "a"), ("a", "b")]).expect("load");
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn load_rejects_self_loop() {
        let result = Graph::load([("a", "b"), ("c", "c")]);
        assert!(matches!(
            result,
            Err(EchoError::MalformedInput { line: 2, .. })
        ));
    }

    #[test]
    fn load_rejects_empty_label() {
        let result = Graph::load([("a", "  ")]);
        assert!(matches!(
            result,
            Err(EchoError::MalformedInput { line: 1, .. })
        ));
    }

    #[test]
    fn load_rejects_oversized_label() {
        let long = "n".repeat(MAX_LABEL_LENGTH + 1);
        let result = Graph::load([("a", long.as_str())]);
        assert!(matches!(result, Err(EchoError::MalformedInput { .. })));
    }

    #[test]
    fn load_empty_list_is_empty_graph() {
        let pairs: Vec<(String, String)> = Vec::new();
        assert_eq!(Graph::load(pairs), Err(EchoError::EmptyGraph));
    }

    #[test]
    fn add_edge_reports_noop() {
        let mut graph = triangle();
        let a = graph.require_node("a").expect("a");
        let b = graph.require_node("b").expect("b");
        assert!(!graph.add_edge(a, b).expect("add"));
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn add_and_remove_edge_are_symmetric() {
        let mut graph = Graph::load([("a", "b"), ("c", "d")]).expect("load");
        let a = graph.require_node("a").expect("a");
        let d = graph.require_node("d").expect("d");

        assert!(graph.add_edge(d, a).expect("add"));
        assert!(graph.has_edge(a, d));
        assert!(graph.has_edge(d, a));
        assert_eq!(graph.degree(a).expect("degree"), 2);

        assert!(graph.remove_edge(a, d).expect("remove"));
        assert!(!graph.has_edge(d, a));
        assert!(!graph.remove_edge(a, d).expect("remove again"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn add_edge_unknown_node_rejected() {
        let mut graph = triangle();
        let a = graph.require_node("a").expect("a");
        let result = graph.add_edge(a, NodeId(99));
        assert!(matches!(result, Err(EchoError::InvalidNode(_))));
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn add_edge_self_loop_rejected() {
        let mut graph = triangle();
        let a = graph.require_node("a").expect("a");
        assert_eq!(
            graph.add_edge(a, a),
            Err(EchoError::SelfLoop("a".to_string()))
        );
    }

    #[test]
    fn require_node_unknown_label() {
        let graph = triangle();
        assert_eq!(
            graph.require_node("zed"),
            Err(EchoError::InvalidNode("zed".to_string()))
        );
    }

    #[test]
    fn neighbors_are_sorted() {
        let graph = Graph::load([("hub", "c"), ("hub", "a"), ("hub", "b")]).expect("load");
        let hub = graph.require_node("hub").expect("hub");
        let names: Vec<_> = graph
            .neighbors(hub)
            .expect("neighbors")
            .into_iter()
            .filter_map(|n| graph.label(n).map(|l| l.to_string()))
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn edges_iterate_each_edge_once() {
        let graph = triangle();
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().all(|e| e.lo() < e.hi()));
    }

    #[test]
    fn with_nodes_builds_edgeless_graph() {
        let graph = Graph::with_nodes(["p", "q", "p"]).expect("nodes");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_ids().count(), 2);
    }
}
