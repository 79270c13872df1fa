//! # Partitioner
//!
//! One-shot community detection with the Louvain heuristic.
//!
//! The resulting [`Partition`] is immutable: it has no mutating methods and
//! can only be produced here, which is what keeps community assignments
//! sticky across edge mutations.
//!
//! ## Algorithm
//!
//! 1. **Local moves**: visit nodes in ascending id order and move each into
//!    the neighbouring community with the largest modularity gain. Sweep
//!    until nothing moves or `max_passes` is hit.
//! 2. **Aggregation**: contract every community into a weighted super-node
//!    (internal weight becomes a self-loop) and repeat from step 1.
//! 3. Stop when a level moves nothing or `max_levels` is hit.
//!
//! Candidate communities are scanned in ascending id order and a move needs a
//! strictly larger gain, so ties always resolve to the lowest community id.

use crate::graph::GraphStore;
use crate::primitives::{DEFAULT_MAX_LEVELS, DEFAULT_MAX_PASSES, DEFAULT_MIN_GAIN};
use crate::{CommunityId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tuning knobs for Louvain detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LouvainConfig {
    /// Maximum local-move sweeps per aggregation level.
    pub max_passes: usize,
    /// Maximum number of aggregation levels.
    pub max_levels: usize,
    /// Gain a move must exceed to be taken.
    pub min_gain: f64,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            max_levels: DEFAULT_MAX_LEVELS,
            min_gain: DEFAULT_MIN_GAIN,
        }
    }
}

// =============================================================================
// PARTITION
// =============================================================================

/// Frozen node → community assignment.
///
/// Total over the node set of the graph it was detected on. Only
/// [`Partitioner::detect`] builds one; there are no mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// NodeId -> CommunityId
    assignment: Vec<CommunityId>,
    community_count: usize,
}

impl Partition {
    /// Renumber raw labels densely in order of first appearance.
    fn from_raw(raw: &[usize]) -> Self {
        let mut remap: BTreeMap<usize, CommunityId> = BTreeMap::new();
        let mut assignment = Vec::with_capacity(raw.len());
        for &label in raw {
            let next = CommunityId(remap.len() as u32);
            let id = *remap.entry(label).or_insert(next);
            assignment.push(id);
        }
        Self {
            assignment,
            community_count: remap.len(),
        }
    }

    /// Every node in its own community.
    fn singletons(node_count: usize) -> Self {
        Self {
            assignment: (0..node_count as u32).map(CommunityId).collect(),
            community_count: node_count,
        }
    }

    /// Community of `node`, or `None` if the node is outside the partition.
    #[must_use]
    pub fn community_of(&self, node: NodeId) -> Option<CommunityId> {
        self.assignment.get(node.index()).copied()
    }

    /// Number of nodes covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Number of distinct communities.
    #[must_use]
    pub fn community_count(&self) -> usize {
        self.community_count
    }

    /// `(node, community)` pairs in node id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, CommunityId)> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .map(|(index, &c)| (NodeId(index as u64), c))
    }

    /// Members of `community` in node id order.
    #[must_use]
    pub fn members(&self, community: CommunityId) -> Vec<NodeId> {
        self.iter()
            .filter(|&(_, c)| c == community)
            .map(|(node, _)| node)
            .collect()
    }

    /// Member count per community, indexed by community id.
    #[must_use]
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.community_count];
        for c in &self.assignment {
            if let Some(size) = sizes.get_mut(c.index()) {
                *size = size.saturating_add(1);
            }
        }
        sizes
    }
}

// =============================================================================
// PARTITIONER
// =============================================================================

/// Louvain community detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Partitioner {
    config: LouvainConfig,
}

impl Partitioner {
    /// Create a partitioner with the given configuration.
    #[must_use]
    pub fn new(config: LouvainConfig) -> Self {
        Self { config }
    }

    /// Get the active configuration.
    #[must_use]
    pub fn config(&self) -> &LouvainConfig {
        &self.config
    }

    /// Detect communities on `graph`.
    ///
    /// A graph without edges yields one singleton community per node.
    pub fn detect<G: GraphStore>(&self, graph: &G) -> Partition {
        let node_count = graph.node_count();
        if graph.edge_count() == 0 {
            tracing::debug!(nodes = node_count, "no edges, singleton partition");
            return Partition::singletons(node_count);
        }

        let mut level = LevelGraph::from_store(graph);
        // original node -> super-node at the current level
        let mut membership: Vec<usize> = (0..node_count).collect();

        for depth in 0..self.config.max_levels {
            let (community, moved) = level.local_moves(&self.config);
            if !moved {
                break;
            }

            let (dense, count) = renumber(&community);
            for slot in &mut membership {
                *slot = dense.get(*slot).copied().unwrap_or(*slot);
            }
            level = level.contract(&dense, count);
            tracing::debug!(level = depth, communities = count, "louvain level complete");
        }

        let partition = Partition::from_raw(&membership);
        tracing::debug!(
            nodes = node_count,
            communities = partition.community_count(),
            "communities detected"
        );
        partition
    }
}

/// Map arbitrary labels onto `0..count` in order of first appearance.
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut remap: BTreeMap<usize, usize> = BTreeMap::new();
    let dense = labels
        .iter()
        .map(|&label| {
            let next = remap.len();
            *remap.entry(label).or_insert(next)
        })
        .collect();
    (dense, remap.len())
}

// =============================================================================
// LEVEL GRAPH (weighted, possibly with self-loops)
// =============================================================================

/// Weighted undirected graph for one Louvain level.
#[derive(Debug, Clone)]
struct LevelGraph {
    /// Neighbour weights, self-loops excluded. Keys ascend.
    adjacency: Vec<BTreeMap<usize, f64>>,
    /// Self-loop weight per node.
    self_loops: Vec<f64>,
    /// Weighted degree: neighbour weights plus twice the self-loop.
    strengths: Vec<f64>,
    /// Sum of all edge weights, self-loops counted once.
    total_weight: f64,
}

impl LevelGraph {
    fn from_store<G: GraphStore>(graph: &G) -> Self {
        let n = graph.node_count();
        let mut adjacency = vec![BTreeMap::new(); n];
        let mut strengths = vec![0.0; n];
        for edge in graph.edges() {
            let (u, v) = (edge.lo().index(), edge.hi().index());
            if let Some(row) = adjacency.get_mut(u) {
                row.insert(v, 1.0);
            }
            if let Some(row) = adjacency.get_mut(v) {
                row.insert(u, 1.0);
            }
            for k in [u, v] {
                if let Some(s) = strengths.get_mut(k) {
                    *s += 1.0;
                }
            }
        }
        Self {
            adjacency,
            self_loops: vec![0.0; n],
            strengths,
            total_weight: graph.edge_count() as f64,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Run local-move sweeps. Returns each node's community (a node index)
    /// and whether any node moved.
    fn local_moves(&self, config: &LouvainConfig) -> (Vec<usize>, bool) {
        let n = self.len();
        let mut community: Vec<usize> = (0..n).collect();
        // community total strength, indexed by community label
        let mut totals = self.strengths.clone();
        let m2 = 2.0 * self.total_weight;
        let mut moved_any = false;

        for _ in 0..config.max_passes {
            let mut moved = false;

            for node in 0..n {
                let current = community[node];
                let ki = self.strengths[node];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&neighbor, &w) in &self.adjacency[node] {
                    *links.entry(community[neighbor]).or_default() += w;
                }

                let w_current = links.get(&current).copied().unwrap_or(0.0);
                let remove_cost = w_current / m2 - ki * (totals[current] - ki) / (m2 * m2);

                let mut best = current;
                let mut best_gain = config.min_gain;
                for (&target, &w_target) in &links {
                    if target == current {
                        continue;
                    }
                    let insert_gain = w_target / m2 - ki * totals[target] / (m2 * m2);
                    let gain = insert_gain - remove_cost;
                    if gain > best_gain {
                        best_gain = gain;
                        best = target;
                    }
                }

                if best != current {
                    totals[current] -= ki;
                    totals[best] += ki;
                    community[node] = best;
                    moved = true;
                }
            }

            if !moved {
                break;
            }
            moved_any = true;
        }

        (community, moved_any)
    }

    /// Collapse each community into one node. `dense` maps node -> community
    /// in `0..count`.
    fn contract(&self, dense: &[usize], count: usize) -> Self {
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];
        let mut strengths = vec![0.0; count];

        for (node, &c) in dense.iter().enumerate() {
            self_loops[c] += self.self_loops[node];
            strengths[c] += self.strengths[node];

            for (&neighbor, &w) in &self.adjacency[node] {
                if neighbor < node {
                    continue;
                }
                let d = dense[neighbor];
                if c == d {
                    self_loops[c] += w;
                } else {
                    *adjacency[c].entry(d).or_default() += w;
                    *adjacency[d].entry(c).or_default() += w;
                }
            }
        }

        Self {
            adjacency,
            self_loops,
            strengths,
            total_weight: self.total_weight,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
