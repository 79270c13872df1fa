//! # Simulation Controller
//!
//! Session state for the sticky-partition workflow.
//!
//! ```text
//! Unloaded --load--> Loaded --add_edge/remove_edge--> Loaded
//!                      ^                                 |
//!                      +------------- load --------------+
//! ```
//!
//! - `load` is the only path that runs the Partitioner
//! - Edge mutations update metrics incrementally against the frozen partition
//! - Every failed operation leaves the stored state exactly as it was
//!
//! A controller is owned by one caller (one per user session); there is no
//! process-wide instance.

use crate::graph::{Graph, GraphStore};
use crate::ingestor::Ingestor;
use crate::metrics::{MetricsEngine, MetricsSnapshot, MetricsSummary};
use crate::partition::{LouvainConfig, Partition, Partitioner};
use crate::report::AnalysisReport;
use crate::{CommunityId, EchoError, EdgeOp, EdgeOutcome, NodeLabel};
use std::collections::{BTreeMap, BTreeSet};

/// Tolerance used by [`SimulationController::verify`].
pub const VERIFY_TOLERANCE: f64 = 1e-9;

// =============================================================================
// STATE
// =============================================================================

/// Everything a loaded session holds.
#[derive(Debug, Clone)]
pub struct LoadedState {
    graph: Graph,
    partition: Partition,
    snapshot: MetricsSnapshot,
}

impl LoadedState {
    /// The current graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The frozen partition.
    #[must_use]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// The current metrics.
    #[must_use]
    pub fn snapshot(&self) -> &MetricsSnapshot {
        &self.snapshot
    }
}

/// Controller lifecycle.
#[derive(Debug, Clone, Default)]
pub enum SimulationState {
    /// No graph has been loaded yet.
    #[default]
    Unloaded,
    /// A graph, its partition and current metrics.
    Loaded(LoadedState),
}

/// Result of an add/remove request.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeUpdate {
    /// Whether the graph actually changed.
    pub outcome: EdgeOutcome,
    /// Metrics after the request (unchanged on a no-op). The bridge set
    /// itself stays in the session; see
    /// [`SimulationController::current_bridge_edges`].
    pub metrics: MetricsSummary,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Orchestrates load → detect → compute, then incremental edge simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulationController {
    partitioner: Partitioner,
    state: SimulationState,
}

impl SimulationController {
    /// Create an unloaded controller with default Louvain settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unloaded controller with custom Louvain settings.
    #[must_use]
    pub fn with_config(config: LouvainConfig) -> Self {
        Self {
            partitioner: Partitioner::new(config),
            state: SimulationState::Unloaded,
        }
    }

    /// Get the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SimulationState::Loaded(_))
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Load a graph from label pairs, detect communities and compute metrics.
    ///
    /// Replaces any previous session wholesale. On failure the previous
    /// state (loaded or not) is kept.
    pub fn load<I, A, B>(&mut self, pairs: I) -> Result<MetricsSnapshot, EchoError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let graph = Graph::load(pairs)?;
        self.install(graph)
    }

    /// Load a graph from edge-list text.
    pub fn load_text(&mut self, text: &str) -> Result<MetricsSnapshot, EchoError> {
        let graph = Ingestor::ingest(text)?;
        self.install(graph)
    }

    fn install(&mut self, graph: Graph) -> Result<MetricsSnapshot, EchoError> {
        let partition = self.partitioner.detect(&graph);
        let snapshot = MetricsEngine::full_compute(&graph, &partition)?;

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            communities = partition.community_count(),
            modularity = snapshot.modularity,
            polarization = snapshot.polarization,
            "graph loaded and analyzed"
        );

        self.state = SimulationState::Loaded(LoadedState {
            graph,
            partition,
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    // =========================================================================
    // EDGE SIMULATION
    // =========================================================================

    /// Add the edge `(u, v)` by label.
    ///
    /// Returns `EdgeOutcome::AlreadyPresent` with the unchanged snapshot if
    /// the edge already existed.
    pub fn add_edge(&mut self, u: &str, v: &str) -> Result<EdgeUpdate, EchoError> {
        self.apply(u, v, true)
    }

    /// Remove the edge `(u, v)` by label.
    ///
    /// Returns `EdgeOutcome::Absent` with the unchanged snapshot if the edge
    /// did not exist.
    pub fn remove_edge(&mut self, u: &str, v: &str) -> Result<EdgeUpdate, EchoError> {
        self.apply(u, v, false)
    }

    fn apply(&mut self, u: &str, v: &str, add: bool) -> Result<EdgeUpdate, EchoError> {
        let SimulationState::Loaded(state) = &mut self.state else {
            return Err(EchoError::NotLoaded);
        };

        let u_id = state.graph.require_node(u)?;
        let v_id = state.graph.require_node(v)?;
        if u_id == v_id {
            return Err(EchoError::SelfLoop(u.to_string()));
        }

        let op = if add {
            EdgeOp::Add(u_id, v_id)
        } else {
            EdgeOp::Remove(u_id, v_id)
        };

        let changed = if add {
            state.graph.add_edge(u_id, v_id)?
        } else {
            state.graph.remove_edge(u_id, v_id)?
        };

        if !changed {
            let outcome = if add {
                EdgeOutcome::AlreadyPresent
            } else {
                EdgeOutcome::Absent
            };
            tracing::debug!(source = u, target = v, ?outcome, "edge request was a no-op");
            return Ok(EdgeUpdate {
                outcome,
                metrics: state.snapshot.summary(),
            });
        }

        match MetricsEngine::apply_update(&state.graph, &state.partition, &mut state.snapshot, op) {
            Ok(()) => {
                let metrics = state.snapshot.summary();
                tracing::info!(
                    source = u,
                    target = v,
                    added = add,
                    modularity = metrics.modularity,
                    polarization = metrics.polarization,
                    bridges = metrics.bridge_count,
                    "edge applied"
                );
                Ok(EdgeUpdate {
                    outcome: EdgeOutcome::Applied,
                    metrics,
                })
            }
            Err(e) => {
                rollback(&mut state.graph, op);
                tracing::error!(source = u, target = v, error = %e, "metrics update failed, edge rolled back");
                Err(e)
            }
        }
    }

    // =========================================================================
    // READ ACCESSORS
    // =========================================================================

    /// The loaded session, if any.
    #[must_use]
    pub fn loaded(&self) -> Option<&LoadedState> {
        match &self.state {
            SimulationState::Loaded(state) => Some(state),
            SimulationState::Unloaded => None,
        }
    }

    /// The current graph.
    #[must_use]
    pub fn graph(&self) -> Option<&Graph> {
        self.loaded().map(LoadedState::graph)
    }

    /// The frozen partition.
    #[must_use]
    pub fn partition(&self) -> Option<&Partition> {
        self.loaded().map(LoadedState::partition)
    }

    /// The current metrics.
    #[must_use]
    pub fn snapshot(&self) -> Option<&MetricsSnapshot> {
        self.loaded().map(LoadedState::snapshot)
    }

    /// Label → community, for colouring nodes.
    #[must_use]
    pub fn current_partition(&self) -> Option<BTreeMap<NodeLabel, CommunityId>> {
        let state = self.loaded()?;
        Some(
            state
                .partition
                .iter()
                .filter_map(|(node, c)| state.graph.label(node).map(|l| (l.clone(), c)))
                .collect(),
        )
    }

    /// Bridge edges as label pairs (smaller node id first).
    #[must_use]
    pub fn current_bridge_edges(&self) -> Option<BTreeSet<(NodeLabel, NodeLabel)>> {
        let state = self.loaded()?;
        Some(
            state
                .snapshot
                .bridge_edges
                .iter()
                .filter_map(|&edge| {
                    state
                        .graph
                        .edge_labels(edge)
                        .map(|(u, v)| (u.clone(), v.clone()))
                })
                .collect(),
        )
    }

    /// Build the read-only report for rendering layers.
    #[must_use]
    pub fn report(&self) -> Option<AnalysisReport> {
        let state = self.loaded()?;
        Some(AnalysisReport::build(
            &state.graph,
            &state.partition,
            &state.snapshot,
        ))
    }

    /// Recompute metrics from scratch and compare with the maintained
    /// snapshot.
    pub fn verify(&self) -> Result<bool, EchoError> {
        let state = self.loaded().ok_or(EchoError::NotLoaded)?;
        let full = MetricsEngine::full_compute(&state.graph, &state.partition)?;
        let consistent = full.approx_eq(&state.snapshot, VERIFY_TOLERANCE);
        if !consistent {
            tracing::warn!("incremental metrics diverged from full recompute");
        }
        Ok(consistent)
    }
}

/// Undo a graph mutation whose metrics update failed.
fn rollback(graph: &mut Graph, op: EdgeOp) {
    let result = match op {
        EdgeOp::Add(u, v) => graph.remove_edge(u, v),
        EdgeOp::Remove(u, v) => graph.add_edge(u, v),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "rollback failed");
    }
}

// =============================================================================
// TESTS
// =============================================================================
