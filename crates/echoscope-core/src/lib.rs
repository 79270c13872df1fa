//! # echoscope-core
//!
//! The deterministic analysis engine for Echoscope.
//!
//! Loads an undirected social graph, detects echo chambers with Louvain
//! community detection, and measures how polarized the graph is: modularity
//! of the detected partition, community assortativity, and the set of bridge
//! edges that cross between communities.
//!
//! ## Sticky Partition
//!
//! Communities are detected once per load. Edge additions and removals after
//! that update the metrics incrementally against the SAME partition, so a
//! "what if" simulation shows how cross-community contact shifts polarization
//! without the communities themselves being re-drawn.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: NO async, NO network, NO file I/O
//! - Deterministic: identical input always yields identical output
//! - Incremental and full metric computation agree exactly

// =============================================================================
// MODULES
// =============================================================================

pub mod graph;
pub mod ingestor;
pub mod metrics;
pub mod partition;
pub mod primitives;
pub mod report;
pub mod simulation;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CommunityId, EchoError, Edge, EdgeOp, EdgeOutcome, NodeId, NodeLabel};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use graph::{Graph, GraphStore};
pub use ingestor::Ingestor;
pub use metrics::{CommunityTallies, MetricsEngine, MetricsSnapshot, MetricsSummary};
pub use partition::{LouvainConfig, Partition, Partitioner};
pub use report::{AnalysisReport, BridgeRow, CommunitySummary};
pub use simulation::{EdgeUpdate, LoadedState, SimulationController, SimulationState};
