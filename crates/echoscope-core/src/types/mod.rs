//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the echoscope engine:
//! - Node identifiers and labels (`NodeId`, `NodeLabel`)
//! - Undirected edges and edge operations (`Edge`, `EdgeOp`, `EdgeOutcome`)
//! - Community identifiers (`CommunityId`)
//! - Error types (`EchoError`)
//!
//! ## Ordering Guarantees
//!
//! Every identifier implements `Ord` so graph and partition state can live in
//! `BTreeMap`/`BTreeSet` and iterate in the same order on every run.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE IDENTIFIERS
// =============================================================================

/// Dense internal identifier for a node.
///
/// Assigned at load time in order of first appearance in the edge list,
/// starting from 0. Never reassigned while a graph lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Position of this node in dense per-node vectors.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// External label of a node, exactly as it appeared in the edge list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeLabel(pub String);

impl NodeLabel {
    /// Create a new label from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeLabel {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// COMMUNITY IDENTIFIER
// =============================================================================

/// Identifier of a detected community.
///
/// Communities are numbered densely from 0 after detection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct CommunityId(pub u32);

impl CommunityId {
    /// Position of this community in dense per-community vectors.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// An undirected edge, stored canonically with `lo < hi`.
///
/// Two edges built from the same endpoints in either order compare equal.
/// The fields are private so every `Edge` in circulation is canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    lo: NodeId,
    hi: NodeId,
}

impl Edge {
    /// Build the canonical edge between `u` and `v`.
    #[must_use]
    pub fn new(u: NodeId, v: NodeId) -> Self {
        if u <= v {
            Self { lo: u, hi: v }
        } else {
            Self { lo: v, hi: u }
        }
    }

    /// Both endpoints, smaller id first.
    #[must_use]
    pub const fn endpoints(self) -> (NodeId, NodeId) {
        (self.lo, self.hi)
    }

    /// The endpoint with the smaller id.
    #[must_use]
    pub const fn lo(self) -> NodeId {
        self.lo
    }

    /// The endpoint with the larger id.
    #[must_use]
    pub const fn hi(self) -> NodeId {
        self.hi
    }

    #[must_use]
    pub fn is_self_loop(self) -> bool {
        self.lo == self.hi
    }
}

// =============================================================================
// EDGE OPERATIONS
// =============================================================================

/// A single mutation issued by the simulation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeOp {
    /// Insert the edge `(u, v)`.
    Add(NodeId, NodeId),
    /// Delete the edge `(u, v)`.
    Remove(NodeId, NodeId),
}

impl EdgeOp {
    /// The canonical edge this operation touches.
    #[must_use]
    pub fn edge(self) -> Edge {
        match self {
            Self::Add(u, v) | Self::Remove(u, v) => Edge::new(u, v),
        }
    }

    #[must_use]
    pub fn is_add(self) -> bool {
        matches!(self, Self::Add(..))
    }
}

/// What an add/remove request actually did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOutcome {
    /// The graph changed and metrics were updated.
    Applied,
    /// Add request for an edge that already existed. Nothing changed.
    AlreadyPresent,
    /// Remove request for an edge that did not exist. Nothing changed.
    Absent,
}

impl EdgeOutcome {
    /// Whether the request changed the graph.
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the echoscope engine.
///
/// - No silent failures
/// - Use `Result<T, EchoError>` for fallible operations
/// - A failed operation leaves session state exactly as it was
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EchoError {
    /// An edge-list line (or pair) could not be turned into an edge.
    #[error("Malformed input on line {line}: {content:?}")]
    MalformedInput {
        /// 1-based line (or pair) number.
        line: usize,
        /// The offending text.
        content: String,
    },

    /// The edge list produced no nodes.
    #[error("Edge list contains no edges")]
    EmptyGraph,

    /// An edge operation referenced a node that is not in the loaded graph.
    #[error("Unknown node: {0}")]
    InvalidNode(String),

    /// An edge operation named the same node twice.
    #[error("Self-loops are not allowed: {0}")]
    SelfLoop(String),

    /// Graph and partition disagree. Not reachable under correct sequencing.
    #[error("Inconsistent engine state: {0}")]
    InvalidOperation(String),

    /// An operation that requires a loaded graph was called before `load`.
    #[error("No graph loaded")]
    NotLoaded,

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================
