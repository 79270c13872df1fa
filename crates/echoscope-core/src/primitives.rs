//! # Engine Primitives
//!
//! Compiled-in limits and defaults for the echoscope engine.
//!
//! These bound every operation that scales with input size, so a single
//! upload cannot exhaust memory or spin Louvain indefinitely.

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a node label in bytes.
///
/// Longer labels are rejected as malformed input.
pub const MAX_LABEL_LENGTH: usize = 256;

/// Maximum number of edge pairs accepted by a single load.
pub const MAX_EDGE_LIST_LEN: usize = 1_000_000;

/// Characters that start a comment in an edge-list line.
pub const COMMENT_MARKER: char = '#';

// =============================================================================
// LOUVAIN DEFAULTS
// =============================================================================

/// Maximum local-move sweeps over all nodes within one aggregation level.
pub const DEFAULT_MAX_PASSES: usize = 100;

/// Maximum number of aggregation levels.
pub const DEFAULT_MAX_LEVELS: usize = 32;

/// Smallest modularity gain that justifies moving a node.
///
/// Gains at or below this value count as "no improvement", which also makes
/// near-equal candidates resolve to the lowest community id.
pub const DEFAULT_MIN_GAIN: f64 = 1e-12;

// =============================================================================
// METRIC TOLERANCES
// =============================================================================

/// Assortativity denominators at or below this magnitude are treated as zero.
pub const DEGENERATE_DENOMINATOR: f64 = 1e-12;
