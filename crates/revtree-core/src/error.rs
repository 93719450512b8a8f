//! Core error types for revtree-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the history tree and its configuration.

use crate::id::HistoryNodeId;
use thiserror::Error;

/// Core errors produced by the revtree-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A history node id was not found in the tree.
    #[error("history node not found: {id}")]
    NodeNotFound { id: HistoryNodeId },

    /// The requested child is not a child of the given parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        parent: HistoryNodeId,
        child: HistoryNodeId,
    },

    /// Only leaf nodes may have their snapshot swapped.
    #[error("node {id} has children and cannot be amended")]
    NotALeaf { id: HistoryNodeId },

    /// A tree invariant was violated.
    #[error("history invariant violated: {reason}")]
    InvariantViolation { reason: String },

    /// A configuration value is out of range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Configuration could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
