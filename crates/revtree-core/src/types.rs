//! Host payload types that the engine stores but never interprets.
//!
//! [`GraphState`] is the editor's full node/edge state. Both element lists
//! hold arbitrary JSON values so that no host node or edge schema leaks
//! into the history engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form action description attached to a history node.
pub type Metadata = serde_json::Map<String, Value>;

/// Milliseconds since the session clock's epoch. Monotonic within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Milliseconds elapsed from `earlier` to `self`, saturating at zero.
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns this timestamp shifted forward by `ms`.
    pub fn plus_ms(self, ms: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Full editor graph state: the nodes and edges arrays as the host sees them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphState {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
}

impl GraphState {
    pub fn new(nodes: Vec<Value>, edges: Vec<Value>) -> Self {
        GraphState { nodes, edges }
    }

    /// An empty graph.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
