//! Stable ID newtypes for history entities.
//!
//! [`HistoryNodeId`] is opaque (a UUID v4 minted at creation) so that ids from
//! a pruned or cleared tree can never alias a live node. [`SnapshotRef`] is a
//! plain counter handed out by the snapshot store.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a node in the history tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryNodeId(pub Uuid);

impl HistoryNodeId {
    /// Mints a fresh, never-before-seen id.
    pub fn new() -> Self {
        HistoryNodeId(Uuid::new_v4())
    }
}

impl Default for HistoryNodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference into a snapshot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotRef(pub u64);

// Display implementations -- just print the inner value.

impl fmt::Display for HistoryNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
