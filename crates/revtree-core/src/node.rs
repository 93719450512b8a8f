//! History node types.
//!
//! A [`HistoryNode`] pairs the action that produced it with a reference to
//! the full post-action graph snapshot. Parent/child links are mirrored here
//! so callers can read a node without touching the underlying petgraph.

use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::id::{HistoryNodeId, SnapshotRef};
use crate::types::{Metadata, Timestamp};

/// One entry in the branching history tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryNode {
    pub id: HistoryNodeId,
    /// `None` only for the root.
    pub parent_id: Option<HistoryNodeId>,
    /// Children in creation order.
    pub child_ids: Vec<HistoryNodeId>,
    /// The child `redo` follows. Always one of `child_ids` when any exist.
    pub preferred_child: Option<HistoryNodeId>,
    pub action: ActionType,
    pub metadata: Metadata,
    /// When the action started. For coalesced actions, the earliest event.
    pub timestamp: Timestamp,
    /// Graph state after the action was applied.
    pub snapshot: SnapshotRef,
    /// Tree-wide creation sequence number.
    pub seq: u64,
    /// Checkpoint name, if one points here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl HistoryNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_ids.is_empty()
    }

    /// Number of branches leaving this node.
    pub fn branch_count(&self) -> usize {
        self.child_ids.len()
    }
}
