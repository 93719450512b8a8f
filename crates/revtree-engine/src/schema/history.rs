//! History timeline and checkpoint view types.
//!
//! These are what a history panel renders: a linear timeline through the
//! branching tree, the pointer's position in it, and named checkpoints.

use serde::Serialize;

use revtree_core::{ActionType, HistoryNode, HistoryNodeId, Metadata, Timestamp};

/// A single entry in the rendered timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryNodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<HistoryNodeId>,
    pub action: ActionType,
    pub metadata: Metadata,
    pub timestamp: Timestamp,
    /// Branches leaving this entry. More than one means abandoned futures exist.
    pub branch_count: usize,
    /// Checkpoint name attached to this entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub is_current: bool,
}

impl HistoryEntry {
    pub fn from_node(node: &HistoryNode, current: HistoryNodeId) -> Self {
        HistoryEntry {
            id: node.id,
            parent_id: node.parent_id,
            action: node.action.clone(),
            metadata: node.metadata.clone(),
            timestamp: node.timestamp,
            branch_count: node.branch_count(),
            label: node.label.clone(),
            is_current: node.id == current,
        }
    }
}

/// The timeline published after every change to the path or pointer.
///
/// `entries` runs from the root to the current node, which is always the
/// last entry. `ahead` is the preferred redo chain beyond it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub entries: Vec<HistoryEntry>,
    pub current_index: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Nodes redo would visit, nearest first.
    pub ahead: Vec<HistoryEntry>,
}

impl HistoryView {
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.current_index)
    }

    /// Path entry ids, root first.
    pub fn ids(&self) -> Vec<HistoryNodeId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Path entries followed by the redo chain.
    pub fn timeline(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().chain(self.ahead.iter())
    }
}

/// A view of a named checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub node: HistoryNodeId,
    /// When the checkpoint was created.
    pub timestamp: Timestamp,
}
