//! Compaction planning.
//!
//! Once the tree outgrows `max_history_size`, the planner picks what to
//! keep:
//!
//! 1. The newest `max_history_size` nodes of the live path ending at the
//!    current node. The oldest survivor becomes the new root and keeps its
//!    own full snapshot as the baseline for everything before it.
//! 2. Up to `lookahead` nodes of the preferred redo chain ahead of current.
//! 3. Whole inactive branches hanging off that spine, newest first, while
//!    they fit in what is left of the budget.
//!
//! Everything else is discarded. The result holds at most
//! `max_history_size + lookahead` nodes.

use std::collections::HashSet;

use revtree_core::{CoreError, HistoryGraph, HistoryNodeId};

/// What survives a compaction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionPlan {
    pub new_root: HistoryNodeId,
    pub keep: HashSet<HistoryNodeId>,
}

/// Plans a compaction, or returns `None` when nothing needs to go.
pub fn plan(
    graph: &HistoryGraph,
    current: HistoryNodeId,
    max_history_size: usize,
    lookahead: usize,
) -> Result<Option<CompactionPlan>, CoreError> {
    if graph.len() <= max_history_size {
        return Ok(None);
    }

    let path = graph.path_ids(current)?;
    let start = path.len().saturating_sub(max_history_size.max(1));
    let spine_back = &path[start..];
    let new_root = spine_back[0];
    let ahead = graph.preferred_chain(current, lookahead)?;

    let mut keep: HashSet<HistoryNodeId> = spine_back.iter().copied().collect();
    keep.extend(ahead.iter().copied());
    let mut budget = max_history_size.saturating_sub(spine_back.len());

    let mut branches = Vec::new();
    for &node in spine_back.iter().chain(ahead.iter()) {
        for &child in graph.children(node)? {
            if !keep.contains(&child) {
                branches.push((graph.get(child)?.seq, child));
            }
        }
    }
    branches.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, branch) in branches {
        if budget == 0 {
            break;
        }
        let subtree = graph.subtree_ids(branch)?;
        if subtree.len() <= budget {
            budget -= subtree.len();
            keep.extend(subtree);
        }
    }

    if keep.len() == graph.len() {
        return Ok(None);
    }
    Ok(Some(CompactionPlan { new_root, keep }))
}
