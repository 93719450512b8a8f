//! HistoryGraph: the branching tree of history nodes.
//!
//! [`HistoryGraph`] is the single entry point for growing, navigating and
//! pruning the history tree. Nodes live in a petgraph `StableGraph` with one
//! parent -> child edge per link; an id index maps opaque
//! [`HistoryNodeId`]s to graph indices so that slot reuse after pruning can
//! never make an old id resolve to a new node.
//!
//! # Invariants
//!
//! - Exactly one root; every other node has exactly one existing parent.
//! - The structure is acyclic and connected.
//! - Every node with children has a `preferred_child` among them.
//!
//! All mutations go through `HistoryGraph` methods to keep the node-level
//! links and the petgraph edges in agreement. [`HistoryGraph::check_invariants`]
//! verifies all of the above.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::Dfs;
use petgraph::{Directed, Direction};

use crate::action::ActionType;
use crate::config::BranchPolicy;
use crate::error::CoreError;
use crate::id::{HistoryNodeId, SnapshotRef};
use crate::node::HistoryNode;
use crate::types::{Metadata, Timestamp};

/// The branching history tree.
#[derive(Debug, Clone)]
pub struct HistoryGraph {
    tree: StableGraph<HistoryNode, (), Directed, u32>,
    index: HashMap<HistoryNodeId, NodeIndex<u32>>,
    root: HistoryNodeId,
    next_seq: u64,
    policy: BranchPolicy,
}

impl HistoryGraph {
    /// Creates a tree holding only a root node.
    pub fn new(
        action: ActionType,
        metadata: Metadata,
        snapshot: SnapshotRef,
        timestamp: Timestamp,
        policy: BranchPolicy,
    ) -> Self {
        let root = HistoryNodeId::new();
        let mut tree = StableGraph::new();
        let idx = tree.add_node(HistoryNode {
            id: root,
            parent_id: None,
            child_ids: Vec::new(),
            preferred_child: None,
            action,
            metadata,
            timestamp,
            snapshot,
            seq: 0,
            label: None,
        });
        let mut index = HashMap::new();
        index.insert(root, idx);

        HistoryGraph {
            tree,
            index,
            root,
            next_seq: 1,
            policy,
        }
    }

    pub fn root_id(&self) -> HistoryNodeId {
        self.root
    }

    pub fn policy(&self) -> BranchPolicy {
        self.policy
    }

    /// Changes how future navigation updates preferred children.
    /// Existing preferences are left as they are.
    pub fn set_policy(&mut self, policy: BranchPolicy) {
        self.policy = policy;
    }

    /// Number of retained nodes, root included.
    pub fn len(&self) -> usize {
        self.tree.node_count()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.tree.node_count() == 0
    }

    pub fn contains(&self, id: HistoryNodeId) -> bool {
        self.index.contains_key(&id)
    }

    fn index_of(&self, id: HistoryNodeId) -> Result<NodeIndex<u32>, CoreError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(CoreError::NodeNotFound { id })
    }

    pub fn get(&self, id: HistoryNodeId) -> Result<&HistoryNode, CoreError> {
        let idx = self.index_of(id)?;
        self.tree
            .node_weight(idx)
            .ok_or(CoreError::NodeNotFound { id })
    }

    fn get_mut(&mut self, id: HistoryNodeId) -> Result<&mut HistoryNode, CoreError> {
        let idx = self.index_of(id)?;
        self.tree
            .node_weight_mut(idx)
            .ok_or(CoreError::NodeNotFound { id })
    }

    /// Iterates all retained nodes in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &HistoryNode> {
        self.tree.node_weights()
    }

    /// Every snapshot reference still held by a node.
    pub fn snapshot_refs(&self) -> HashSet<SnapshotRef> {
        self.nodes().map(|n| n.snapshot).collect()
    }

    // -----------------------------------------------------------------------
    // Growth
    // -----------------------------------------------------------------------

    /// Appends a new child under `parent` and makes it the preferred child.
    ///
    /// If `parent` already has children this opens a new sibling branch; the
    /// older branches stay reachable.
    pub fn append(
        &mut self,
        parent: HistoryNodeId,
        action: ActionType,
        metadata: Metadata,
        snapshot: SnapshotRef,
        timestamp: Timestamp,
    ) -> Result<HistoryNodeId, CoreError> {
        let parent_idx = self.index_of(parent)?;
        let id = HistoryNodeId::new();
        let seq = self.next_seq;
        self.next_seq += 1;

        let idx = self.tree.add_node(HistoryNode {
            id,
            parent_id: Some(parent),
            child_ids: Vec::new(),
            preferred_child: None,
            action,
            metadata,
            timestamp,
            snapshot,
            seq,
            label: None,
        });
        self.tree.add_edge(parent_idx, idx, ());
        self.index.insert(id, idx);

        let parent_node = &mut self.tree[parent_idx];
        parent_node.child_ids.push(id);
        parent_node.preferred_child = Some(id);
        Ok(id)
    }

    /// Swaps a leaf node's snapshot and metadata for newer ones.
    ///
    /// The stored payload behind the old reference is untouched; the old
    /// reference is returned so the caller can release it.
    pub fn amend(
        &mut self,
        id: HistoryNodeId,
        snapshot: SnapshotRef,
        metadata: Metadata,
    ) -> Result<SnapshotRef, CoreError> {
        let node = self.get_mut(id)?;
        if !node.is_leaf() {
            return Err(CoreError::NotALeaf { id });
        }
        node.metadata = metadata;
        Ok(std::mem::replace(&mut node.snapshot, snapshot))
    }

    /// Attaches or removes a checkpoint label.
    pub fn set_label(&mut self, id: HistoryNodeId, label: Option<String>) -> Result<(), CoreError> {
        self.get_mut(id)?.label = label;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// The parent of `id`, or `None` at the root.
    pub fn move_to_parent(&self, id: HistoryNodeId) -> Result<Option<HistoryNodeId>, CoreError> {
        Ok(self.get(id)?.parent_id)
    }

    /// The preferred child of `id`, or `None` for a leaf.
    pub fn move_to_preferred_child(
        &self,
        id: HistoryNodeId,
    ) -> Result<Option<HistoryNodeId>, CoreError> {
        Ok(self.get(id)?.preferred_child)
    }

    pub fn children(&self, id: HistoryNodeId) -> Result<&[HistoryNodeId], CoreError> {
        Ok(&self.get(id)?.child_ids)
    }

    /// Makes `child` the redo target of `parent`.
    pub fn set_preferred_child(
        &mut self,
        parent: HistoryNodeId,
        child: HistoryNodeId,
    ) -> Result<(), CoreError> {
        let node = self.get_mut(parent)?;
        if !node.child_ids.contains(&child) {
            return Err(CoreError::NotAChild { parent, child });
        }
        node.preferred_child = Some(child);
        Ok(())
    }

    /// Called when the pointer leaves `child` upward.
    ///
    /// Under [`BranchPolicy::LastVisited`] the parent remembers `child` as its
    /// redo target; under `MostRecent` nothing changes.
    pub fn note_departure(&mut self, child: HistoryNodeId) -> Result<(), CoreError> {
        if self.policy != BranchPolicy::LastVisited {
            return Ok(());
        }
        if let Some(parent) = self.get(child)?.parent_id {
            self.set_preferred_child(parent, child)?;
        }
        Ok(())
    }

    /// Called after a direct jump to `target`.
    ///
    /// Under [`BranchPolicy::LastVisited`] every ancestor on the way down now
    /// prefers the branch leading to `target`.
    pub fn note_arrival(&mut self, target: HistoryNodeId) -> Result<(), CoreError> {
        if self.policy != BranchPolicy::LastVisited {
            return Ok(());
        }
        let path = self.path_ids(target)?;
        for pair in path.windows(2) {
            self.set_preferred_child(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path_ids(&self, id: HistoryNodeId) -> Result<Vec<HistoryNodeId>, CoreError> {
        let mut path = vec![id];
        let mut cursor = self.get(id)?.parent_id;
        while let Some(parent) = cursor {
            if path.len() > self.len() {
                return Err(CoreError::InvariantViolation {
                    reason: format!("cycle detected walking up from {}", id),
                });
            }
            path.push(parent);
            cursor = self.get(parent)?.parent_id;
        }
        path.reverse();
        Ok(path)
    }

    /// Nodes from the root down to `id`, inclusive.
    pub fn path_from_root(&self, id: HistoryNodeId) -> Result<Vec<&HistoryNode>, CoreError> {
        self.path_ids(id)?
            .into_iter()
            .map(|node| self.get(node))
            .collect()
    }

    /// Up to `limit` ids following preferred children below `id` (exclusive).
    pub fn preferred_chain(
        &self,
        id: HistoryNodeId,
        limit: usize,
    ) -> Result<Vec<HistoryNodeId>, CoreError> {
        let mut chain = Vec::new();
        let mut cursor = self.get(id)?.preferred_child;
        while let Some(next) = cursor {
            if chain.len() >= limit {
                break;
            }
            chain.push(next);
            cursor = self.get(next)?.preferred_child;
        }
        Ok(chain)
    }

    /// `id` and all of its descendants.
    pub fn subtree_ids(&self, id: HistoryNodeId) -> Result<Vec<HistoryNodeId>, CoreError> {
        let start = self.index_of(id)?;
        let mut dfs = Dfs::new(&self.tree, start);
        let mut ids = Vec::new();
        while let Some(idx) = dfs.next(&self.tree) {
            ids.push(self.tree[idx].id);
        }
        Ok(ids)
    }

    // -----------------------------------------------------------------------
    // Pruning
    // -----------------------------------------------------------------------

    /// Keeps the root -> `before` path plus up to `lookahead` preferred-chain
    /// nodes ahead of it and discards everything else.
    pub fn prune(
        &mut self,
        before: HistoryNodeId,
        lookahead: usize,
    ) -> Result<Vec<HistoryNode>, CoreError> {
        let mut keep: HashSet<HistoryNodeId> = self.path_ids(before)?.into_iter().collect();
        keep.extend(self.preferred_chain(before, lookahead)?);
        self.retain(self.root, &keep)
    }

    /// Discards every node outside `keep` and re-roots the tree at `new_root`.
    ///
    /// `keep` must contain `new_root` and every kept node must reach
    /// `new_root` through kept ancestors. Preferred children that were
    /// discarded are repointed to the newest surviving child. Returns the
    /// discarded nodes.
    pub fn retain(
        &mut self,
        new_root: HistoryNodeId,
        keep: &HashSet<HistoryNodeId>,
    ) -> Result<Vec<HistoryNode>, CoreError> {
        if !keep.contains(&new_root) {
            return Err(CoreError::InvariantViolation {
                reason: format!("retain set does not contain new root {}", new_root),
            });
        }
        for &id in keep {
            let path = self.path_ids(id)?;
            let anchored = path
                .iter()
                .position(|p| *p == new_root)
                .is_some_and(|pos| path[pos..].iter().all(|p| keep.contains(p)));
            if !anchored {
                return Err(CoreError::InvariantViolation {
                    reason: format!("kept node {} is not connected to new root {}", id, new_root),
                });
            }
        }

        let doomed: Vec<HistoryNodeId> = self
            .index
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(idx) = self.index.remove(&id) {
                if let Some(node) = self.tree.remove_node(idx) {
                    removed.push(node);
                }
            }
        }

        let kept_ids: Vec<HistoryNodeId> = self.index.keys().copied().collect();
        for id in kept_ids {
            let node = self.get_mut(id)?;
            node.child_ids.retain(|c| keep.contains(c));
            let dangling = node
                .preferred_child
                .is_some_and(|p| !node.child_ids.contains(&p));
            if dangling || node.preferred_child.is_none() {
                node.preferred_child = node.child_ids.last().copied();
            }
        }

        self.get_mut(new_root)?.parent_id = None;
        self.root = new_root;
        removed.sort_by_key(|n| n.seq);
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Verifies every tree invariant, reporting the first violation found.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let violation = |reason: String| Err(CoreError::InvariantViolation { reason });

        if self.index.len() != self.tree.node_count() {
            return violation(format!(
                "index holds {} ids but tree holds {} nodes",
                self.index.len(),
                self.tree.node_count()
            ));
        }

        let roots: Vec<HistoryNodeId> = self
            .nodes()
            .filter(|n| n.parent_id.is_none())
            .map(|n| n.id)
            .collect();
        if roots != [self.root] {
            return violation(format!("expected single root {}, found {:?}", self.root, roots));
        }

        for (&id, &idx) in &self.index {
            let node = match self.tree.node_weight(idx) {
                Some(node) if node.id == id => node,
                _ => return violation(format!("index entry {} points at wrong slot", id)),
            };

            let incoming = self.tree.edges_directed(idx, Direction::Incoming).count();
            match node.parent_id {
                None if incoming != 0 => {
                    return violation(format!("root {} has {} incoming links", id, incoming));
                }
                None => {}
                Some(parent) => {
                    let parent_idx = self.index_of(parent)?;
                    if incoming != 1 || self.tree.find_edge(parent_idx, idx).is_none() {
                        return violation(format!("node {} is not linked under {}", id, parent));
                    }
                    if !self.tree[parent_idx].child_ids.contains(&id) {
                        return violation(format!("parent {} does not list child {}", parent, id));
                    }
                }
            }

            let outgoing = self.tree.edges_directed(idx, Direction::Outgoing).count();
            let distinct: HashSet<_> = node.child_ids.iter().collect();
            if outgoing != node.child_ids.len() || distinct.len() != node.child_ids.len() {
                return violation(format!("child list of {} disagrees with links", id));
            }
            for child in &node.child_ids {
                if self.get(*child)?.parent_id != Some(id) {
                    return violation(format!("child {} does not point back to {}", child, id));
                }
            }

            match node.preferred_child {
                None if !node.child_ids.is_empty() => {
                    return violation(format!("node {} has children but no preferred child", id));
                }
                Some(p) if !node.child_ids.contains(&p) => {
                    return violation(format!("preferred child {} of {} is not a child", p, id));
                }
                _ => {}
            }
        }

        if petgraph::algo::is_cyclic_directed(&self.tree) {
            return violation("history tree contains a cycle".to_string());
        }

        let mut dfs = Dfs::new(&self.tree, self.index_of(self.root)?);
        let mut reached = 0;
        while dfs.next(&self.tree).is_some() {
            reached += 1;
        }
        if reached != self.tree.node_count() {
            return violation(format!(
                "only {} of {} nodes reachable from root",
                reached,
                self.tree.node_count()
            ));
        }

        Ok(())
    }
}
