//! Named checkpoints on history nodes.
//!
//! A checkpoint is a user-facing save point: a name pinned to one node of
//! the tree. Restoring it is a jump to that node. Checkpoints live only as
//! long as the session and vanish with their node when compaction prunes it.

use revtree_core::{HistoryNodeId, Timestamp};

use crate::error::EngineError;
use crate::schema::history::CheckpointView;

/// One named save point.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub name: String,
    pub description: Option<String>,
    pub node: HistoryNodeId,
    pub created_at: Timestamp,
}

impl Checkpoint {
    pub fn view(&self) -> CheckpointView {
        CheckpointView {
            name: self.name.clone(),
            description: self.description.clone(),
            node: self.node,
            timestamp: self.created_at,
        }
    }
}

/// Checkpoints in creation order.
#[derive(Debug, Clone, Default)]
pub struct CheckpointBook {
    entries: Vec<Checkpoint>,
}

impl CheckpointBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a checkpoint. Names are unique.
    pub fn create(&mut self, checkpoint: Checkpoint) -> Result<(), EngineError> {
        if self.get(&checkpoint.name).is_some() {
            return Err(EngineError::CheckpointExists(checkpoint.name));
        }
        self.entries.push(checkpoint);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Checkpoint> {
        self.entries.iter().find(|c| c.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Result<Checkpoint, EngineError> {
        let pos = self
            .entries
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EngineError::CheckpointNotFound(name.to_string()))?;
        Ok(self.entries.remove(pos))
    }

    /// The newest checkpoint pinned to `node`, if any.
    pub fn latest_for(&self, node: HistoryNodeId) -> Option<&Checkpoint> {
        self.entries.iter().rev().find(|c| c.node == node)
    }

    /// Drops checkpoints whose node no longer exists. Returns their names.
    pub fn retain_nodes(&mut self, exists: impl Fn(HistoryNodeId) -> bool) -> Vec<String> {
        let mut dropped = Vec::new();
        self.entries.retain(|c| {
            let keep = exists(c.node);
            if !keep {
                dropped.push(c.name.clone());
            }
            keep
        });
        dropped
    }

    pub fn list(&self) -> Vec<CheckpointView> {
        self.entries.iter().map(Checkpoint::view).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(name: &str, node: HistoryNodeId) -> Checkpoint {
        Checkpoint {
            name: name.to_string(),
            description: None,
            node,
            created_at: Timestamp(0),
        }
    }

    #[test]
    fn duplicate_names_conflict() {
        let mut book = CheckpointBook::new();
        let node = HistoryNodeId::new();
        book.create(checkpoint("before-refactor", node)).unwrap();
        let err = book.create(checkpoint("before-refactor", node)).unwrap_err();
        assert!(matches!(err, EngineError::CheckpointExists(name) if name == "before-refactor"));
    }

    #[test]
    fn remove_missing_is_not_found() {
        let mut book = CheckpointBook::new();
        assert!(matches!(
            book.remove("nope"),
            Err(EngineError::CheckpointNotFound(_))
        ));
    }

    #[test]
    fn latest_for_prefers_newest() {
        let mut book = CheckpointBook::new();
        let node = HistoryNodeId::new();
        book.create(checkpoint("a", node)).unwrap();
        book.create(checkpoint("b", node)).unwrap();
        assert_eq!(book.latest_for(node).unwrap().name, "b");
    }

    #[test]
    fn retain_nodes_reports_dropped() {
        let mut book = CheckpointBook::new();
        let alive = HistoryNodeId::new();
        let gone = HistoryNodeId::new();
        book.create(checkpoint("keep", alive)).unwrap();
        book.create(checkpoint("lose", gone)).unwrap();

        let dropped = book.retain_nodes(|id| id == alive);
        assert_eq!(dropped, vec!["lose".to_string()]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.list()[0].name, "keep");
    }
}
