//! In-memory implementation of [`SnapshotStore`].
//!
//! [`InMemorySnapshotStore`] is the session backend: all payloads live in
//! HashMaps for the lifetime of the editing session. Identical payloads are
//! deduplicated by content hash, so a state that recurs (an undo followed by
//! an identical edit, a drag that returns home) costs one copy.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use revtree_core::{GraphState, SnapshotRef};

use crate::error::StorageError;
use crate::hash::{canonical_bytes, hash_state};
use crate::traits::SnapshotStore;
use crate::types::StoreStats;

/// Data stored for a single snapshot.
#[derive(Debug, Clone)]
struct StoredSnapshot {
    state: Arc<GraphState>,
    hash: blake3::Hash,
    /// Canonical JSON size, for stats.
    bytes: usize,
}

/// In-memory implementation of [`SnapshotStore`].
#[derive(Debug)]
pub struct InMemorySnapshotStore {
    snapshots: HashMap<SnapshotRef, StoredSnapshot>,
    by_hash: HashMap<blake3::Hash, SnapshotRef>,
    next_ref: u64,
}

impl InMemorySnapshotStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        InMemorySnapshotStore {
            snapshots: HashMap::new(),
            by_hash: HashMap::new(),
            next_ref: 0,
        }
    }

    /// Returns the stored entry, or error if not found.
    fn get_stored(&self, snapshot: SnapshotRef) -> Result<&StoredSnapshot, StorageError> {
        self.snapshots
            .get(&snapshot)
            .ok_or(StorageError::SnapshotNotFound(snapshot))
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn store(&mut self, state: &GraphState) -> SnapshotRef {
        let hash = hash_state(state);
        if let Some(&existing) = self.by_hash.get(&hash) {
            return existing;
        }

        let snapshot = SnapshotRef(self.next_ref);
        self.next_ref += 1;
        self.snapshots.insert(
            snapshot,
            StoredSnapshot {
                state: Arc::new(state.clone()),
                hash,
                bytes: canonical_bytes(state).len(),
            },
        );
        self.by_hash.insert(hash, snapshot);
        snapshot
    }

    fn resolve(&self, snapshot: SnapshotRef) -> Result<Arc<GraphState>, StorageError> {
        Ok(Arc::clone(&self.get_stored(snapshot)?.state))
    }

    fn content_hash(&self, snapshot: SnapshotRef) -> Result<blake3::Hash, StorageError> {
        Ok(self.get_stored(snapshot)?.hash)
    }

    fn compact(&mut self, retain: &HashSet<SnapshotRef>) -> usize {
        let before = self.snapshots.len();
        self.snapshots.retain(|snapshot, _| retain.contains(snapshot));
        let snapshots = &self.snapshots;
        self.by_hash
            .retain(|_, snapshot| snapshots.contains_key(snapshot));
        before - self.snapshots.len()
    }

    fn contains(&self, snapshot: SnapshotRef) -> bool {
        self.snapshots.contains_key(&snapshot)
    }

    fn len(&self) -> usize {
        self.snapshots.len()
    }

    fn clear(&mut self) {
        self.snapshots.clear();
        self.by_hash.clear();
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            snapshots: self.snapshots.len(),
            approx_bytes: self.snapshots.values().map(|s| s.bytes).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(x: i64) -> GraphState {
        GraphState::new(
            vec![json!({ "id": "n1", "position": { "x": x, "y": 0 } })],
            vec![],
        )
    }

    #[test]
    fn test_store_and_resolve() {
        let mut store = InMemorySnapshotStore::new();
        let r = store.store(&state(1));
        assert_eq!(*store.resolve(r).unwrap(), state(1));
        assert!(store.contains(r));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_stored_copy_is_independent_of_caller() {
        let mut store = InMemorySnapshotStore::new();
        let mut live = state(1);
        let r = store.store(&live);
        live.nodes.push(json!({ "id": "n2" }));
        live.nodes[0]["position"]["x"] = json!(99);

        let stored = store.resolve(r).unwrap();
        assert_eq!(stored.node_count(), 1);
        assert_eq!(stored.nodes[0]["position"]["x"], json!(1));
    }

    #[test]
    fn test_identical_payloads_share_a_ref() {
        let mut store = InMemorySnapshotStore::new();
        let a = store.store(&state(1));
        let b = store.store(&state(2));
        let c = store.store(&state(1));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.content_hash(a).unwrap(), store.content_hash(c).unwrap());
    }

    #[test]
    fn test_compact_releases_unretained() {
        let mut store = InMemorySnapshotStore::new();
        let a = store.store(&state(1));
        let b = store.store(&state(2));
        let c = store.store(&state(3));

        let retain: HashSet<_> = [a, c].into_iter().collect();
        assert_eq!(store.compact(&retain), 1);
        assert!(!store.contains(b));
        assert!(matches!(
            store.resolve(b),
            Err(StorageError::SnapshotNotFound(r)) if r == b
        ));

        // A released payload stored again gets a fresh ref.
        let again = store.store(&state(2));
        assert_ne!(again, b);
    }

    #[test]
    fn test_stats_and_clear() {
        let mut store = InMemorySnapshotStore::new();
        store.store(&state(1));
        store.store(&state(2));
        let stats = store.stats();
        assert_eq!(stats.snapshots, 2);
        assert!(stats.approx_bytes > 0);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.stats(), StoreStats::default());
    }
}
