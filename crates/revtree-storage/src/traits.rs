//! The [`SnapshotStore`] trait defining the storage contract for snapshots.
//!
//! The history tree only holds [`SnapshotRef`]s; payloads live behind this
//! trait so backends are swappable without changing the engine.

use std::collections::HashSet;
use std::sync::Arc;

use revtree_core::{GraphState, SnapshotRef};

use crate::error::StorageError;
use crate::types::StoreStats;

/// The storage contract for graph-state snapshots.
///
/// The trait is synchronous: every history operation completes within one
/// turn of the host's event loop.
pub trait SnapshotStore {
    /// Persists an owned copy of `state`.
    ///
    /// The caller may keep mutating its own copy after this returns.
    fn store(&mut self, state: &GraphState) -> SnapshotRef;

    /// Returns the immutable payload behind `snapshot`.
    fn resolve(&self, snapshot: SnapshotRef) -> Result<Arc<GraphState>, StorageError>;

    /// Returns the blake3 content hash of the payload behind `snapshot`.
    fn content_hash(&self, snapshot: SnapshotRef) -> Result<blake3::Hash, StorageError>;

    /// Releases every payload whose reference is not in `retain`.
    ///
    /// Returns the number of payloads released.
    fn compact(&mut self, retain: &HashSet<SnapshotRef>) -> usize;

    fn contains(&self, snapshot: SnapshotRef) -> bool;

    /// Number of distinct payloads held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every payload.
    fn clear(&mut self);

    fn stats(&self) -> StoreStats;
}
