//! Storage error types for revtree-storage.

use revtree_core::SnapshotRef;
use thiserror::Error;

/// Errors produced by snapshot storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The reference was never issued, or its payload was compacted away.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotRef),
}
