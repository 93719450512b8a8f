//! Engine error types.
//!
//! [`EngineError`] is the unified error type for controller operations.
//! No-op navigation (undo at the root, redo at a leaf) is not an error and
//! is reported as `Ok(false)`.

use revtree_core::CoreError;
use revtree_storage::StorageError;

/// Errors surfaced by the history controller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Tree-level failure: unknown node, bad branch, broken invariant.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A snapshot could not be resolved; nothing was applied to the host.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The controller was disposed and accepts no further operations.
    #[error("history controller has been disposed")]
    Disposed,

    /// A checkpoint with this name already exists.
    #[error("conflict: checkpoint '{0}' already exists")]
    CheckpointExists(String),

    #[error("checkpoint '{0}' not found")]
    CheckpointNotFound(String),
}

/// Logs a failure to find a node the controller itself holds a reference to.
///
/// The controller only ever points at nodes it created and has not pruned,
/// so a lookup failure here means the tree is corrupt.
pub(crate) fn invariant_broken(err: CoreError) -> EngineError {
    tracing::error!("history invariant broken: {}", err);
    match err {
        CoreError::InvariantViolation { .. } => EngineError::Core(err),
        other => EngineError::Core(CoreError::InvariantViolation {
            reason: other.to_string(),
        }),
    }
}
