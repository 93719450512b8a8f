//! Snapshot storage for revtree history nodes.
//!
//! Provides the [`SnapshotStore`] trait defining the storage contract that
//! all backends implement, plus [`InMemorySnapshotStore`] as the default
//! backend for an editing session.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: StoreStats storage-layer types
//! - [`traits`]: SnapshotStore trait definition
//! - [`hash`]: blake3 content hashing of graph states
//! - [`memory`]: InMemorySnapshotStore implementation

pub mod error;
pub mod hash;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use hash::hash_state;
pub use memory::InMemorySnapshotStore;
pub use traits::SnapshotStore;
pub use types::StoreStats;
