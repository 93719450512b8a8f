//! Core data model for the revtree branching history engine.
//!
//! - [`graph`]: the branching [`HistoryGraph`] tree
//! - [`node`]: [`HistoryNode`] entries
//! - [`action`]: [`ActionType`] and its discrete/continuous classification
//! - [`types`]: opaque host payloads ([`GraphState`], [`Metadata`]) and [`Timestamp`]
//! - [`config`]: [`HistoryConfig`]
//! - [`id`], [`error`]

pub mod action;
pub mod config;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod types;

// Re-export commonly used types
pub use action::{target_from_metadata, ActionClass, ActionType};
pub use config::{BranchPolicy, HistoryConfig};
pub use error::CoreError;
pub use graph::HistoryGraph;
pub use id::{HistoryNodeId, SnapshotRef};
pub use node::HistoryNode;
pub use types::{GraphState, Metadata, Timestamp};
