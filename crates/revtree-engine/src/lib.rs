//! Branching undo/redo engine for node-graph editors.
//!
//! [`HistoryController`] is the facade an editor session owns. It turns the
//! host's change events into history nodes through the [`ActionRecorder`],
//! keeps every abandoned future reachable in the `revtree_core` tree, and
//! pushes restored snapshots back through [`EditorHost`].
//!
//! # Modules
//!
//! - [`controller`]: the facade and its operations
//! - [`recorder`]: debounce and coalescing of raw events
//! - [`compaction`]: what survives once the tree outgrows its budget
//! - [`checkpoint`]: named save points
//! - [`host`]: the editor seam and an in-memory host
//! - [`clock`], [`timer`]: explicit time and cancellable deadlines
//! - [`driver`]: tokio task that closes debounce windows in the background
//! - [`schema`]: timeline views published to the host
//! - [`error`]: EngineError

pub mod checkpoint;
pub mod clock;
pub mod compaction;
pub mod controller;
pub mod driver;
pub mod error;
pub mod host;
pub mod recorder;
pub mod schema;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::HistoryController;
pub use driver::{share, start_flush_driver, SharedController};
pub use error::EngineError;
pub use host::{EditorHost, SessionHost};
pub use recorder::{ActionRecorder, RawEvent};
pub use schema::history::{CheckpointView, HistoryEntry, HistoryView};
