//! The seam between the engine and the host editor.
//!
//! The controller pulls the live graph through [`EditorHost::capture`] and
//! pushes restored snapshots back through the two setters. Callbacks only
//! receive the host itself, so a callback cannot re-enter the controller
//! while it is mid-traversal.

use serde_json::Value;

use revtree_core::GraphState;

use crate::schema::history::HistoryView;

/// What the engine needs from the editor that owns it.
pub trait EditorHost {
    /// A copy of the live nodes and edges.
    fn capture(&self) -> GraphState;

    /// Replaces the rendered nodes.
    fn set_nodes(&mut self, nodes: &[Value]);

    /// Replaces the rendered edges.
    fn set_edges(&mut self, edges: &[Value]);

    /// Called whenever the timeline or the pointer changes.
    fn history_changed(&mut self, _view: &HistoryView) {}
}

/// A host that keeps its graph in memory. Used by the CLI and in tests.
#[derive(Debug, Clone, Default)]
pub struct SessionHost {
    /// The editor's working copy.
    pub live: GraphState,
    /// Most recent timeline published by the controller.
    pub last_view: Option<HistoryView>,
    /// How many snapshots the controller has pushed back.
    pub restores: usize,
    /// How many timelines the controller has published.
    pub notifications: usize,
}

impl SessionHost {
    pub fn new(live: GraphState) -> Self {
        SessionHost {
            live,
            ..Default::default()
        }
    }

    /// Mutates the working copy in place.
    pub fn edit(&mut self, f: impl FnOnce(&mut GraphState)) {
        f(&mut self.live);
    }
}

impl EditorHost for SessionHost {
    fn capture(&self) -> GraphState {
        self.live.clone()
    }

    fn set_nodes(&mut self, nodes: &[Value]) {
        self.live.nodes = nodes.to_vec();
    }

    fn set_edges(&mut self, edges: &[Value]) {
        self.live.edges = edges.to_vec();
        // Edges are always applied second, closing out one restore.
        self.restores += 1;
    }

    fn history_changed(&mut self, view: &HistoryView) {
        self.last_view = Some(view.clone());
        self.notifications += 1;
    }
}
