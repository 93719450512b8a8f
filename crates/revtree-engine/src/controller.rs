//! HistoryController: the single facade between the host editor and the
//! history tree, snapshot store and action recorder.
//!
//! The controller owns all history state. The host only reaches it through
//! these methods and only hears back through [`EditorHost`] callbacks.
//! Every operation is synchronous and finishes within one turn of the
//! host's event loop; debounce windows close when [`HistoryController::tick`]
//! is called after their deadline.

use std::sync::Arc;

use revtree_core::{
    ActionType, CoreError, GraphState, HistoryConfig, HistoryGraph, HistoryNodeId, Metadata,
    SnapshotRef, Timestamp,
};
use revtree_storage::{hash_state, InMemorySnapshotStore, SnapshotStore};

use crate::checkpoint::{Checkpoint, CheckpointBook};
use crate::clock::{Clock, SystemClock};
use crate::compaction;
use crate::error::{invariant_broken, EngineError};
use crate::host::EditorHost;
use crate::recorder::{ActionRecorder, Commit, Decision, RawEvent, RecorderSettings};
use crate::schema::history::{CheckpointView, HistoryEntry, HistoryView};

/// The undo/redo facade owned by one editing session.
pub struct HistoryController<H, S = InMemorySnapshotStore> {
    config: HistoryConfig,
    graph: HistoryGraph,
    store: S,
    recorder: ActionRecorder,
    host: H,
    clock: Arc<dyn Clock>,
    current: HistoryNodeId,
    checkpoints: CheckpointBook,
    /// Content hash of the snapshot last pushed to the host, and when. A
    /// recording with identical content at that same instant is the host
    /// echoing it back.
    echo: Option<(blake3::Hash, Timestamp)>,
    disposed: bool,
}

impl<H: EditorHost> HistoryController<H> {
    /// Creates a controller with an in-memory store and the wall clock.
    ///
    /// The host's current graph becomes the root snapshot.
    pub fn new(config: HistoryConfig, host: H) -> Result<Self, EngineError> {
        Self::with_parts(
            config,
            host,
            InMemorySnapshotStore::new(),
            Arc::new(SystemClock::new()),
        )
    }
}

impl<H: EditorHost, S: SnapshotStore> HistoryController<H, S> {
    /// Creates a controller from explicit parts.
    pub fn with_parts(
        config: HistoryConfig,
        host: H,
        mut store: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let now = clock.now();
        let snapshot = store.store(&host.capture());
        let graph = HistoryGraph::new(
            ActionType::Init,
            Metadata::new(),
            snapshot,
            now,
            config.branch_policy,
        );
        let current = graph.root_id();
        let recorder = ActionRecorder::new(RecorderSettings::from(&config));

        let mut controller = HistoryController {
            config,
            graph,
            store,
            recorder,
            host,
            clock,
            current,
            checkpoints: CheckpointBook::new(),
            echo: None,
            disposed: false,
        };
        controller.publish()?;
        tracing::debug!("history initialized at root {}", current);
        Ok(controller)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn current_id(&self) -> HistoryNodeId {
        self.current
    }

    pub fn graph(&self) -> &HistoryGraph {
        &self.graph
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host, for making edits between recordings.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether a continuous gesture is waiting to commit.
    pub fn has_pending(&self) -> bool {
        self.recorder.has_pending()
    }

    /// When [`tick`](Self::tick) next has work to do.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.recorder.next_deadline()
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Records a discrete edit immediately, bypassing debounce and
    /// coalescing. The live host state becomes the new node's snapshot.
    ///
    /// Returns `None` when the recording was recognised as the host echoing
    /// back a snapshot the controller just applied.
    pub fn record_action(
        &mut self,
        action: ActionType,
        metadata: Metadata,
    ) -> Result<Option<HistoryNodeId>, EngineError> {
        self.ensure_live()?;
        let state = self.host.capture();
        let now = self.clock.now();
        if self.is_echo(&action, &state, now) {
            tracing::debug!("ignoring {} recorded while host re-synchronized", action);
            return Ok(None);
        }

        let flushed = self.recorder.flush_all();
        self.apply_decisions(flushed, now)?;

        let snapshot = self.store.store(&state);
        let node = self.append_node(action, metadata, snapshot, now)?;
        self.recorder.forget_last_commit();
        self.after_commit()?;
        Ok(Some(node))
    }

    /// Records an edit through the debounce and coalescing rules.
    ///
    /// Returns the nodes created or amended by this call; a drag in
    /// progress returns nothing until its window closes.
    pub fn record_action_debounced(
        &mut self,
        action: ActionType,
        metadata: Metadata,
    ) -> Result<Vec<HistoryNodeId>, EngineError> {
        self.ensure_live()?;
        let event = RawEvent::new(action, metadata, self.host.capture());
        self.submit(event)
    }

    /// Raw ingress for host change events.
    pub fn submit(&mut self, event: RawEvent) -> Result<Vec<HistoryNodeId>, EngineError> {
        self.ensure_live()?;
        let now = self.clock.now();
        if self.is_echo(&event.action, &event.state, now) {
            tracing::debug!("ignoring {} event echoing an applied snapshot", event.action);
            return Ok(Vec::new());
        }
        let decisions = self.recorder.submit(event, now);
        self.apply_decisions(decisions, now)
    }

    /// Closes debounce windows whose deadline has passed.
    ///
    /// Returns whether anything was committed.
    pub fn tick(&mut self) -> Result<bool, EngineError> {
        self.ensure_live()?;
        self.echo = None;
        let now = self.clock.now();
        let decisions = self.recorder.poll(now);
        Ok(!self.apply_decisions(decisions, now)?.is_empty())
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Moves to the parent node. `Ok(false)` at the root.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        self.ensure_live()?;
        self.flush_pending()?;

        let left = self.current;
        let parent = self.graph.move_to_parent(left).map_err(invariant_broken)?;
        let Some(parent) = parent else {
            return Ok(false);
        };
        self.move_to(parent)?;
        self.graph.note_departure(left).map_err(invariant_broken)?;
        self.publish()?;
        Ok(true)
    }

    /// Moves to the preferred child. `Ok(false)` at a leaf.
    pub fn redo(&mut self) -> Result<bool, EngineError> {
        self.ensure_live()?;
        self.flush_pending()?;

        let child = self
            .graph
            .move_to_preferred_child(self.current)
            .map_err(invariant_broken)?;
        let Some(child) = child else {
            return Ok(false);
        };
        self.move_to(child)?;
        self.publish()?;
        Ok(true)
    }

    /// Moves straight to any retained node, e.g. from a history panel.
    ///
    /// `Ok(false)` if `target` is already current.
    pub fn jump_to(&mut self, target: HistoryNodeId) -> Result<bool, EngineError> {
        self.ensure_live()?;
        if !self.graph.contains(target) {
            return Err(CoreError::NodeNotFound { id: target }.into());
        }
        self.flush_pending()?;
        // The flush may have compacted `target` away.
        if !self.graph.contains(target) {
            return Err(CoreError::NodeNotFound { id: target }.into());
        }
        if target == self.current {
            return Ok(false);
        }
        self.move_to(target)?;
        self.graph.note_arrival(target).map_err(invariant_broken)?;
        self.publish()?;
        Ok(true)
    }

    /// Makes `child` its parent's redo target.
    ///
    /// `Ok(false)` for the root, which has no parent to update.
    pub fn select_branch(&mut self, child: HistoryNodeId) -> Result<bool, EngineError> {
        self.ensure_live()?;
        let Some(parent) = self.graph.get(child)?.parent_id else {
            return Ok(false);
        };
        self.graph.set_preferred_child(parent, child)?;
        self.publish()?;
        Ok(true)
    }

    /// Resets history to a single root holding the live editor state.
    pub fn clear_history(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.flush_pending()?;

        let dropped = self.graph.len();
        let now = self.clock.now();
        self.store.clear();
        let snapshot = self.store.store(&self.host.capture());
        self.graph = HistoryGraph::new(
            ActionType::Clear,
            Metadata::new(),
            snapshot,
            now,
            self.config.branch_policy,
        );
        self.current = self.graph.root_id();
        self.checkpoints.clear();
        self.recorder.forget_last_commit();
        self.echo = None;
        tracing::info!("cleared {} history node(s)", dropped);
        self.publish()
    }

    /// Replaces the configuration. A smaller budget compacts right away,
    /// keeping the redo chain ahead of the pointer up to the lookahead.
    pub fn set_config(&mut self, config: HistoryConfig) -> Result<(), EngineError> {
        self.ensure_live()?;
        config.validate()?;
        self.recorder.set_settings(RecorderSettings::from(&config));
        self.graph.set_policy(config.branch_policy);
        self.config = config;

        let before = self.graph.len();
        self.compact_if_needed()?;
        if self.graph.len() != before {
            self.publish()?;
        }
        Ok(())
    }

    /// The timeline through the current node, for a history panel.
    pub fn get_history(&self) -> Result<HistoryView, EngineError> {
        self.ensure_live()?;
        self.view()
    }

    // -----------------------------------------------------------------------
    // Checkpoints
    // -----------------------------------------------------------------------

    /// Pins `name` to the current node.
    pub fn create_checkpoint(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<CheckpointView, EngineError> {
        self.ensure_live()?;
        self.flush_pending()?;

        let checkpoint = Checkpoint {
            name: name.to_string(),
            description: description.map(str::to_string),
            node: self.current,
            created_at: self.clock.now(),
        };
        let view = checkpoint.view();
        self.checkpoints.create(checkpoint)?;
        self.graph
            .set_label(self.current, Some(name.to_string()))
            .map_err(invariant_broken)?;
        tracing::debug!("checkpoint '{}' pinned to {}", name, self.current);
        self.publish()?;
        Ok(view)
    }

    /// Jumps to the node a checkpoint is pinned to.
    pub fn restore_checkpoint(&mut self, name: &str) -> Result<bool, EngineError> {
        self.ensure_live()?;
        let node = self
            .checkpoints
            .get(name)
            .map(|c| c.node)
            .ok_or_else(|| EngineError::CheckpointNotFound(name.to_string()))?;
        self.jump_to(node)
    }

    pub fn list_checkpoints(&self) -> Vec<CheckpointView> {
        self.checkpoints.list()
    }

    pub fn delete_checkpoint(&mut self, name: &str) -> Result<(), EngineError> {
        self.ensure_live()?;
        let removed = self.checkpoints.remove(name)?;
        let label = self
            .checkpoints
            .latest_for(removed.node)
            .map(|c| c.name.clone());
        if self.graph.contains(removed.node) {
            self.graph.set_label(removed.node, label)?;
        }
        self.publish()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Commits any pending gesture, cancels all timers and shuts down.
    ///
    /// Calling it again is a no-op; every other operation fails with
    /// [`EngineError::Disposed`] afterwards.
    pub fn dispose(&mut self) -> Result<(), EngineError> {
        if self.disposed {
            return Ok(());
        }
        let now = self.clock.now();
        let decisions = self.recorder.shutdown();
        self.apply_decisions(decisions, now)?;
        self.disposed = true;
        tracing::debug!("history controller disposed with {} node(s)", self.graph.len());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        Ok(())
    }

    /// Consumes the echo guard; true if `state` is the snapshot just
    /// applied and the clock has not moved since. Viewport changes never
    /// touch the graph arrays, so they are never treated as echoes.
    fn is_echo(&mut self, action: &ActionType, state: &GraphState, now: Timestamp) -> bool {
        match self.echo.take() {
            Some((applied, at)) => {
                at == now && *action != ActionType::Viewport && hash_state(state) == applied
            }
            None => false,
        }
    }

    fn current_snapshot(&self) -> Result<SnapshotRef, EngineError> {
        Ok(self.graph.get(self.current).map_err(invariant_broken)?.snapshot)
    }

    fn flush_pending(&mut self) -> Result<(), EngineError> {
        let now = self.clock.now();
        let decisions = self.recorder.flush_all();
        self.apply_decisions(decisions, now)?;
        Ok(())
    }

    /// Carries out recorder decisions in order. Returns the nodes touched.
    fn apply_decisions(
        &mut self,
        decisions: Vec<Decision>,
        now: Timestamp,
    ) -> Result<Vec<HistoryNodeId>, EngineError> {
        let mut touched = Vec::new();
        for decision in decisions {
            let node = match decision {
                Decision::Append(commit) => self.commit_append(commit, now)?,
                Decision::Coalesce { node, commit } => {
                    let is_current_leaf = node == self.current
                        && self.graph.get(node).is_ok_and(|n| n.is_leaf());
                    if is_current_leaf {
                        Some(self.commit_coalesce(node, commit, now)?)
                    } else {
                        self.commit_append(commit, now)?
                    }
                }
            };
            touched.extend(node);
        }
        if !touched.is_empty() {
            self.after_commit()?;
        }
        Ok(touched)
    }

    fn commit_append(
        &mut self,
        commit: Commit,
        now: Timestamp,
    ) -> Result<Option<HistoryNodeId>, EngineError> {
        // Pan/zoom lives in metadata, so an unchanged graph is expected there.
        if commit.is_continuous() && *commit.action() != ActionType::Viewport {
            let before = self.store.content_hash(self.current_snapshot()?)?;
            if hash_state(&commit.state) == before {
                tracing::debug!(
                    "discarding {} gesture of {} event(s) that changed nothing",
                    commit.action(),
                    commit.event_count
                );
                return Ok(None);
            }
        }

        let snapshot = self.store.store(&commit.state);
        let Commit {
            key,
            metadata,
            opened_at,
            event_count,
            ..
        } = commit;
        let node = self.append_node(key.action.clone(), metadata, snapshot, opened_at)?;
        if event_count > 1 {
            tracing::debug!("{} folded {} event(s) into {}", key.action, event_count, node);
        }
        self.recorder.note_commit(key, node, now);
        Ok(Some(node))
    }

    fn commit_coalesce(
        &mut self,
        node: HistoryNodeId,
        commit: Commit,
        now: Timestamp,
    ) -> Result<HistoryNodeId, EngineError> {
        let snapshot = self.store.store(&commit.state);
        self.graph
            .amend(node, snapshot, commit.metadata)
            .map_err(invariant_broken)?;
        self.store.compact(&self.graph.snapshot_refs());
        tracing::debug!("coalesced {} into {}", commit.key.action, node);
        self.recorder.note_commit(commit.key, node, now);
        Ok(node)
    }

    fn append_node(
        &mut self,
        action: ActionType,
        metadata: Metadata,
        snapshot: SnapshotRef,
        timestamp: Timestamp,
    ) -> Result<HistoryNodeId, EngineError> {
        let parent = self.current;
        let branching = !self.graph.get(parent).map_err(invariant_broken)?.is_leaf();
        let node = self
            .graph
            .append(parent, action.clone(), metadata, snapshot, timestamp)
            .map_err(invariant_broken)?;
        self.current = node;
        if branching {
            tracing::debug!("recorded {} as {} (new branch under {})", action, node, parent);
        } else {
            tracing::debug!("recorded {} as {}", action, node);
        }
        Ok(node)
    }

    fn after_commit(&mut self) -> Result<(), EngineError> {
        self.compact_if_needed()?;
        self.publish()
    }

    fn compact_if_needed(&mut self) -> Result<(), EngineError> {
        if !self.config.enable_compression {
            return Ok(());
        }
        let plan = compaction::plan(
            &self.graph,
            self.current,
            self.config.max_history_size,
            self.config.compaction_lookahead,
        )
        .map_err(invariant_broken)?;
        let Some(plan) = plan else {
            return Ok(());
        };

        let removed = self
            .graph
            .retain(plan.new_root, &plan.keep)
            .map_err(invariant_broken)?;
        let released = self.store.compact(&self.graph.snapshot_refs());
        let graph = &self.graph;
        let dropped = self.checkpoints.retain_nodes(|id| graph.contains(id));
        tracing::info!(
            "compacted history: pruned {} node(s), released {} snapshot(s), {} node(s) retained",
            removed.len(),
            released,
            self.graph.len()
        );
        if !dropped.is_empty() {
            tracing::info!("dropped checkpoint(s) on pruned nodes: {}", dropped.join(", "));
        }
        Ok(())
    }

    /// Restores `target`'s snapshot into the host and moves the pointer.
    ///
    /// Nothing changes if the snapshot cannot be resolved.
    fn move_to(&mut self, target: HistoryNodeId) -> Result<(), EngineError> {
        let snapshot = self.graph.get(target).map_err(invariant_broken)?.snapshot;
        let resolved = self.store.resolve(snapshot).and_then(|state| {
            let hash = self.store.content_hash(snapshot)?;
            Ok((state, hash))
        });
        let (state, hash) = match resolved {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!("cannot restore {}: {}", target, err);
                return Err(err.into());
            }
        };

        self.host.set_nodes(&state.nodes);
        self.host.set_edges(&state.edges);
        self.current = target;
        self.echo = Some((hash, self.clock.now()));
        self.recorder.forget_last_commit();
        Ok(())
    }

    fn view(&self) -> Result<HistoryView, EngineError> {
        let path = self
            .graph
            .path_from_root(self.current)
            .map_err(invariant_broken)?;
        let ahead = self
            .graph
            .preferred_chain(self.current, usize::MAX)
            .map_err(invariant_broken)?;

        let current_index = path.len() - 1;
        let entries: Vec<HistoryEntry> = path
            .into_iter()
            .map(|node| HistoryEntry::from_node(node, self.current))
            .collect();
        let ahead = ahead
            .into_iter()
            .map(|id| {
                self.graph
                    .get(id)
                    .map(|node| HistoryEntry::from_node(node, self.current))
                    .map_err(invariant_broken)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryView {
            can_undo: current_index > 0,
            can_redo: !ahead.is_empty(),
            entries,
            current_index,
            ahead,
        })
    }

    fn publish(&mut self) -> Result<(), EngineError> {
        let view = self.view()?;
        self.host.history_changed(&view);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::host::SessionHost;
    use revtree_core::BranchPolicy;
    use serde_json::json;

    type Controller = HistoryController<SessionHost>;

    fn meta(id: &str) -> Metadata {
        json!({ "id": id }).as_object().unwrap().clone()
    }

    fn setup(config: HistoryConfig) -> (Controller, ManualClock) {
        let clock = ManualClock::new();
        let controller = HistoryController::with_parts(
            config,
            SessionHost::new(GraphState::empty()),
            InMemorySnapshotStore::new(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        (controller, clock)
    }

    fn add_node(c: &mut Controller, id: &str) -> HistoryNodeId {
        c.host_mut().edit(|g| g.nodes.push(json!({ "id": id })));
        c.record_action(ActionType::NodeAdd, meta(id)).unwrap().unwrap()
    }

    fn set_label(c: &mut Controller, id: &str, label: &str) {
        c.host_mut().edit(|g| {
            for node in g.nodes.iter_mut() {
                if node["id"] == json!(id) {
                    node["label"] = json!(label);
                }
            }
        });
    }

    #[test]
    fn init_publishes_root_timeline() {
        let (c, _) = setup(HistoryConfig::default());
        let view = c.host().last_view.clone().unwrap();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.current_index, 0);
        assert!(!view.can_undo);
        assert!(!view.can_redo);
        assert_eq!(view.entries[0].action, ActionType::Init);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = HistoryConfig {
            max_history_size: 1,
            ..HistoryConfig::default()
        };
        let err = HistoryController::new(config, SessionHost::default()).err().unwrap();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn navigation_at_the_ends_is_a_no_op() {
        let (mut c, _) = setup(HistoryConfig::default());
        assert!(!c.undo().unwrap());
        assert!(!c.redo().unwrap());
        assert_eq!(c.host().restores, 0);
    }

    #[test]
    fn undo_restores_previous_state_into_host() {
        let (mut c, _) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        add_node(&mut c, "n2");

        assert!(c.undo().unwrap());
        assert_eq!(c.host().live.nodes, vec![json!({ "id": "n1" })]);
        assert!(c.redo().unwrap());
        assert_eq!(c.host().live.node_count(), 2);
        assert_eq!(c.host().restores, 2);
    }

    #[test]
    fn echo_of_applied_snapshot_is_ignored_once() {
        let (mut c, _) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        c.undo().unwrap();
        let before = c.graph().len();

        // Host re-syncs and reports the state it was just given.
        let echoed = c.record_action(ActionType::NodeUpdate, Metadata::new()).unwrap();
        assert!(echoed.is_none());
        assert_eq!(c.graph().len(), before);

        // The guard only swallows one recording.
        let again = c.record_action(ActionType::NodeUpdate, Metadata::new()).unwrap();
        assert!(again.is_some());
    }

    #[test]
    fn echo_guard_lapses_once_the_clock_moves() {
        let (mut c, clock) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        c.undo().unwrap();
        clock.advance(5);

        let recorded = c.record_action(ActionType::NodeUpdate, meta("n1")).unwrap();
        assert!(recorded.is_some());
        assert_eq!(c.graph().len(), 3);
    }

    #[test]
    fn tick_disarms_echo_guard() {
        let (mut c, _) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        c.undo().unwrap();
        c.tick().unwrap();

        let recorded = c.record_action(ActionType::NodeUpdate, Metadata::new()).unwrap();
        assert!(recorded.is_some());
    }

    #[test]
    fn rapid_discrete_edits_merge_into_one_entry() {
        let (mut c, clock) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        clock.advance(40);
        let started = clock.now();

        set_label(&mut c, "n1", "a");
        let first = c.record_action_debounced(ActionType::NodeUpdate, meta("n1")).unwrap();
        clock.advance(100);
        set_label(&mut c, "n1", "ab");
        let second = c.record_action_debounced(ActionType::NodeUpdate, meta("n1")).unwrap();

        assert_eq!(first, second);
        assert_eq!(c.graph().len(), 3);
        let node = c.graph().get(second[0]).unwrap();
        // The merged entry keeps the time of the first edit.
        assert_eq!(node.timestamp, started);
        let state = c.store().resolve(node.snapshot).unwrap();
        assert_eq!(state.nodes[0]["label"], json!("ab"));
        // The superseded payload is released.
        assert_eq!(c.store().len(), 3);
    }

    #[test]
    fn merging_stops_after_navigation() {
        let (mut c, clock) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        set_label(&mut c, "n1", "a");
        c.record_action_debounced(ActionType::NodeUpdate, meta("n1")).unwrap();
        c.undo().unwrap();
        c.redo().unwrap();

        clock.advance(50);
        set_label(&mut c, "n1", "b");
        c.record_action_debounced(ActionType::NodeUpdate, meta("n1")).unwrap();
        assert_eq!(c.graph().len(), 4);
    }

    #[test]
    fn drag_back_to_start_records_nothing() {
        let (mut c, clock) = setup(HistoryConfig::default());
        c.host_mut().edit(|g| g.nodes.push(json!({ "id": "n1", "x": 0 })));
        c.record_action(ActionType::NodeAdd, meta("n1")).unwrap();

        for x in [5, 10, 5, 0] {
            c.host_mut().edit(|g| g.nodes[0]["x"] = json!(x));
            c.record_action_debounced(ActionType::NodeMove, meta("n1")).unwrap();
            clock.advance(10);
        }
        clock.advance(1000);
        assert!(!c.tick().unwrap());
        assert_eq!(c.graph().len(), 2);
        assert!(!c.has_pending());
    }

    #[test]
    fn undo_commits_pending_drag_first() {
        let (mut c, _) = setup(HistoryConfig::default());
        let n1 = add_node(&mut c, "n1");
        c.host_mut().edit(|g| g.nodes[0]["x"] = json!(40));
        c.record_action_debounced(ActionType::NodeMove, meta("n1")).unwrap();
        assert!(c.has_pending());

        assert!(c.undo().unwrap());
        assert_eq!(c.current_id(), n1);
        assert!(c.get_history().unwrap().can_redo);
    }

    #[test]
    fn checkpoints_label_and_restore_nodes() {
        let (mut c, _) = setup(HistoryConfig::default());
        let n1 = add_node(&mut c, "n1");
        c.create_checkpoint("first", Some("one node")).unwrap();
        add_node(&mut c, "n2");

        let dup = c.create_checkpoint("first", None).unwrap_err();
        assert!(matches!(dup, EngineError::CheckpointExists(_)));

        assert!(c.restore_checkpoint("first").unwrap());
        assert_eq!(c.current_id(), n1);
        assert_eq!(c.graph().get(n1).unwrap().label.as_deref(), Some("first"));
        assert_eq!(c.list_checkpoints().len(), 1);

        c.delete_checkpoint("first").unwrap();
        assert!(c.graph().get(n1).unwrap().label.is_none());
        let missing = c.restore_checkpoint("first").unwrap_err();
        assert!(matches!(missing, EngineError::CheckpointNotFound(_)));
    }

    #[test]
    fn jump_to_unknown_node_fails() {
        let (mut c, _) = setup(HistoryConfig::default());
        let err = c.jump_to(HistoryNodeId::new()).unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NodeNotFound { .. })));
    }

    #[test]
    fn select_branch_changes_redo_target() {
        let (mut c, _) = setup(HistoryConfig::default());
        let n1 = add_node(&mut c, "n1");
        let b = add_node(&mut c, "b");
        c.undo().unwrap();
        c.host_mut().edit(|g| g.nodes.push(json!({ "id": "c" })));
        let cnode = c.record_action(ActionType::NodeAdd, meta("c")).unwrap().unwrap();
        c.undo().unwrap();
        assert_eq!(c.current_id(), n1);

        assert!(c.select_branch(b).unwrap());
        c.redo().unwrap();
        assert_eq!(c.current_id(), b);
        assert_ne!(c.current_id(), cnode);
        assert!(!c.select_branch(c.graph().root_id()).unwrap());
    }

    #[test]
    fn last_visited_policy_redoes_into_the_branch_just_left() {
        let (mut c, _) = setup(HistoryConfig {
            branch_policy: BranchPolicy::LastVisited,
            ..HistoryConfig::default()
        });
        add_node(&mut c, "n1");
        let b = add_node(&mut c, "b");
        c.undo().unwrap();
        c.host_mut().edit(|g| g.nodes.push(json!({ "id": "c" })));
        c.record_action(ActionType::NodeAdd, meta("c")).unwrap();

        c.jump_to(b).unwrap();
        c.undo().unwrap();
        c.redo().unwrap();
        assert_eq!(c.current_id(), b);
    }

    #[test]
    fn clear_history_rebases_on_live_state() {
        let (mut c, _) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        add_node(&mut c, "n2");
        c.create_checkpoint("cp", None).unwrap();

        c.clear_history().unwrap();
        assert_eq!(c.graph().len(), 1);
        assert!(c.list_checkpoints().is_empty());
        assert_eq!(c.store().len(), 1);
        let root = c.graph().get(c.current_id()).unwrap();
        assert_eq!(root.action, ActionType::Clear);
        assert_eq!(c.store().resolve(root.snapshot).unwrap().node_count(), 2);
        assert!(!c.undo().unwrap());
    }

    #[test]
    fn dispose_flushes_and_rejects_further_calls() {
        let (mut c, _) = setup(HistoryConfig::default());
        add_node(&mut c, "n1");
        c.host_mut().edit(|g| g.nodes[0]["x"] = json!(7));
        c.record_action_debounced(ActionType::NodeMove, meta("n1")).unwrap();

        c.dispose().unwrap();
        assert!(c.is_disposed());
        assert_eq!(c.graph().len(), 3);
        assert!(matches!(c.undo(), Err(EngineError::Disposed)));
        assert!(matches!(c.get_history(), Err(EngineError::Disposed)));
        c.dispose().unwrap();
    }

    #[test]
    fn compaction_drops_checkpoints_on_pruned_nodes() {
        let (mut c, _) = setup(HistoryConfig {
            max_history_size: 3,
            compaction_lookahead: 0,
            ..HistoryConfig::default()
        });
        add_node(&mut c, "n1");
        c.create_checkpoint("early", None).unwrap();
        for i in 2..6 {
            add_node(&mut c, &format!("n{}", i));
        }
        assert_eq!(c.graph().len(), 3);
        assert!(c.list_checkpoints().is_empty());
        assert_eq!(c.store().len(), 3);
        c.graph().check_invariants().unwrap();
    }
}
