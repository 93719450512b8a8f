//! Action classification, debouncing and coalescing.
//!
//! [`ActionRecorder`] sits between the host's raw change events and the
//! history tree. It never touches the tree itself: every call returns the
//! [`Decision`]s the controller must carry out, in commit order.
//!
//! # Policies
//!
//! - **Continuous** actions (node drag, pan/zoom) open a debounce window.
//!   Further events with the same action and target rearm the window's
//!   timer and replace its state; the window commits once
//!   `position_debounce_ms` passes without another event, or earlier when
//!   something else arrives.
//! - **Discrete** actions commit at once. A repeat of the same action on the
//!   same target within `action_separator_ms` of the previous commit merges
//!   into that commit instead of creating a new entry.
//! - Unknown actions are discrete and never merge.

use revtree_core::{
    target_from_metadata, ActionClass, ActionType, GraphState, HistoryConfig, HistoryNodeId,
    Metadata, Timestamp,
};

use crate::timer::{TimerHandle, TimerQueue};

/// A change reported by the host editor.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub action: ActionType,
    /// The entity the change applies to, used to keep coalescing per-target.
    pub target: Option<String>,
    pub metadata: Metadata,
    /// Editor state after the change.
    pub state: GraphState,
}

impl RawEvent {
    /// Builds an event, deriving the target from `metadata`.
    pub fn new(action: ActionType, metadata: Metadata, state: GraphState) -> Self {
        let target = target_from_metadata(&metadata);
        RawEvent {
            action,
            target,
            metadata,
            state,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    fn key(&self) -> WindowKey {
        WindowKey {
            action: self.action.clone(),
            target: self.target.clone(),
        }
    }
}

/// Identity used for debounce windows and coalescing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub action: ActionType,
    pub target: Option<String>,
}

/// A history entry ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub key: WindowKey,
    pub metadata: Metadata,
    /// Latest state seen for this entry.
    pub state: GraphState,
    /// Arrival time of the first event folded into this entry.
    pub opened_at: Timestamp,
    /// How many raw events this entry absorbed.
    pub event_count: u32,
}

impl Commit {
    fn open(event: RawEvent, now: Timestamp) -> Self {
        Commit {
            key: event.key(),
            metadata: event.metadata,
            state: event.state,
            opened_at: now,
            event_count: 1,
        }
    }

    pub fn action(&self) -> &ActionType {
        &self.key.action
    }

    pub fn is_continuous(&self) -> bool {
        self.key.action.class() == ActionClass::Continuous
    }
}

/// What the controller must do with the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Append a new node under the current one.
    Append(Commit),
    /// Replace the snapshot of `node` (the previous commit for this key).
    /// Only valid while `node` is still the current leaf; otherwise append.
    Coalesce { node: HistoryNodeId, commit: Commit },
}

#[derive(Debug)]
struct PendingWindow {
    timer: TimerHandle,
    commit: Commit,
}

#[derive(Debug)]
struct LastCommit {
    key: WindowKey,
    node: HistoryNodeId,
    at: Timestamp,
}

/// Timing knobs taken from [`HistoryConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderSettings {
    pub position_debounce_ms: u64,
    pub action_separator_ms: u64,
    pub enable_viewport_tracking: bool,
}

impl From<&HistoryConfig> for RecorderSettings {
    fn from(config: &HistoryConfig) -> Self {
        RecorderSettings {
            position_debounce_ms: config.position_debounce_ms,
            action_separator_ms: config.action_separator_ms,
            enable_viewport_tracking: config.enable_viewport_tracking,
        }
    }
}

/// Converts noisy host events into discrete history commits.
#[derive(Debug)]
pub struct ActionRecorder {
    settings: RecorderSettings,
    timers: TimerQueue<WindowKey>,
    pending: Option<PendingWindow>,
    last_commit: Option<LastCommit>,
}

impl ActionRecorder {
    pub fn new(settings: RecorderSettings) -> Self {
        ActionRecorder {
            settings,
            timers: TimerQueue::new(),
            pending: None,
            last_commit: None,
        }
    }

    /// Applies new timing knobs. A window already open keeps its deadline.
    pub fn set_settings(&mut self, settings: RecorderSettings) {
        self.settings = settings;
    }

    /// Whether a continuous gesture is waiting to commit.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending window will close if nothing else arrives.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    /// Single ingress for host events.
    pub fn submit(&mut self, event: RawEvent, now: Timestamp) -> Vec<Decision> {
        let mut decisions = self.poll(now);

        match event.action.class() {
            ActionClass::Continuous => {
                if event.action == ActionType::Viewport && !self.settings.enable_viewport_tracking {
                    tracing::trace!("viewport tracking disabled, dropping event");
                    return decisions;
                }

                let key = event.key();
                let deadline = now.plus_ms(self.settings.position_debounce_ms);
                if let Some(pending) = self.pending.as_mut().filter(|p| p.commit.key == key) {
                    pending.commit.state = event.state;
                    pending.commit.metadata = event.metadata;
                    pending.commit.event_count += 1;
                    self.timers.rearm(pending.timer, deadline);
                    return decisions;
                }

                decisions.extend(self.flush_all());
                let timer = self.timers.schedule(deadline, key);
                self.pending = Some(PendingWindow {
                    timer,
                    commit: Commit::open(event, now),
                });
                tracing::trace!("opened debounce window closing at {}", deadline);
            }
            ActionClass::Discrete => {
                decisions.extend(self.flush_all());
                let commit = Commit::open(event, now);
                match self.coalesce_target(&commit.key, now) {
                    Some(node) => decisions.push(Decision::Coalesce { node, commit }),
                    None => decisions.push(Decision::Append(commit)),
                }
            }
        }

        decisions
    }

    /// Closes the pending window if its deadline has passed.
    pub fn poll(&mut self, now: Timestamp) -> Vec<Decision> {
        let due = self.timers.pop_due(now);
        let expired = match &self.pending {
            Some(pending) => due.iter().any(|(handle, _)| *handle == pending.timer),
            None => false,
        };
        match self.pending.take() {
            Some(pending) if expired => vec![Decision::Append(pending.commit)],
            other => {
                self.pending = other;
                Vec::new()
            }
        }
    }

    /// Commits the pending window now, regardless of its deadline.
    pub fn flush_all(&mut self) -> Vec<Decision> {
        match self.pending.take() {
            Some(pending) => {
                self.timers.cancel(pending.timer);
                vec![Decision::Append(pending.commit)]
            }
            None => Vec::new(),
        }
    }

    /// Tells the recorder which node a commit for `key` landed in.
    pub fn note_commit(&mut self, key: WindowKey, node: HistoryNodeId, at: Timestamp) {
        self.last_commit = Some(LastCommit { key, node, at });
    }

    /// Stops the next discrete event from merging into an earlier commit.
    pub fn forget_last_commit(&mut self) {
        self.last_commit = None;
    }

    /// Flushes the pending window and cancels every timer.
    pub fn shutdown(&mut self) -> Vec<Decision> {
        let decisions = self.flush_all();
        let cancelled = self.timers.clear();
        if cancelled > 0 {
            tracing::debug!("cancelled {} orphaned timer(s) on shutdown", cancelled);
        }
        self.last_commit = None;
        decisions
    }

    fn coalesce_target(&self, key: &WindowKey, now: Timestamp) -> Option<HistoryNodeId> {
        if !key.action.is_coalescable() || key.target.is_none() {
            return None;
        }
        let last = self.last_commit.as_ref()?;
        (last.key == *key && now.since(last.at) <= self.settings.action_separator_ms)
            .then_some(last.node)
    }
}
