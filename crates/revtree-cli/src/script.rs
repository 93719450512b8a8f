//! Edit scripts: a recorded editing session replayed through the controller.
//!
//! A script is a JSON object with an optional `initial` graph, an optional
//! `config` and a list of `steps`, each tagged by `op`:
//!
//! ```json
//! {
//!   "initial": { "nodes": [], "edges": [] },
//!   "steps": [
//!     { "op": "edit", "action": "node_add", "metadata": { "id": "n1" },
//!       "state": { "nodes": [{ "id": "n1" }] } },
//!     { "op": "advance", "ms": 400 },
//!     { "op": "tick" },
//!     { "op": "undo" },
//!     { "op": "jump", "index": 1 }
//!   ]
//! }
//! ```
//!
//! Time only moves on `advance` steps.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use revtree_core::{ActionType, GraphState, HistoryConfig, Metadata};
use revtree_engine::{
    CheckpointView, EngineError, HistoryController, HistoryView, ManualClock, SessionHost,
};
use revtree_storage::{InMemorySnapshotStore, SnapshotStore, StoreStats};

/// A recorded session.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub initial: GraphState,
    /// Overrides the configuration when no config file is given.
    #[serde(default)]
    pub config: Option<HistoryConfig>,
    pub steps: Vec<Step>,
}

/// One host interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// The editor changed its graph to `state` through `action`.
    Edit {
        action: ActionType,
        #[serde(default)]
        metadata: Metadata,
        state: GraphState,
        /// Route through debounce and coalescing instead of recording at once.
        #[serde(default)]
        debounced: bool,
    },
    Advance {
        ms: u64,
    },
    Tick,
    Undo,
    Redo,
    /// Jump by position into the path entries followed by the redo chain.
    Jump {
        index: usize,
    },
    Clear,
    Checkpoint {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    Restore {
        name: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Edit { .. } => "edit",
            Step::Advance { .. } => "advance",
            Step::Tick => "tick",
            Step::Undo => "undo",
            Step::Redo => "redo",
            Step::Jump { .. } => "jump",
            Step::Clear => "clear",
            Step::Checkpoint { .. } => "checkpoint",
            Step::Restore { .. } => "restore",
        }
    }
}

/// Errors that stop a replay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("step {step}: {reason}")]
    InvalidStep { step: usize, reason: String },

    #[error("controller published no timeline")]
    NoTimeline,
}

/// The timeline after one step, printed with `--trace`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTrace {
    pub step: usize,
    pub op: &'static str,
    /// Whether the step changed the tree or the pointer.
    pub changed: bool,
    pub history: HistoryView,
}

/// Final state of a replayed session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub history: HistoryView,
    pub checkpoints: Vec<CheckpointView>,
    pub retained_nodes: usize,
    pub store: StoreStats,
    pub live: GraphState,
}

/// Replays `script` against a fresh controller, reporting each step to
/// `on_step`. Pending gestures are committed when the script ends.
pub fn replay(
    script: Script,
    config: HistoryConfig,
    mut on_step: impl FnMut(StepTrace),
) -> Result<Report, ReplayError> {
    let clock = ManualClock::new();
    let mut controller = HistoryController::with_parts(
        config,
        SessionHost::new(script.initial),
        InMemorySnapshotStore::new(),
        Arc::new(clock.clone()),
    )?;

    for (index, step) in script.steps.into_iter().enumerate() {
        let op = step.name();
        let changed = apply_step(&mut controller, &clock, index, step)?;
        tracing::debug!("step {} ({}) changed={}", index, op, changed);
        on_step(StepTrace {
            step: index,
            op,
            changed,
            history: controller.get_history()?,
        });
    }

    let checkpoints = controller.list_checkpoints();
    controller.dispose()?;
    let history = controller
        .host()
        .last_view
        .clone()
        .ok_or(ReplayError::NoTimeline)?;

    Ok(Report {
        history,
        checkpoints,
        retained_nodes: controller.graph().len(),
        store: controller.store().stats(),
        live: controller.host().live.clone(),
    })
}

fn apply_step(
    controller: &mut HistoryController<SessionHost>,
    clock: &ManualClock,
    index: usize,
    step: Step,
) -> Result<bool, ReplayError> {
    let changed = match step {
        Step::Edit {
            action,
            metadata,
            state,
            debounced,
        } => {
            controller.host_mut().live = state;
            if debounced {
                !controller
                    .record_action_debounced(action, metadata)?
                    .is_empty()
            } else {
                controller.record_action(action, metadata)?.is_some()
            }
        }
        Step::Advance { ms } => {
            clock.advance(ms);
            false
        }
        Step::Tick => controller.tick()?,
        Step::Undo => controller.undo()?,
        Step::Redo => controller.redo()?,
        Step::Jump { index: entry } => {
            let view = controller.get_history()?;
            let target = view
                .timeline()
                .nth(entry)
                .map(|e| e.id)
                .ok_or_else(|| ReplayError::InvalidStep {
                    step: index,
                    reason: format!(
                        "timeline has {} entries, cannot jump to {}",
                        view.entries.len() + view.ahead.len(),
                        entry
                    ),
                })?;
            controller.jump_to(target)?
        }
        Step::Clear => {
            controller.clear_history()?;
            true
        }
        Step::Checkpoint { name, description } => {
            controller.create_checkpoint(&name, description.as_deref())?;
            true
        }
        Step::Restore { name } => controller.restore_checkpoint(&name)?,
    };
    Ok(changed)
}
