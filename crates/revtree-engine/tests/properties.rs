//! Tree invariants under random operation sequences.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use revtree_core::{ActionType, BranchPolicy, CoreError, GraphState, HistoryConfig, Metadata};
use revtree_engine::{EngineError, HistoryController, ManualClock, SessionHost};
use revtree_storage::{InMemorySnapshotStore, SnapshotStore};

#[derive(Debug, Clone)]
enum Op {
    Add,
    Rename(u8),
    Drag(u8, i16),
    Advance(u16),
    Undo,
    Redo,
    Jump(usize),
    SelectBranch(usize),
    Checkpoint,
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Add),
        2 => any::<u8>().prop_map(Op::Rename),
        3 => (any::<u8>(), -50i16..50).prop_map(|(n, dx)| Op::Drag(n, dx)),
        2 => (0u16..800).prop_map(Op::Advance),
        4 => Just(Op::Undo),
        3 => Just(Op::Redo),
        1 => any::<usize>().prop_map(Op::Jump),
        1 => any::<usize>().prop_map(Op::SelectBranch),
        1 => Just(Op::Checkpoint),
        1 => Just(Op::Clear),
    ]
}

fn policy() -> impl Strategy<Value = BranchPolicy> {
    prop_oneof![Just(BranchPolicy::MostRecent), Just(BranchPolicy::LastVisited)]
}

fn target(g: &GraphState, seed: u8) -> Option<usize> {
    (!g.nodes.is_empty()).then(|| seed as usize % g.nodes.len())
}

proptest! {
    #[test]
    fn history_stays_a_tree(
        ops in prop::collection::vec(op(), 1..80),
        max in 2usize..12,
        lookahead in 0usize..4,
        branch_policy in policy(),
    ) {
        let clock = ManualClock::new();
        let config = HistoryConfig {
            max_history_size: max,
            compaction_lookahead: lookahead,
            position_debounce_ms: 100,
            action_separator_ms: 200,
            branch_policy,
            ..HistoryConfig::default()
        };
        let mut c = HistoryController::with_parts(
            config,
            SessionHost::new(GraphState::empty()),
            InMemorySnapshotStore::new(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        let mut next_id = 0u32;
        let mut checkpoints = 0u32;

        for op in ops {
            match op {
                Op::Add => {
                    next_id += 1;
                    let id = format!("n{}", next_id);
                    c.host_mut().edit(|g| g.nodes.push(json!({ "id": id, "x": 0 })));
                    let meta = json!({ "id": id }).as_object().unwrap().clone();
                    c.record_action(ActionType::NodeAdd, meta).unwrap();
                }
                Op::Rename(seed) => {
                    if let Some(i) = target(&c.host().live, seed) {
                        let id = c.host().live.nodes[i]["id"].clone();
                        c.host_mut().edit(|g| g.nodes[i]["label"] = json!(seed));
                        let meta = json!({ "id": id }).as_object().unwrap().clone();
                        c.record_action_debounced(ActionType::NodeUpdate, meta).unwrap();
                    }
                }
                Op::Drag(seed, dx) => {
                    if let Some(i) = target(&c.host().live, seed) {
                        let id = c.host().live.nodes[i]["id"].clone();
                        let x = c.host().live.nodes[i]["x"].as_i64().unwrap_or(0);
                        c.host_mut().edit(|g| g.nodes[i]["x"] = json!(x + dx as i64));
                        let meta = json!({ "id": id }).as_object().unwrap().clone();
                        c.record_action_debounced(ActionType::NodeMove, meta).unwrap();
                    }
                }
                Op::Advance(ms) => {
                    clock.advance(ms as u64);
                    c.tick().unwrap();
                }
                Op::Undo => {
                    if c.undo().unwrap() {
                        let snapshot = c.graph().get(c.current_id()).unwrap().snapshot;
                        let applied = c.store().resolve(snapshot).unwrap();
                        prop_assert_eq!(&c.host().live, applied.as_ref());
                    }
                }
                Op::Redo => {
                    c.redo().unwrap();
                }
                Op::Jump(seed) => {
                    let view = c.get_history().unwrap();
                    let ids: Vec<_> = view.timeline().map(|e| e.id).collect();
                    // A pending gesture flushed by the jump may compact the target away.
                    match c.jump_to(ids[seed % ids.len()]) {
                        Ok(_) | Err(EngineError::Core(CoreError::NodeNotFound { .. })) => {}
                        Err(err) => panic!("jump failed: {}", err),
                    }
                }
                Op::SelectBranch(seed) => {
                    let nodes: Vec<_> = c.graph().nodes().map(|n| n.id).collect();
                    c.select_branch(nodes[seed % nodes.len()]).unwrap();
                }
                Op::Checkpoint => {
                    checkpoints += 1;
                    c.create_checkpoint(&format!("cp{}", checkpoints), None).unwrap();
                }
                Op::Clear => {
                    c.clear_history().unwrap();
                }
            }

            prop_assert!(c.graph().check_invariants().is_ok());
            prop_assert!(c.graph().contains(c.current_id()));
            prop_assert!(c.graph().len() <= max + lookahead);

            let view = c.get_history().unwrap();
            prop_assert_eq!(view.current().map(|e| e.id), Some(c.current_id()));
            prop_assert_eq!(view.can_undo, view.current_index > 0);
            prop_assert_eq!(view.current_index, view.entries.len() - 1);
            prop_assert_eq!(view.can_redo, !view.ahead.is_empty());

            // Every retained node can still be restored.
            for node in c.graph().nodes() {
                prop_assert!(c.store().resolve(node.snapshot).is_ok());
            }
            for checkpoint in c.list_checkpoints() {
                prop_assert!(c.graph().contains(checkpoint.node));
            }
        }

        c.dispose().unwrap();
        prop_assert!(c.graph().check_invariants().is_ok());
    }
}

#[test]
fn metadata_is_passed_through_untouched() {
    let mut c = HistoryController::new(HistoryConfig::default(), SessionHost::default()).unwrap();
    let mut meta = Metadata::new();
    meta.insert("count".into(), json!(3));
    meta.insert("nested".into(), json!({ "ids": ["a", "b"] }));
    c.host_mut().edit(|g| g.nodes.push(json!({ "id": "a" })));
    let node = c.record_action(ActionType::Paste, meta.clone()).unwrap().unwrap();
    assert_eq!(c.graph().get(node).unwrap().metadata, meta);
}
