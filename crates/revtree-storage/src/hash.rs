//! Deterministic content hashing for graph states using blake3.
//!
//! Hashes are derived state used for deduplication and no-op detection;
//! they are never handed to the host.
//!
//! # Determinism
//!
//! The hash input is the state's canonical JSON: `serde_json::Map` sorts
//! object keys, so equal payloads always produce equal bytes. That only
//! holds while no crate in the build enables serde_json's `preserve_order`
//! feature, which keeps insertion order instead; the key-order test below
//! fails if that ever happens. Node and edge order is significant, matching
//! how the host renders its arrays.

use revtree_core::GraphState;

/// Canonical JSON encoding of a state.
pub fn canonical_bytes(state: &GraphState) -> Vec<u8> {
    serde_json::to_vec(state).expect("GraphState serialization should never fail")
}

/// Computes a blake3 hash of a state's nodes and edges.
///
/// The two lists are hashed with a separator so that moving an element
/// from one list to the other changes the hash.
pub fn hash_state(state: &GraphState) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"nodes");
    for node in &state.nodes {
        let bytes = serde_json::to_vec(node).expect("node serialization should never fail");
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    hasher.update(b"edges");
    for edge in &state.edges {
        let bytes = serde_json::to_vec(edge).expect("edge serialization should never fail");
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_states_hash_equal() {
        let a = GraphState::new(vec![json!({"id": "n1", "x": 1})], vec![]);
        let b = GraphState::new(vec![json!({"x": 1, "id": "n1"})], vec![]);
        assert_eq!(hash_state(&a), hash_state(&b));
    }

    #[test]
    fn moved_node_changes_hash() {
        let a = GraphState::new(vec![json!({"id": "n1", "x": 1})], vec![]);
        let b = GraphState::new(vec![json!({"id": "n1", "x": 2})], vec![]);
        assert_ne!(hash_state(&a), hash_state(&b));
    }

    #[test]
    fn list_membership_is_significant() {
        let as_node = GraphState::new(vec![json!({"id": "e1"})], vec![]);
        let as_edge = GraphState::new(vec![], vec![json!({"id": "e1"})]);
        assert_ne!(hash_state(&as_node), hash_state(&as_edge));
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let state = GraphState::new(vec![json!({"b": 2, "a": 1})], vec![]);
        let text = String::from_utf8(canonical_bytes(&state)).unwrap();
        assert_eq!(text, r#"{"nodes":[{"a":1,"b":2}],"edges":[]}"#);
    }
}
