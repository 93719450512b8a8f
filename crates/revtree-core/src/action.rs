//! Action kinds recorded in the history tree.
//!
//! The set of actions is owned by the host editor. The engine knows a few
//! well-known kinds so it can classify them as discrete or continuous; any
//! other name passes through as [`ActionType::Other`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Metadata;

/// Metadata keys consulted, in order, to find the entity an action targets.
pub const TARGET_KEYS: [&str; 3] = ["target", "id", "nodeId"];

/// The action that produced a history node.
///
/// Serialized as a snake_case string, e.g. `"node_add"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    /// Root of a fresh session.
    Init,
    /// Root created by clearing history.
    Clear,
    NodeAdd,
    NodeDelete,
    NodeUpdate,
    EdgeAdd,
    EdgeDelete,
    /// Node dragging. Continuous.
    NodeMove,
    Paste,
    /// Pan or zoom. Continuous.
    Viewport,
    /// Any host-defined action the engine does not know.
    Other(String),
}

/// How the recorder treats an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    /// Committed on arrival, possibly merged into the previous entry.
    Discrete,
    /// Debounced into one entry per gesture.
    Continuous,
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Init => "init",
            ActionType::Clear => "clear",
            ActionType::NodeAdd => "node_add",
            ActionType::NodeDelete => "node_delete",
            ActionType::NodeUpdate => "node_update",
            ActionType::EdgeAdd => "edge_add",
            ActionType::EdgeDelete => "edge_delete",
            ActionType::NodeMove => "node_move",
            ActionType::Paste => "paste",
            ActionType::Viewport => "viewport",
            ActionType::Other(name) => name,
        }
    }

    pub fn class(&self) -> ActionClass {
        match self {
            ActionType::NodeMove | ActionType::Viewport => ActionClass::Continuous,
            _ => ActionClass::Discrete,
        }
    }

    /// Whether rapid repeats of this action on one target may merge.
    ///
    /// Unknown actions never merge: over-recording beats losing an edit.
    pub fn is_coalescable(&self) -> bool {
        !matches!(
            self,
            ActionType::Other(_) | ActionType::Init | ActionType::Clear
        )
    }
}

impl From<String> for ActionType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "init" => ActionType::Init,
            "clear" => ActionType::Clear,
            "node_add" => ActionType::NodeAdd,
            "node_delete" => ActionType::NodeDelete,
            "node_update" => ActionType::NodeUpdate,
            "edge_add" => ActionType::EdgeAdd,
            "edge_delete" => ActionType::EdgeDelete,
            "node_move" => ActionType::NodeMove,
            "paste" => ActionType::Paste,
            "viewport" => ActionType::Viewport,
            _ => ActionType::Other(name),
        }
    }
}

impl From<&str> for ActionType {
    fn from(name: &str) -> Self {
        ActionType::from(name.to_string())
    }
}

impl From<ActionType> for String {
    fn from(action: ActionType) -> Self {
        match action {
            ActionType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ActionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ActionType::from(s))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the entity an action targets, if its metadata names one.
///
/// String values are used as-is; numbers are rendered to strings.
pub fn target_from_metadata(metadata: &Metadata) -> Option<String> {
    TARGET_KEYS.iter().find_map(|key| match metadata.get(*key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_names_parse_to_variants() {
        assert_eq!(ActionType::from("node_add"), ActionType::NodeAdd);
        assert_eq!(ActionType::from("viewport"), ActionType::Viewport);
        assert_eq!(
            ActionType::from("group_nodes"),
            ActionType::Other("group_nodes".into())
        );
    }

    #[test]
    fn serializes_as_snake_case_string() {
        let json = serde_json::to_value(ActionType::EdgeDelete).unwrap();
        assert_eq!(json, json!("edge_delete"));
        let other: ActionType = serde_json::from_value(json!("rename")).unwrap();
        assert_eq!(other.to_string(), "rename");
    }

    #[test]
    fn classification() {
        assert_eq!(ActionType::NodeMove.class(), ActionClass::Continuous);
        assert_eq!(ActionType::Viewport.class(), ActionClass::Continuous);
        assert_eq!(ActionType::NodeAdd.class(), ActionClass::Discrete);
        let unknown = ActionType::Other("mystery".into());
        assert_eq!(unknown.class(), ActionClass::Discrete);
        assert!(!unknown.is_coalescable());
        assert!(ActionType::NodeUpdate.is_coalescable());
    }

    #[test]
    fn target_lookup_order() {
        let meta = json!({ "id": "n1", "target": "n2" });
        let meta = meta.as_object().unwrap();
        assert_eq!(target_from_metadata(meta), Some("n2".into()));

        let meta = json!({ "nodeId": 42 });
        assert_eq!(
            target_from_metadata(meta.as_object().unwrap()),
            Some("42".into())
        );

        let meta = json!({ "count": 3 });
        assert_eq!(target_from_metadata(meta.as_object().unwrap()), None);
    }
}
