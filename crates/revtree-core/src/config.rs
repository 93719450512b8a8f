//! Engine configuration.
//!
//! [`HistoryConfig`] is deserialized from the host's camelCase config object
//! (every key optional) or overlaid from `REVTREE_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which child `redo` follows when a node has several branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPolicy {
    /// The most recently created child. Older branches are reached by jumping.
    #[default]
    MostRecent,
    /// Like `MostRecent`, but undoing out of a child (or jumping through it)
    /// also makes it the preferred child, so redo retraces the last visit.
    LastVisited,
}

/// Recognized engine options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Node count above which compaction runs.
    pub max_history_size: usize,
    /// Quiet period that closes a drag or pan/zoom gesture.
    pub position_debounce_ms: u64,
    /// Window in which repeats of one discrete action on one target merge.
    pub action_separator_ms: u64,
    /// Whether pan/zoom produce history entries at all.
    pub enable_viewport_tracking: bool,
    /// Whether compaction runs once `max_history_size` is exceeded.
    pub enable_compression: bool,
    /// Redo-chain nodes ahead of current that compaction always keeps.
    pub compaction_lookahead: usize,
    pub branch_policy: BranchPolicy,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_history_size: 100,
            position_debounce_ms: 300,
            action_separator_ms: 1000,
            enable_viewport_tracking: false,
            enable_compression: true,
            compaction_lookahead: 10,
            branch_policy: BranchPolicy::MostRecent,
        }
    }
}

impl HistoryConfig {
    /// Parses a JSON config object; absent keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: HistoryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with any `REVTREE_*` environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by env var name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = HistoryConfig::default();
        if let Some(v) = lookup("REVTREE_MAX_HISTORY_SIZE") {
            config.max_history_size = parse_var("REVTREE_MAX_HISTORY_SIZE", &v)?;
        }
        if let Some(v) = lookup("REVTREE_POSITION_DEBOUNCE_MS") {
            config.position_debounce_ms = parse_var("REVTREE_POSITION_DEBOUNCE_MS", &v)?;
        }
        if let Some(v) = lookup("REVTREE_ACTION_SEPARATOR_MS") {
            config.action_separator_ms = parse_var("REVTREE_ACTION_SEPARATOR_MS", &v)?;
        }
        if let Some(v) = lookup("REVTREE_ENABLE_VIEWPORT_TRACKING") {
            config.enable_viewport_tracking = parse_var("REVTREE_ENABLE_VIEWPORT_TRACKING", &v)?;
        }
        if let Some(v) = lookup("REVTREE_ENABLE_COMPRESSION") {
            config.enable_compression = parse_var("REVTREE_ENABLE_COMPRESSION", &v)?;
        }
        if let Some(v) = lookup("REVTREE_COMPACTION_LOOKAHEAD") {
            config.compaction_lookahead = parse_var("REVTREE_COMPACTION_LOOKAHEAD", &v)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the engine cannot honor.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_history_size < 2 {
            return Err(CoreError::InvalidConfig {
                reason: format!(
                    "maxHistorySize must be at least 2, got {}",
                    self.max_history_size
                ),
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CoreError> {
    value.trim().parse().map_err(|_| CoreError::InvalidConfig {
        reason: format!("{} has invalid value '{}'", key, value),
    })
}
