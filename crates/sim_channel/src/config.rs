//! Parameter tree handed to `DeliveryModel::configure`.
//!
//! The host owns a hierarchical key/value configuration store; delivery models
//! only consume a subtree of it. Required leaves are located by key-path
//! *suffix* (a key ending in `transmission_range` matches regardless of the
//! prefix the host mounted it under), and unknown keys are ignored so models
//! can share one subtree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One node of the configuration tree. A node is either a leaf carrying a
/// string value or a directory carrying children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigNode {
    /// Full key path, e.g. `/simulator/channel/transmission_range`.
    pub key: String,
    /// Leaf value; `None` for directories.
    #[serde(default)]
    pub value: Option<String>,
    /// Children; empty for leaves.
    #[serde(default)]
    pub nodes: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn is_dir(&self) -> bool {
        self.value.is_none()
    }
}

/// Configuration subtree passed to a delivery model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigTree {
    pub nodes: Vec<ConfigNode>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf; chainable, mainly for tests and embedded hosts.
    pub fn with_leaf(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.nodes.push(ConfigNode {
            key: key.into(),
            value: Some(value.into()),
            nodes: Vec::new(),
        });
        self
    }

    /// First direct-child leaf whose key path ends with `suffix`.
    ///
    /// Only direct children are scanned: the host is expected to hand each
    /// model the subtree its parameters live in.
    pub fn leaf_with_suffix(&self, suffix: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|node| !node.is_dir() && node.key.ends_with(suffix))
            .and_then(|node| node.value.as_deref())
    }
}

/// Errors reported by `DeliveryModel::configure`.
///
/// The CSMA/CA model aggregates every offending parameter name into one
/// `InvalidParameters`; the simpler models report the first missing name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{model}: required parameter {name} is missing from config")]
    MissingParameter {
        model: &'static str,
        name: &'static str,
    },

    #[error("{model}: parameter(s) missing or invalid: {names:?}")]
    InvalidParameters {
        model: &'static str,
        names: Vec<String>,
    },
}
