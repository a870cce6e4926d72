//! Wire shape of a traversal result as handed over by the impact-traversal engine.

use crate::error::AttributionError;
use crate::store::{ActivityRef, Uid};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub uid: Uid,
    pub activity: ActivityRef,
    pub depth: u32,
    pub supply_amount: f64,
    pub direct_emissions_score: f64,
    #[serde(default)]
    pub direct_emissions_score_outside_specific_flows: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    pub producer: Uid,
    pub consumer: Uid,
}

/// Nodes and edges of one traversal, in the order the engine emitted them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTraversal {
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

impl RawTraversal {
    pub fn from_json_str(json: &str) -> Result<Self, AttributionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AttributionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AttributionError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}
