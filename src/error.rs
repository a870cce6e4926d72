//! Error type shared by every pipeline stage.
use crate::store::Uid;
use thiserror::Error;

/// Which half of an override a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideField {
    SupplyAmount,
    BurdenIntensity,
}

impl std::fmt::Display for OverrideField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideField::SupplyAmount => f.write_str("supply amount"),
            OverrideField::BurdenIntensity => f.write_str("burden intensity"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributionError {
    /// The traversal result cannot form a rooted tree. Discard it and re-run the traversal.
    #[error("Malformed traversal at node {uid}: {detail}")]
    MalformedTraversal { uid: Uid, detail: String },
    #[error("Traversal has no root node {0}")]
    MissingRoot(Uid),
    #[error("Cycle detected while resolving the branch of node {uid} (no root within {limit} steps)")]
    CycleDetected { uid: Uid, limit: usize },
    /// Recoverable: the tree may have been recomputed since the edit was captured.
    #[error("Override targets unknown node {0}; ignored")]
    UnknownOverrideTarget(Uid),
    /// Recoverable: the offending half of the override is ignored.
    #[error("Override of {field} for node {uid} is not a finite non-negative number ({value}); ignored")]
    InvalidOverrideValue { uid: Uid, field: OverrideField, value: f64 },
    #[error("Branch index does not match node table at node {uid}")]
    InconsistentSnapshot { uid: Uid },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to decode input: {0}")]
    Parse(String),
}

impl AttributionError {
    /// Whether the pipeline may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AttributionError::UnknownOverrideTarget(_) | AttributionError::InvalidOverrideValue { .. })
    }
}

impl From<serde_json::Error> for AttributionError {
    fn from(e: serde_json::Error) -> Self {
        AttributionError::Parse(e.to_string())
    }
}
