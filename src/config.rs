//! Analysis parameters handed over by the session layer.

use crate::error::AttributionError;
use crate::store::{ActivityRef, ScopeRule, Uid};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_sentinel() -> Uid { Uid(-1) }
fn default_cutoff() -> f64 { 0.01 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionConfig {
    #[serde(flatten)]
    pub scope_rule: ScopeRule,
    /// Virtual super-root emitted by the traversal engine. Never a real process.
    #[serde(default = "default_sentinel")]
    pub sentinel_uid: Uid,
    /// Cumulative-impact fraction below which the upstream traversal stops.
    /// Carried for the session layer; the core does not use it.
    #[serde(default = "default_cutoff")]
    pub traversal_cutoff: f64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            scope_rule: ScopeRule::default(),
            sentinel_uid: default_sentinel(),
            traversal_cutoff: default_cutoff(),
        }
    }
}

impl AttributionConfig {
    pub fn with_marker(marker: ActivityRef) -> Self {
        let mut config = Self::default();
        config.scope_rule.marker_activity = Some(marker);
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, AttributionError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AttributionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AttributionError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), AttributionError> {
        if !(self.traversal_cutoff > 0.0 && self.traversal_cutoff <= 1.0) {
            return Err(AttributionError::InvalidConfig(format!(
                "traversal_cutoff must lie in (0, 1], got {}",
                self.traversal_cutoff
            )));
        }
        if self.sentinel_uid == self.scope_rule.root_uid {
            return Err(AttributionError::InvalidConfig(format!(
                "sentinel uid {} collides with the root uid",
                self.sentinel_uid
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = AttributionConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AttributionConfig::default());
        assert_eq!(config.sentinel_uid, Uid(-1));
        assert_eq!(config.scope_rule.root_uid, Uid(0));
    }

    #[test]
    fn test_marker_is_read_flat() {
        let config = AttributionConfig::from_json_str(r#"{"marker_activity": 53, "traversal_cutoff": 0.05}"#).unwrap();
        assert_eq!(config.scope_rule.marker_activity, Some(ActivityRef(53)));
        assert_eq!(config.traversal_cutoff, 0.05);
    }

    #[test]
    fn test_invalid_cutoff_rejected() {
        let err = AttributionConfig::from_json_str(r#"{"traversal_cutoff": 0.0}"#).unwrap_err();
        assert!(matches!(err, AttributionError::InvalidConfig(_)));
    }

    #[test]
    fn test_sentinel_root_collision_rejected() {
        let err = AttributionConfig::from_json_str(r#"{"root_uid": -1}"#).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }
}
