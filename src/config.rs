//! Engine configuration.
//!
//! The similarity threshold, snapshot budget and friends are policy
//! constants, not spec-fixed values; hosts tune them here. Defaults are
//! the ones exercised by the test suite.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid config: {field} = {value} ({reason})")]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum combined normalized edit distance for a fuzzy content
    /// match (0 = identical only).
    pub similarity_threshold: f64,
    /// Bounding-rect tolerance for the positional fallback, as a
    /// fraction of each dimension.
    pub rect_tolerance: f64,
    /// Byte budget for `htmlSnapshot` truncation.
    pub snapshot_budget_bytes: usize,
    /// Preferred ancestor depth for structural selectors; exceeded only
    /// when a shorter path is ambiguous.
    pub max_selector_depth: usize,
    /// Attributes treated as stable test ids, in preference order.
    pub test_id_attributes: Vec<String>,
    /// Context window (lines) around `lineNumber` for source-diff
    /// overlap.
    pub source_context_lines: u32,
    /// Non-fast-forward retries before the store gives up.
    pub max_push_retries: usize,
    /// Shadow-branch ref comment files live on.
    pub shadow_ref: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.2,
            rect_tolerance: 0.2,
            snapshot_budget_bytes: 2048,
            max_selector_depth: 5,
            test_id_attributes: vec![
                "data-testid".to_string(),
                "data-test-id".to_string(),
                "data-cy".to_string(),
            ],
            source_context_lines: 3,
            max_push_retries: 3,
            shadow_ref: "refs/heads/marginalia/comments".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn fail(field: &'static str, value: String, reason: &'static str) -> ConfigError {
            ConfigError { field, value, reason }
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(fail(
                "similarity_threshold",
                self.similarity_threshold.to_string(),
                "must be in (0, 1]",
            ));
        }
        if !(self.rect_tolerance > 0.0 && self.rect_tolerance <= 1.0) {
            return Err(fail(
                "rect_tolerance",
                self.rect_tolerance.to_string(),
                "must be in (0, 1]",
            ));
        }
        if self.snapshot_budget_bytes == 0 {
            return Err(fail("snapshot_budget_bytes", "0".into(), "must be non-zero"));
        }
        if self.max_selector_depth == 0 {
            return Err(fail("max_selector_depth", "0".into(), "must be non-zero"));
        }
        if self.max_push_retries == 0 {
            return Err(fail("max_push_retries", "0".into(), "must be non-zero"));
        }
        if !self.shadow_ref.starts_with("refs/") {
            return Err(fail(
                "shadow_ref",
                self.shadow_ref.clone(),
                "must be a fully qualified ref",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut config = Config::default();
        config.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
        config.similarity_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"similarity_threshold":0.3}"#).unwrap();
        assert!((config.similarity_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.snapshot_budget_bytes, 2048);
    }
}
