//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};

/// Configuration for the selection engine and its indexed variant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject toggles, constraints and brushes that reference unknown
    /// fields or malformed bounds instead of tolerating them
    pub strict_fields: bool,

    /// Spatial index settings
    pub index: IndexConfig,

    /// Columns with at most this many distinct values are treated as
    /// categorical during schema detection
    pub categorical_max_distinct: usize,
}

/// Spatial index settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Side length of one grid bucket, in screen units
    pub grid_cell_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_fields: true,
            index: IndexConfig::default(),
            categorical_max_distinct: 64,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 32.0,
        }
    }
}

impl EngineConfig {
    /// Tolerant configuration: unknown references are accepted silently
    pub fn lenient() -> Self {
        Self {
            strict_fields: false,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON, filling omitted keys with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SelectionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let cell = self.index.grid_cell_size;
        if !cell.is_finite() || cell <= 0.0 {
            return Err(SelectionError::Config(format!(
                "grid_cell_size must be a positive number, got {}",
                cell
            )));
        }
        if self.categorical_max_distinct == 0 {
            return Err(SelectionError::Config(
                "categorical_max_distinct must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{"strict_fields": false}"#).unwrap();
        assert!(!config.strict_fields);
        assert_eq!(config.index.grid_cell_size, 32.0);
        assert_eq!(config.categorical_max_distinct, 64);
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        let err = EngineConfig::from_json_str(r#"{"index": {"grid_cell_size": 0}}"#).unwrap_err();
        assert!(matches!(err, SelectionError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(EngineConfig::from_json_str("{not json").is_err());
    }
}
