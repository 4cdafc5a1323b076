//! Error types for selection recomputation

use thiserror::Error;

/// Errors raised while building filter state or record stores
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Unknown categorical field '{0}'")]
    UnknownCategoricalField(String),

    #[error("Unknown value '{value}' for categorical field '{field}'")]
    UnknownCategoricalValue { field: String, value: String },

    #[error("Unknown continuous dimension '{0}'")]
    UnknownDimension(String),

    #[error("Invalid extent [{min}, {max}] for dimension '{dimension}'")]
    InvalidExtent { dimension: String, min: f64, max: f64 },

    #[error("Invalid brush rectangle: {0}")]
    InvalidBrush(String),

    #[error("Duplicate record key '{0}'")]
    DuplicateKey(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SelectionError>;
