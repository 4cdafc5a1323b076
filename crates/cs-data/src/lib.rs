//! Data bridging and indexing for the selection engine

pub mod convert;
pub mod index;
pub mod schema;

use arrow::error::ArrowError;
use cs_core::SelectionError;
use thiserror::Error;

// Re-exports
pub use convert::store_from_batch;
pub use index::{IndexedSelectionEngine, SelectionIndex};
pub use schema::{DatasetSchema, SchemaDetector};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Column '{0}' not found in batch")]
    MissingColumn(String),

    #[error("Column '{column}' has unsupported type {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },

    #[error("Schema detection error: {0}")]
    SchemaDetection(String),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
}

pub type Result<T> = std::result::Result<T, DataError>;
