use std::collections::HashSet;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use cs_core::EngineConfig;
use tracing::debug;

use crate::{DataError, Result};

/// Which batch columns feed which part of a record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSchema {
    /// Identity column; row positions are used when absent
    pub key_column: Option<String>,
    pub categorical: Vec<String>,
    pub continuous: Vec<String>,
    /// (x, y) embedding columns
    pub embedding: Option<(String, String)>,
}

impl DatasetSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, column: impl Into<String>) -> Self {
        self.key_column = Some(column.into());
        self
    }

    pub fn with_categorical(mut self, column: impl Into<String>) -> Self {
        self.categorical.push(column.into());
        self
    }

    pub fn with_continuous(mut self, column: impl Into<String>) -> Self {
        self.continuous.push(column.into());
        self
    }

    pub fn with_embedding(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.embedding = Some((x.into(), y.into()));
        self
    }
}

/// Statistics about a column
#[derive(Debug, Clone)]
pub struct ColumnStats {
    pub null_count: usize,
    pub distinct_count: usize,
    pub is_unique: bool,
}

/// Schema detector for classifying batch columns
pub struct SchemaDetector {
    max_categorical_distinct: usize,
    embedding_candidates: Vec<(String, String)>,
}

impl SchemaDetector {
    /// Create a new schema detector
    pub fn new() -> Self {
        let embedding_candidates = [
            ("x", "y"),
            ("umap_x", "umap_y"),
            ("tsne_x", "tsne_y"),
            ("embedding_x", "embedding_y"),
        ]
        .iter()
        .map(|(x, y)| (x.to_string(), y.to_string()))
        .collect();

        Self {
            max_categorical_distinct: 64,
            embedding_candidates,
        }
    }

    /// Create a detector using the configured categorical threshold
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_max_categorical_distinct(config.categorical_max_distinct)
    }

    pub fn with_max_categorical_distinct(mut self, max: usize) -> Self {
        self.max_categorical_distinct = max;
        self
    }

    /// Try these embedding columns before the built-in names
    pub fn with_embedding_columns(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.embedding_candidates.insert(0, (x.into(), y.into()));
        self
    }

    /// Classify every column of a batch
    pub fn detect(&self, batch: &RecordBatch) -> Result<DatasetSchema> {
        let schema = batch.schema();
        let mut detected = DatasetSchema::new();

        detected.embedding = self
            .embedding_candidates
            .iter()
            .find(|(x, y)| {
                [x, y].iter().all(|name| {
                    schema
                        .field_with_name(name)
                        .map(|f| f.data_type().is_numeric())
                        .unwrap_or(false)
                })
            })
            .cloned();

        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            let name = field.name();
            let in_embedding = detected
                .embedding
                .as_ref()
                .map(|(x, y)| x == name || y == name)
                .unwrap_or(false);
            if in_embedding {
                continue;
            }

            let stats = Self::column_stats(column)?;

            if detected.key_column.is_none() && Self::is_good_key_column(field.data_type(), &stats) {
                detected.key_column = Some(name.clone());
                continue;
            }

            match field.data_type() {
                DataType::Boolean => detected.categorical.push(name.clone()),
                DataType::Utf8 | DataType::LargeUtf8 | DataType::Dictionary(_, _) => {
                    if stats.distinct_count <= self.max_categorical_distinct {
                        detected.categorical.push(name.clone());
                    } else {
                        debug!("Skipping high-cardinality text column '{}' ({} values)", name, stats.distinct_count);
                    }
                }
                dt if dt.is_integer() => {
                    if stats.distinct_count <= self.max_categorical_distinct {
                        detected.categorical.push(name.clone());
                    } else {
                        detected.continuous.push(name.clone());
                    }
                }
                dt if dt.is_floating() => detected.continuous.push(name.clone()),
                other => debug!("Skipping column '{}' of type {:?}", name, other),
            }
        }

        if detected.categorical.is_empty() && detected.continuous.is_empty() && detected.embedding.is_none() {
            return Err(DataError::SchemaDetection(
                "batch has no categorical, continuous or embedding columns".to_string(),
            ));
        }

        Ok(detected)
    }

    /// Null and distinct counts over the display form of each value
    pub fn column_stats(column: &ArrayRef) -> Result<ColumnStats> {
        let mut unique = HashSet::new();
        for row in 0..column.len() {
            if !column.is_null(row) {
                unique.insert(array_value_to_string(column, row)?);
            }
        }
        let null_count = column.null_count();
        Ok(ColumnStats {
            null_count,
            distinct_count: unique.len(),
            is_unique: unique.len() + null_count == column.len(),
        })
    }

    /// A text column with a distinct value on every row
    fn is_good_key_column(data_type: &DataType, stats: &ColumnStats) -> bool {
        matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
            && stats.null_count == 0
            && stats.is_unique
            && stats.distinct_count > 1
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("CellName", DataType::Utf8, false),
            Field::new("tissue", DataType::Utf8, false),
            Field::new("cluster", DataType::Int64, false),
            Field::new("nCount", DataType::Float64, true),
            Field::new("is_doublet", DataType::Boolean, false),
            Field::new("umap_x", DataType::Float64, true),
            Field::new("umap_y", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["c1", "c2", "c3", "c4"])) as ArrayRef,
                Arc::new(StringArray::from(vec!["brain", "liver", "brain", "lung"])),
                Arc::new(Int64Array::from(vec![1, 2, 1, 3])),
                Arc::new(Float64Array::from(vec![Some(10.0), None, Some(12.5), Some(3.0)])),
                Arc::new(BooleanArray::from(vec![false, false, true, false])),
                Arc::new(Float64Array::from(vec![Some(0.1), Some(0.2), None, Some(0.4)])),
                Arc::new(Float64Array::from(vec![Some(0.5), Some(0.6), None, Some(0.8)])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_detects_roles() {
        let detected = SchemaDetector::new().detect(&batch()).unwrap();

        assert_eq!(detected.key_column.as_deref(), Some("CellName"));
        assert_eq!(detected.categorical, vec!["tissue", "cluster", "is_doublet"]);
        assert_eq!(detected.continuous, vec!["nCount"]);
        assert_eq!(detected.embedding, Some(("umap_x".to_string(), "umap_y".to_string())));
    }

    #[test]
    fn test_threshold_moves_integers_to_continuous() {
        let detected = SchemaDetector::new()
            .with_max_categorical_distinct(2)
            .detect(&batch())
            .unwrap();

        assert_eq!(detected.categorical, vec!["is_doublet"]);
        assert_eq!(detected.continuous, vec!["cluster", "nCount"]);
    }

    #[test]
    fn test_column_stats() {
        let column: ArrayRef = Arc::new(Float64Array::from(vec![Some(1.0), None, Some(1.0)]));
        let stats = SchemaDetector::column_stats(&column).unwrap();
        assert_eq!(stats.null_count, 1);
        assert_eq!(stats.distinct_count, 1);
        assert!(!stats.is_unique);
    }
}
