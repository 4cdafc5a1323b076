//! Records ("cells") and the read-only record store

use std::borrow::Cow;
use std::fmt;

use ahash::AHashMap;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};

/// Stable identity of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(v) => write!(f, "{}", v),
            RecordKey::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        RecordKey::Text(s.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        RecordKey::Text(s)
    }
}

impl From<i64> for RecordKey {
    fn from(v: i64) -> Self {
        RecordKey::Int(v)
    }
}

/// A categorical metadata value.
///
/// Values of different representations compare through their canonical
/// string form, so `Int(3)`, `Float(3.0)` and `Text("3")` all match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoricalValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CategoricalValue {
    /// Canonical string form used for every categorical comparison
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            CategoricalValue::Text(s) => Cow::Borrowed(s.as_str()),
            CategoricalValue::Int(v) => Cow::Owned(v.to_string()),
            CategoricalValue::Float(v) => Cow::Owned(format_number(*v)),
            CategoricalValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }
}

impl fmt::Display for CategoricalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<&str> for CategoricalValue {
    fn from(s: &str) -> Self {
        CategoricalValue::Text(s.to_string())
    }
}

impl From<String> for CategoricalValue {
    fn from(s: String) -> Self {
        CategoricalValue::Text(s)
    }
}

impl From<i64> for CategoricalValue {
    fn from(v: i64) -> Self {
        CategoricalValue::Int(v)
    }
}

impl From<f64> for CategoricalValue {
    fn from(v: f64) -> Self {
        CategoricalValue::Float(v)
    }
}

impl From<bool> for CategoricalValue {
    fn from(b: bool) -> Self {
        CategoricalValue::Bool(b)
    }
}

/// Integral floats render without a fractional part ("3", not "3.0")
fn format_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let s = if v > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if v == 0.0 {
        "0".to_string()
    } else if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

/// Position of a record in embedding space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingCoord {
    pub x: f64,
    pub y: f64,
}

/// One filterable entity
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Identity key, unique within a store
    pub key: RecordKey,

    /// Categorical field name -> value
    pub categorical: IndexMap<String, CategoricalValue>,

    /// Continuous field name -> value
    pub continuous: IndexMap<String, f64>,

    /// Embedding coordinate, absent when the record is unmapped
    pub coords: Option<EmbeddingCoord>,
}

impl Record {
    pub fn new(key: impl Into<RecordKey>) -> Self {
        Self {
            key: key.into(),
            categorical: IndexMap::new(),
            continuous: IndexMap::new(),
            coords: None,
        }
    }

    pub fn with_category(mut self, field: impl Into<String>, value: impl Into<CategoricalValue>) -> Self {
        self.categorical.insert(field.into(), value.into());
        self
    }

    pub fn with_value(mut self, field: impl Into<String>, value: f64) -> Self {
        self.continuous.insert(field.into(), value);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.coords = Some(EmbeddingCoord { x, y });
        self
    }

    /// Canonical string of this record's value for a categorical field
    pub fn category_key(&self, field: &str) -> Option<Cow<'_, str>> {
        self.categorical.get(field).map(CategoricalValue::as_key)
    }
}

/// Ordered, immutable collection of records loaded for a session
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
    rows_by_key: AHashMap<RecordKey, usize>,
    categories: IndexMap<String, IndexSet<String>>,
    continuous_fields: IndexSet<String>,
}

impl RecordStore {
    /// Build a store, rejecting duplicate identity keys
    pub fn new(records: Vec<Record>) -> Result<Self> {
        let mut rows_by_key = AHashMap::with_capacity(records.len());
        let mut categories: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut continuous_fields = IndexSet::new();

        for (row, record) in records.iter().enumerate() {
            if rows_by_key.insert(record.key.clone(), row).is_some() {
                return Err(SelectionError::DuplicateKey(record.key.to_string()));
            }
            for (field, value) in &record.categorical {
                categories
                    .entry(field.clone())
                    .or_default()
                    .insert(value.as_key().into_owned());
            }
            for field in record.continuous.keys() {
                if !continuous_fields.contains(field) {
                    continuous_fields.insert(field.clone());
                }
            }
        }

        Ok(Self {
            records,
            rows_by_key,
            categories,
            continuous_fields,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Row position of a record by its key
    pub fn row_of(&self, key: &RecordKey) -> Option<usize> {
        self.rows_by_key.get(key).copied()
    }

    /// Every categorical field with its observed values, in first-seen order
    pub fn categories(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.categories
    }

    pub fn has_categorical_value(&self, field: &str, value: &str) -> bool {
        self.categories
            .get(field)
            .map(|values| values.contains(value))
            .unwrap_or(false)
    }

    pub fn continuous_fields(&self) -> &IndexSet<String> {
        &self.continuous_fields
    }

    pub fn has_continuous_field(&self, field: &str) -> bool {
        self.continuous_fields.contains(field)
    }
}
