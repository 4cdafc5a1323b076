//! Conversion of an Arrow batch into a record store

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use cs_core::{CategoricalValue, Record, RecordKey, RecordStore};
use tracing::info;

use crate::schema::DatasetSchema;
use crate::{DataError, Result};

/// A categorical column widened to one of four representations
enum CategoricalColumn {
    Text(StringArray),
    Int(Int64Array),
    Float(Float64Array),
    Bool(BooleanArray),
}

impl CategoricalColumn {
    fn from_array(name: &str, array: &ArrayRef) -> Result<Self> {
        let column = match array.data_type() {
            DataType::Boolean => CategoricalColumn::Bool(array.as_boolean().clone()),
            dt if dt.is_integer() => {
                let widened = cast(array, &DataType::Int64)?;
                CategoricalColumn::Int(widened.as_primitive::<Int64Type>().clone())
            }
            dt if dt.is_floating() => CategoricalColumn::Float(float_values(array)?),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Dictionary(_, _) => {
                let text = cast(array, &DataType::Utf8)?;
                CategoricalColumn::Text(text.as_string::<i32>().clone())
            }
            other => {
                return Err(DataError::UnsupportedColumnType {
                    column: name.to_string(),
                    data_type: other.to_string(),
                })
            }
        };
        Ok(column)
    }

    fn value(&self, row: usize) -> Option<CategoricalValue> {
        match self {
            CategoricalColumn::Text(a) => (!a.is_null(row)).then(|| CategoricalValue::Text(a.value(row).to_string())),
            CategoricalColumn::Int(a) => (!a.is_null(row)).then(|| CategoricalValue::Int(a.value(row))),
            CategoricalColumn::Float(a) => (!a.is_null(row)).then(|| CategoricalValue::Float(a.value(row))),
            CategoricalColumn::Bool(a) => (!a.is_null(row)).then(|| CategoricalValue::Bool(a.value(row))),
        }
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))
}

fn float_values(array: &ArrayRef) -> Result<Float64Array> {
    let widened = cast(array, &DataType::Float64)?;
    Ok(widened.as_primitive::<Float64Type>().clone())
}

fn key_for(keys: Option<&ArrayRef>, row: usize) -> Result<RecordKey> {
    let Some(keys) = keys else {
        return Ok(RecordKey::Int(row as i64));
    };
    if keys.is_null(row) {
        return Err(DataError::SchemaDetection(format!("null identity key at row {}", row)));
    }
    match keys.data_type() {
        dt if dt.is_integer() => Ok(RecordKey::Int(keys.as_primitive::<Int64Type>().value(row))),
        _ => Ok(RecordKey::Text(keys.as_string::<i32>().value(row).to_string())),
    }
}

/// Build a record store from a batch.
///
/// Nulls become absent attributes: a null categorical or continuous cell is
/// left out of the record, and a null in either embedding column leaves the
/// record unmapped.
pub fn store_from_batch(batch: &RecordBatch, schema: &DatasetSchema) -> Result<RecordStore> {
    let keys = match &schema.key_column {
        Some(name) => {
            let raw = column(batch, name)?;
            let target = if raw.data_type().is_integer() { DataType::Int64 } else { DataType::Utf8 };
            Some(cast(raw, &target)?)
        }
        None => None,
    };

    let mut categorical = Vec::with_capacity(schema.categorical.len());
    for name in &schema.categorical {
        categorical.push((name.as_str(), CategoricalColumn::from_array(name, column(batch, name)?)?));
    }

    let mut continuous = Vec::with_capacity(schema.continuous.len());
    for name in &schema.continuous {
        continuous.push((name.as_str(), float_values(column(batch, name)?)?));
    }

    let embedding = match &schema.embedding {
        Some((x, y)) => Some((float_values(column(batch, x)?)?, float_values(column(batch, y)?)?)),
        None => None,
    };

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let mut record = Record::new(key_for(keys.as_ref(), row)?);

        for (name, values) in &categorical {
            if let Some(value) = values.value(row) {
                record.categorical.insert(name.to_string(), value);
            }
        }
        for (name, values) in &continuous {
            if !values.is_null(row) {
                record.continuous.insert(name.to_string(), values.value(row));
            }
        }
        if let Some((xs, ys)) = &embedding {
            if !xs.is_null(row) && !ys.is_null(row) {
                record = record.at(xs.value(row), ys.value(row));
            }
        }

        records.push(record);
    }

    let store = RecordStore::new(records)?;
    info!(
        "Converted batch of {} rows ({} categorical, {} continuous columns)",
        store.len(),
        categorical.len(),
        continuous.len()
    );
    Ok(store)
}
