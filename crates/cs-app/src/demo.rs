//! Demo dataset: synthetic cells laid out in a few embedding clusters

use std::sync::Arc;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use anyhow::Result;

const TISSUES: [&str; 4] = ["brain", "liver", "lung", "kidney"];

/// Build a batch of `count` synthetic cells
pub fn demo_batch(count: usize) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("CellName", DataType::Utf8, false),
        Field::new("tissue", DataType::Utf8, false),
        Field::new("cluster", DataType::Int64, false),
        Field::new("nCount", DataType::Float64, false),
        Field::new("percent_mito", DataType::Float64, false),
        Field::new("umap_x", DataType::Float64, true),
        Field::new("umap_y", DataType::Float64, true),
    ]));

    let mut names = Vec::with_capacity(count);
    let mut tissues = Vec::with_capacity(count);
    let mut clusters = Vec::with_capacity(count);
    let mut counts = Vec::with_capacity(count);
    let mut mito = Vec::with_capacity(count);
    let mut xs = Vec::with_capacity(count);
    let mut ys = Vec::with_capacity(count);

    for i in 0..count {
        let idx = i as f64;
        let noise = (idx * 12345.6789).sin(); // Pseudo-random in [-1, 1]
        let tissue = i % TISSUES.len();
        let cluster = (i * 7 / 3) % 6;

        names.push(format!("cell_{:05}", i));
        tissues.push(TISSUES[tissue]);
        clusters.push(cluster as i64);
        counts.push(2000.0 + 1500.0 * noise + 250.0 * tissue as f64);
        mito.push(0.02 + 0.015 * (idx * 0.37).cos().abs());

        // every 50th cell has no embedding position
        if i % 50 == 49 {
            xs.push(None);
            ys.push(None);
        } else {
            let angle = cluster as f64 * std::f64::consts::TAU / 6.0;
            xs.push(Some(angle.cos() * 5.0 + noise));
            ys.push(Some(angle.sin() * 5.0 + (idx * 0.731).sin()));
        }
    }

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(names)),
        Arc::new(StringArray::from(tissues)),
        Arc::new(Int64Array::from(clusters)),
        Arc::new(Float64Array::from(counts)),
        Arc::new(Float64Array::from(mito)),
        Arc::new(Float64Array::from(xs)),
        Arc::new(Float64Array::from(ys)),
    ];

    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Scripted filter session, in dispatch order
pub fn demo_session() -> Vec<serde_json::Value> {
    use serde_json::json;

    vec![
        json!({"type": "spatial-brush-change",
               "brush": {"northwestX": 100, "northwestY": 100, "southeastX": 420, "southeastY": 420}}),
        json!({"type": "categorical-deselect", "field": "tissue", "value": "liver"}),
        json!({"type": "continuous-brush-change",
               "constraints": [{"dimension": "nCount", "extent": {"min": 1000, "max": 3000}}]}),
        json!({"type": "resize-panel", "width": 640}),
        json!({"type": "categorical-only-this", "field": "cluster", "value": 2}),
        json!({"type": "categorical-select", "field": "tissue", "value": "pancreas"}),
        json!({"type": "spatial-brush-clear"}),
    ]
}
