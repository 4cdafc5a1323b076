//! Demo entry point: replays a scripted filter session over synthetic cells

use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{info, warn};

use cs_core::events::events::{FilterRejected, SelectionRecomputed};
use cs_core::events::handler_from_fn;
use cs_core::filter::{DimensionRegistry, LinearScale, LogInterval};
use cs_core::{
    ControlsStore, EngineConfig, EngineContext, Pipeline, RecordStore, ScreenTransform, SelectionEngine,
    TracingMiddleware,
};
use cs_data::index::IndexedInterceptor;
use cs_data::{store_from_batch, SchemaDetector};

mod demo;

/// Side length of the square plot the brush coordinates refer to
const CANVAS_SIZE: f64 = 500.0;

fn load_config() -> Result<EngineConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            Ok(EngineConfig::from_json_str(&json)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Fit the embedding extent onto the canvas, y axis pointing down
fn canvas_transform(store: &RecordStore) -> ScreenTransform {
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for c in store.iter().filter_map(|r| r.coords) {
        min_x = min_x.min(c.x);
        max_x = max_x.max(c.x);
        min_y = min_y.min(c.y);
        max_y = max_y.max(c.y);
    }
    if min_x > max_x {
        return ScreenTransform::default();
    }
    ScreenTransform::new(
        Arc::new(LinearScale::new((min_x, max_x), (0.0, CANVAS_SIZE))),
        Arc::new(LinearScale::new((min_y, max_y), (CANVAS_SIZE, 0.0))),
    )
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting cell selection demo");

    let config = load_config()?;
    let batch = demo::demo_batch(2_000)?;
    info!("Demo batch:\n{}", arrow::util::pretty::pretty_format_batches(&[batch.slice(0, 5)])?);

    let schema = SchemaDetector::from_config(&config).detect(&batch)?;
    info!("Detected schema: {:?}", schema);
    let store = store_from_batch(&batch, &schema)?;

    let context = EngineContext {
        transform: canvas_transform(&store),
        dimensions: DimensionRegistry::new().with("nCount", Arc::new(LogInterval)),
        config,
    };
    let controls = ControlsStore::new(
        Pipeline::new()
            .with(TracingMiddleware)
            .with(IndexedInterceptor::new(SelectionEngine::new(context))),
    );

    let bus = controls.event_bus();
    bus.subscribe::<SelectionRecomputed>(handler_from_fn(|event| {
        if let Some(e) = event.as_any().downcast_ref::<SelectionRecomputed>() {
            info!("[v{}] {}: {}/{} cells selected", e.version, e.event_kind, e.selected, e.total);
        }
    }));
    bus.subscribe::<FilterRejected>(handler_from_fn(|event| {
        if let Some(e) = event.as_any().downcast_ref::<FilterRejected>() {
            warn!("{} ignored: {}", e.event_kind, e.reason);
        }
    }));

    controls.load_dataset(store);

    for action in demo::demo_session() {
        let dispatched = controls.dispatch_json(action);
        if !dispatched.is_augmented() && dispatched.rejection.is_none() {
            info!("Forwarded '{}' unchanged", dispatched.action.kind().unwrap_or("<untyped>"));
        }
    }

    if let Some(summary) = controls.summary() {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
