//! Cell selection core
//!
//! Recomputes a per-record `selected` flag whenever a filter changes, by
//! AND-combining three independent filter axes: categorical toggles,
//! continuous range brushes and a 2-D spatial brush over the embedding.

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod pipeline;
pub mod record;
pub mod state;
pub mod summary;

// Re-export commonly used types
pub use action::{Action, Dispatched, FilterEvent};
pub use config::{EngineConfig, IndexConfig};
pub use engine::{AxisVerdict, CellSelection, EngineContext, Recomputation, SelectionEngine, SelectionResult};
pub use error::SelectionError;
pub use events::EventBus;
pub use filter::{BrushRect, FilterState, RangeConstraint, ScreenPoint, ScreenTransform};
pub use pipeline::{Middleware, Pipeline, SelectionInterceptor, TracingMiddleware};
pub use record::{CategoricalValue, EmbeddingCoord, Record, RecordKey, RecordStore};
pub use state::{Controls, ControlsStore};
pub use summary::SelectionSummary;
