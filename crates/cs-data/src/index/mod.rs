//! Indexed, incremental selection
//!
//! [`IndexedSelectionEngine`] keeps one cached mask per filter axis. A filter
//! event only rebuilds the mask of the axis it touches; the final selection is
//! the intersection of the cached masks. Categorical masks come from an
//! inverted index (value -> rows) and spatial masks from a uniform grid over
//! precomputed screen positions.

use std::sync::Arc;

use ahash::AHashMap;
use cs_core::action::{Dispatched, FilterEvent};
use cs_core::filter::{continuous_ok, BrushRect, FilterState, ScreenPoint, ScreenTransform};
use cs_core::pipeline::Middleware;
use cs_core::{Controls, Recomputation, RecordStore, SelectionEngine, SelectionError, SelectionResult};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Uniform grid over screen positions
struct SpatialGrid {
    cell_size: f64,
    buckets: AHashMap<(i64, i64), Vec<usize>>,
}

impl SpatialGrid {
    fn build(points: &[Option<ScreenPoint>], cell_size: f64) -> Self {
        let mut grid = Self {
            cell_size,
            buckets: AHashMap::new(),
        };
        for (row, point) in points.iter().enumerate() {
            if let Some(p) = point.filter(|p| p.x.is_finite() && p.y.is_finite()) {
                let bucket = grid.bucket_of(p);
                grid.buckets.entry(bucket).or_insert_with(Vec::new).push(row);
            }
        }
        grid
    }

    fn bucket_of(&self, p: ScreenPoint) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    /// Rows in every bucket the brush overlaps
    fn candidates(&self, brush: &BrushRect) -> Vec<usize> {
        let (x0, y0) = self.bucket_of(brush.northwest());
        let (x1, y1) = self.bucket_of(brush.southeast());
        if x1 < x0 || y1 < y0 {
            return Vec::new();
        }

        let span = (x1 as i128 - x0 as i128 + 1) * (y1 as i128 - y0 as i128 + 1);
        if span > self.buckets.len() as i128 {
            // cheaper to walk the occupied buckets than the covered ones
            return self
                .buckets
                .iter()
                .filter(|((bx, by), _)| (x0..=x1).contains(bx) && (y0..=y1).contains(by))
                .flat_map(|(_, rows)| rows.iter().copied())
                .collect();
        }

        let mut rows = Vec::new();
        for bx in x0..=x1 {
            for by in y0..=y1 {
                if let Some(bucket) = self.buckets.get(&(bx, by)) {
                    rows.extend_from_slice(bucket);
                }
            }
        }
        rows
    }
}

/// Inverted categorical index plus spatial grid for one record store
pub struct SelectionIndex {
    category_rows: AHashMap<String, AHashMap<String, Vec<usize>>>,
    screen: Vec<Option<ScreenPoint>>,
    grid: SpatialGrid,
}

impl SelectionIndex {
    /// Index a store under the given screen transform
    pub fn build(store: &RecordStore, transform: &ScreenTransform, cell_size: f64) -> Self {
        let mut category_rows: AHashMap<String, AHashMap<String, Vec<usize>>> = AHashMap::new();
        for (row, record) in store.iter().enumerate() {
            for (field, value) in &record.categorical {
                category_rows
                    .entry(field.clone())
                    .or_default()
                    .entry(value.as_key().into_owned())
                    .or_insert_with(Vec::new)
                    .push(row);
            }
        }

        let screen: Vec<Option<ScreenPoint>> = store
            .iter()
            .map(|record| record.coords.map(|c| transform.project(c)))
            .collect();
        let grid = SpatialGrid::build(&screen, cell_size);

        debug!(
            "Indexed {} records: {} categorical fields, {} grid buckets",
            store.len(),
            category_rows.len(),
            grid.buckets.len()
        );

        Self {
            category_rows,
            screen,
            grid,
        }
    }

    /// Rows whose value for `field` is `value`
    pub fn rows_with(&self, field: &str, value: &str) -> &[usize] {
        self.category_rows
            .get(field)
            .and_then(|values| values.get(value))
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn screen_point(&self, row: usize) -> Option<ScreenPoint> {
        self.screen.get(row).copied().flatten()
    }

    /// Rows whose screen position lies inside the brush, ascending
    pub fn rows_in_brush(&self, brush: &BrushRect) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .grid
            .candidates(brush)
            .into_iter()
            .filter(|row| self.screen_point(*row).map(|p| brush.contains(p)).unwrap_or(false))
            .collect();
        rows.sort_unstable();
        rows
    }
}

/// Selection engine that rescans only the axis an event changes
pub struct IndexedSelectionEngine {
    engine: SelectionEngine,
    store: Arc<RecordStore>,
    index: SelectionIndex,
    filters: FilterState,
    spatial_mask: Option<Vec<bool>>,
    continuous_mask: Option<Vec<bool>>,
    categorical_mask: Option<Vec<bool>>,
}

impl IndexedSelectionEngine {
    /// Start from the unfiltered state of `store`
    pub fn new(engine: SelectionEngine, store: Arc<RecordStore>) -> Self {
        let filters = FilterState::for_store(&store);
        Self::with_filters(engine, store, filters)
    }

    /// Start from an existing filter state
    pub fn with_filters(engine: SelectionEngine, store: Arc<RecordStore>, filters: FilterState) -> Self {
        let context = engine.context();
        let index = SelectionIndex::build(&store, &context.transform, context.config.index.grid_cell_size);
        let mut indexed = Self {
            engine,
            store,
            index,
            filters,
            spatial_mask: None,
            continuous_mask: None,
            categorical_mask: None,
        };
        indexed.rebuild_masks();
        indexed
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn index(&self) -> &SelectionIndex {
        &self.index
    }

    /// Apply one filter event, rescanning only the affected axis
    pub fn apply(&mut self, event: &FilterEvent) -> Result<Recomputation, SelectionError> {
        let next = self.engine.next_filters(event, &self.filters, &self.store)?;

        match event {
            FilterEvent::SpatialBrushChange { .. } | FilterEvent::SpatialBrushClear => {
                self.spatial_mask = self.spatial_mask_for(&next);
            }
            FilterEvent::ContinuousBrushChange { .. } => {
                self.continuous_mask = self.continuous_mask_for(&next);
            }
            FilterEvent::CategoricalSelect { .. }
            | FilterEvent::CategoricalDeselect { .. }
            | FilterEvent::CategoricalOnlyThis { .. } => {
                self.categorical_mask = self.categorical_mask_for(&next);
            }
        }
        self.filters = next;

        let result = self.current();
        debug!(
            "Indexed recompute for '{}' (v{}): {}/{} selected",
            event.kind(),
            self.filters.version,
            result.selected_count(),
            self.store.len()
        );
        Ok(Recomputation {
            filters: self.filters.clone(),
            result,
        })
    }

    /// Re-project every record after the plot's screen transform changed
    pub fn reproject(&mut self, transform: ScreenTransform) {
        let mut context = self.engine.context().clone();
        context.transform = transform;
        self.index = SelectionIndex::build(&self.store, &context.transform, context.config.index.grid_cell_size);
        self.engine = SelectionEngine::new(context);
        self.spatial_mask = self.spatial_mask_for(&self.filters);
    }

    /// Intersection of the cached axis masks
    pub fn current(&self) -> SelectionResult {
        let masks: Vec<&Vec<bool>> = [&self.spatial_mask, &self.continuous_mask, &self.categorical_mask]
            .into_iter()
            .flatten()
            .collect();
        let mask: Vec<bool> = (0..self.store.len())
            .map(|row| masks.iter().all(|m| m[row]))
            .collect();
        SelectionResult::from_mask(&self.store, &mask, self.filters.categorical.clone())
    }

    fn rebuild_masks(&mut self) {
        self.spatial_mask = self.spatial_mask_for(&self.filters);
        self.continuous_mask = self.continuous_mask_for(&self.filters);
        self.categorical_mask = self.categorical_mask_for(&self.filters);
    }

    fn spatial_mask_for(&self, filters: &FilterState) -> Option<Vec<bool>> {
        filters.spatial.as_ref().map(|brush| {
            let mut mask = vec![false; self.store.len()];
            for row in self.index.rows_in_brush(brush) {
                mask[row] = true;
            }
            mask
        })
    }

    fn continuous_mask_for(&self, filters: &FilterState) -> Option<Vec<bool>> {
        if filters.continuous.is_empty() {
            return None;
        }
        let constraints = filters.continuous.constraints();
        let dimensions = &self.engine.context().dimensions;
        Some(
            self.store
                .iter()
                .map(|record| continuous_ok(record, constraints, dimensions))
                .collect(),
        )
    }

    fn categorical_mask_for(&self, filters: &FilterState) -> Option<Vec<bool>> {
        let inactive = filters.categorical.inactive_pairs();
        if inactive.is_empty() {
            return None;
        }
        let mut mask = vec![true; self.store.len()];
        for pair in inactive {
            for &row in self.index.rows_with(pair.field, pair.value) {
                mask[row] = false;
            }
        }
        Some(mask)
    }
}

/// Pipeline stage backed by an [`IndexedSelectionEngine`].
///
/// The cached engine is rebuilt whenever the controls hold a different
/// record store or a filter state it did not produce.
pub struct IndexedInterceptor {
    engine: SelectionEngine,
    cached: Mutex<Option<IndexedSelectionEngine>>,
}

impl IndexedInterceptor {
    pub fn new(engine: SelectionEngine) -> Self {
        Self {
            engine,
            cached: Mutex::new(None),
        }
    }
}

impl Middleware for IndexedInterceptor {
    fn handle(&self, dispatched: Dispatched, controls: &Controls) -> Dispatched {
        if dispatched.is_augmented() {
            return dispatched;
        }
        let Some(event) = dispatched.action.event() else {
            return dispatched;
        };
        let Some(store) = controls.records.as_ref() else {
            debug!("Dataset not loaded, passing '{}' through", event.kind());
            return dispatched;
        };

        let mut cached = self.cached.lock();
        let stale = cached
            .as_ref()
            .map(|indexed| !Arc::ptr_eq(indexed.store(), store) || indexed.filters() != &controls.filters)
            .unwrap_or(true);
        if stale {
            *cached = Some(IndexedSelectionEngine::with_filters(
                self.engine.clone(),
                store.clone(),
                controls.filters.clone(),
            ));
        }
        let Some(indexed) = cached.as_mut() else {
            return dispatched;
        };

        match indexed.apply(event) {
            Ok(recomputation) => Dispatched {
                recomputation: Some(recomputation),
                ..dispatched
            },
            Err(e) => {
                warn!("Rejected '{}': {}", event.kind(), e);
                Dispatched {
                    rejection: Some(e),
                    ..dispatched
                }
            }
        }
    }
}
