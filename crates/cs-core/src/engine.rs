//! Selection recomputation
//!
//! [`SelectionEngine::recompute`] is a pure function of
//! (event, prior filter state, record store) -> (next filter state, selection).
//! It first folds the event's delta into the prior state, then evaluates the
//! three filter axes over every record. Each axis only ever clears a record's
//! `selected` flag, so the axes are independent and their order is irrelevant.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::FilterEvent;
use crate::config::EngineConfig;
use crate::error::{Result, SelectionError};
use crate::filter::{
    categorical_ok, check_toggle, continuous, continuous_ok, spatial_ok, CategoricalFilterState,
    ContinuousFilterState, DimensionRegistry, FilterState, ScreenTransform,
};
use crate::record::{Record, RecordKey, RecordStore};

/// Collaborator-supplied inputs the engine reads but never owns
#[derive(Debug, Clone, Default)]
pub struct EngineContext {
    /// Embedding-to-screen transform of the plot the brush was drawn on
    pub transform: ScreenTransform,

    /// Comparison semantics per continuous dimension
    pub dimensions: DimensionRegistry,

    pub config: EngineConfig,
}

/// Selection flag for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSelection {
    pub identity_key: RecordKey,
    pub selected: bool,
}

/// Output of one recomputation, in record store order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    pub selection: Vec<CellSelection>,
    #[serde(rename = "categoricalFilterState")]
    pub categorical: CategoricalFilterState,
}

impl SelectionResult {
    /// Build a result from per-row flags
    pub fn from_mask(store: &RecordStore, mask: &[bool], categorical: CategoricalFilterState) -> Self {
        let selection = store
            .iter()
            .zip(mask.iter())
            .map(|(record, selected)| CellSelection {
                identity_key: record.key.clone(),
                selected: *selected,
            })
            .collect();
        Self { selection, categorical }
    }

    pub fn selected_count(&self) -> usize {
        self.selection.iter().filter(|c| c.selected).count()
    }

    pub fn is_selected(&self, key: &RecordKey) -> Option<bool> {
        self.selection
            .iter()
            .find(|c| &c.identity_key == key)
            .map(|c| c.selected)
    }

    pub fn mask(&self) -> Vec<bool> {
        self.selection.iter().map(|c| c.selected).collect()
    }
}

/// Next filter state together with the selection it produces
#[derive(Debug, Clone, PartialEq)]
pub struct Recomputation {
    pub filters: FilterState,
    pub result: SelectionResult,
}

/// Per-axis verdict for a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisVerdict {
    pub spatial: bool,
    pub continuous: bool,
    pub categorical: bool,
}

impl AxisVerdict {
    pub fn selected(&self) -> bool {
        self.spatial && self.continuous && self.categorical
    }
}

/// Stateless recomputation engine
#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    context: EngineContext,
}

impl SelectionEngine {
    pub fn new(context: EngineContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Fold an event into the prior filter state and evaluate it
    pub fn recompute(&self, event: &FilterEvent, prior: &FilterState, store: &RecordStore) -> Result<Recomputation> {
        let filters = self.next_filters(event, prior, store)?;
        let result = self.evaluate(&filters, store);
        debug!(
            "Recomputed selection for '{}' (v{}): {}/{} selected",
            event.kind(),
            filters.version,
            result.selected_count(),
            store.len()
        );
        Ok(Recomputation { filters, result })
    }

    /// Merge an event's delta into the prior state. Only the axis the event
    /// targets changes; the other two are carried over.
    pub fn next_filters(&self, event: &FilterEvent, prior: &FilterState, store: &RecordStore) -> Result<FilterState> {
        let strict = self.context.config.strict_fields;
        let mut next = prior.clone();
        next.version = prior.version + 1;

        match event {
            FilterEvent::SpatialBrushChange { brush } => {
                next.spatial = Some(brush.checked(strict)?);
            }
            FilterEvent::SpatialBrushClear => {
                next.spatial = None;
            }
            FilterEvent::ContinuousBrushChange { constraints } => {
                let checked = constraints
                    .iter()
                    .map(|c| {
                        if strict && !store.has_continuous_field(&c.dimension) {
                            return Err(SelectionError::UnknownDimension(c.dimension.clone()));
                        }
                        continuous::checked_constraint(c, strict)
                    })
                    .collect::<Result<Vec<_>>>()?;
                next.continuous = ContinuousFilterState::new(checked);
            }
            FilterEvent::CategoricalSelect { .. }
            | FilterEvent::CategoricalDeselect { .. }
            | FilterEvent::CategoricalOnlyThis { .. } => {
                if let Some(toggle) = event.categorical_toggle() {
                    if strict {
                        check_toggle(&toggle, store)?;
                    }
                    next.categorical = prior.categorical.apply(&toggle);
                }
            }
        }

        Ok(next)
    }

    /// Evaluate a filter state over the whole store
    pub fn evaluate(&self, filters: &FilterState, store: &RecordStore) -> SelectionResult {
        let mut mask = vec![true; store.len()];

        if let Some(brush) = &filters.spatial {
            for (selected, record) in mask.iter_mut().zip(store.iter()) {
                if !spatial_ok(record.coords, brush, &self.context.transform) {
                    *selected = false;
                }
            }
        }

        if !filters.continuous.is_empty() {
            let constraints = filters.continuous.constraints();
            for (selected, record) in mask.iter_mut().zip(store.iter()) {
                if !continuous_ok(record, constraints, &self.context.dimensions) {
                    *selected = false;
                }
            }
        }

        let inactive = filters.categorical.inactive_pairs();
        if !inactive.is_empty() {
            for (selected, record) in mask.iter_mut().zip(store.iter()) {
                if !categorical_ok(record, &inactive) {
                    *selected = false;
                }
            }
        }

        SelectionResult::from_mask(store, &mask, filters.categorical.clone())
    }

    /// Each axis's verdict for one record, evaluated independently
    pub fn verdict(&self, record: &Record, filters: &FilterState) -> AxisVerdict {
        AxisVerdict {
            spatial: filters
                .spatial
                .as_ref()
                .map(|brush| spatial_ok(record.coords, brush, &self.context.transform))
                .unwrap_or(true),
            continuous: continuous_ok(record, filters.continuous.constraints(), &self.context.dimensions),
            categorical: categorical_ok(record, &filters.categorical.inactive_pairs()),
        }
    }
}
