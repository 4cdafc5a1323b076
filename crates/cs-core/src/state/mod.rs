use std::sync::Arc;
use parking_lot::RwLock;
use tracing::info;

use crate::action::{Action, Dispatched};
use crate::engine::{SelectionEngine, SelectionResult};
use crate::events::events::{DatasetLoaded, FilterRejected, SelectionRecomputed};
use crate::events::EventBus;
use crate::filter::FilterState;
use crate::pipeline::{Pipeline, SelectionInterceptor, TracingMiddleware};
use crate::record::RecordStore;
use crate::summary::SelectionSummary;

/// Durable control state read by the renderers
#[derive(Debug, Clone, Default)]
pub struct Controls {
    /// The loaded dataset, `None` until loading finishes
    pub records: Option<Arc<RecordStore>>,

    /// Filters that produced `selection`
    pub filters: FilterState,

    /// Latest recomputed selection
    pub selection: Option<SelectionResult>,
}

impl Controls {
    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }
}

/// Apply a forwarded action to the controls. Only augmented actions change
/// anything; the recomputation replaces filters and selection wholesale.
pub fn reduce(controls: &mut Controls, dispatched: &Dispatched) {
    if let Some(recomputation) = &dispatched.recomputation {
        controls.filters = recomputation.filters.clone();
        controls.selection = Some(recomputation.result.clone());
    }
}

/// Owns the controls and runs every dispatch through the pipeline and
/// reducer. Dispatches are serialised: each finishes before the next starts.
pub struct ControlsStore {
    controls: Arc<RwLock<Controls>>,
    pipeline: Pipeline,
    event_bus: Arc<EventBus>,
}

impl ControlsStore {
    /// Create a store with the given pipeline
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            controls: Arc::new(RwLock::new(Controls::default())),
            pipeline,
            event_bus: Arc::new(EventBus::new()),
        }
    }

    /// Create a store with the standard pipeline around `engine`
    pub fn with_engine(engine: SelectionEngine) -> Self {
        Self::new(
            Pipeline::new()
                .with(TracingMiddleware)
                .with(SelectionInterceptor::new(engine)),
        )
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    /// Install a dataset, resetting every filter and selecting everything
    pub fn load_dataset(&self, store: RecordStore) {
        let filters = FilterState::for_store(&store);
        let mask = vec![true; store.len()];
        let selection = SelectionResult::from_mask(&store, &mask, filters.categorical.clone());
        let loaded = DatasetLoaded {
            record_count: store.len(),
            categorical_fields: store.categories().len(),
            continuous_fields: store.continuous_fields().len(),
        };

        {
            let mut controls = self.controls.write();
            controls.records = Some(Arc::new(store));
            controls.filters = filters;
            controls.selection = Some(selection);
        }

        info!(
            "Loaded {} records ({} categorical, {} continuous fields)",
            loaded.record_count, loaded.categorical_fields, loaded.continuous_fields
        );
        self.event_bus.publish(loaded);
    }

    /// Dispatch an action through the pipeline and reducer, returning what
    /// the reducer saw
    pub fn dispatch(&self, action: Action) -> Dispatched {
        let dispatched = {
            let mut controls = self.controls.write();
            let dispatched = self.pipeline.run(action, &controls);
            reduce(&mut controls, &dispatched);
            dispatched
        };

        if let Some(recomputation) = &dispatched.recomputation {
            self.event_bus.publish(SelectionRecomputed {
                event_kind: dispatched.action.kind().unwrap_or_default().to_string(),
                version: recomputation.filters.version,
                selected: recomputation.result.selected_count(),
                total: recomputation.result.selection.len(),
            });
        } else if let Some(reason) = &dispatched.rejection {
            self.event_bus.publish(FilterRejected {
                event_kind: dispatched.action.kind().unwrap_or_default().to_string(),
                reason: reason.to_string(),
            });
        }

        dispatched
    }

    /// Dispatch a JSON action
    pub fn dispatch_json(&self, value: serde_json::Value) -> Dispatched {
        self.dispatch(Action::from_json(value))
    }

    /// Snapshot of the current controls
    pub fn controls(&self) -> Controls {
        self.controls.read().clone()
    }

    pub fn filters(&self) -> FilterState {
        self.controls.read().filters.clone()
    }

    pub fn selection(&self) -> Option<SelectionResult> {
        self.controls.read().selection.clone()
    }

    /// Counts for the current selection, if a dataset is loaded
    pub fn summary(&self) -> Option<SelectionSummary> {
        let controls = self.controls.read();
        match (&controls.records, &controls.selection) {
            (Some(store), Some(selection)) => Some(SelectionSummary::from_result(store, selection)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::events::handler_from_fn;
    use crate::record::{Record, RecordKey};

    fn dataset() -> RecordStore {
        RecordStore::new(vec![
            Record::new("A").with_category("tissue", "brain").at(1.0, 1.0),
            Record::new("B").with_category("tissue", "liver").at(5.0, 5.0),
            Record::new("C").with_category("tissue", "brain").at(9.0, 9.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_dispatch_before_load_changes_nothing() {
        let store = ControlsStore::with_engine(SelectionEngine::default());
        let dispatched = store.dispatch_json(json!({"type": "spatial-brush-clear"}));

        assert!(!dispatched.is_augmented());
        assert!(store.selection().is_none());
        assert_eq!(store.filters(), FilterState::default());
    }

    #[test]
    fn test_session_updates_controls() {
        let store = ControlsStore::with_engine(SelectionEngine::default());
        store.load_dataset(dataset());
        assert_eq!(store.summary().unwrap().selected, 3);

        store.dispatch_json(json!({
            "type": "spatial-brush-change",
            "brush": {"northwestX": 0, "northwestY": 0, "southeastX": 6, "southeastY": 6}
        }));
        store.dispatch_json(json!({"type": "categorical-deselect", "field": "tissue", "value": "liver"}));

        let selection = store.selection().unwrap();
        assert_eq!(selection.mask(), vec![true, false, false]);
        assert_eq!(store.filters().version, 2);
        assert!(store.filters().spatial.is_some());

        // unrelated actions leave state alone
        store.dispatch_json(json!({"type": "rename-field", "from": "tissue"}));
        assert_eq!(store.filters().version, 2);
        assert_eq!(store.selection().unwrap().is_selected(&RecordKey::from("A")), Some(true));
    }

    #[test]
    fn test_reload_resets_filters() {
        let store = ControlsStore::with_engine(SelectionEngine::default());
        store.load_dataset(dataset());
        store.dispatch_json(json!({"type": "categorical-only-this", "field": "tissue", "value": "liver"}));
        assert_eq!(store.summary().unwrap().selected, 1);

        store.load_dataset(dataset());
        assert!(store.filters().is_unfiltered());
        assert_eq!(store.summary().unwrap().selected, 3);
    }

    #[test]
    fn test_bus_notified_of_outcomes() {
        let store = ControlsStore::with_engine(SelectionEngine::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = log.clone();
        store.event_bus().subscribe::<SelectionRecomputed>(handler_from_fn(move |event| {
            if let Some(e) = event.as_any().downcast_ref::<SelectionRecomputed>() {
                sink.lock().push(format!("{}:{}", e.event_kind, e.selected));
            }
        }));
        let sink = log.clone();
        store.event_bus().subscribe::<FilterRejected>(handler_from_fn(move |event| {
            if let Some(e) = event.as_any().downcast_ref::<FilterRejected>() {
                sink.lock().push(format!("rejected:{}", e.event_kind));
            }
        }));

        store.load_dataset(dataset());
        store.dispatch_json(json!({"type": "categorical-deselect", "field": "tissue", "value": "brain"}));
        store.dispatch_json(json!({"type": "categorical-deselect", "field": "organ", "value": "x"}));

        assert_eq!(
            *log.lock(),
            vec!["categorical-deselect:1".to_string(), "rejected:categorical-deselect".to_string()]
        );
    }
}
