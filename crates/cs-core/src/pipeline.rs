//! Dispatch pipeline and the selection interceptor
//!
//! Every dispatched action runs through an ordered chain of [`Middleware`]
//! stages before it reaches the reducer. Stages return the (possibly
//! augmented) action rather than mutating shared state.

use tracing::{debug, warn};

use crate::action::{Action, Dispatched};
use crate::engine::SelectionEngine;
use crate::state::Controls;

/// One stage of the dispatch pipeline
pub trait Middleware: Send + Sync {
    fn handle(&self, dispatched: Dispatched, controls: &Controls) -> Dispatched;
}

/// Ordered chain of middleware stages
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage to the end of the chain
    pub fn with(mut self, stage: impl Middleware + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run an action through every stage in order
    pub fn run(&self, action: Action, controls: &Controls) -> Dispatched {
        self.stages
            .iter()
            .fold(Dispatched::passthrough(action), |dispatched, stage| {
                stage.handle(dispatched, controls)
            })
    }
}

/// Recomputes the selection for filter-affecting actions and attaches it.
///
/// Actions pass through untouched when the dataset has not loaded, when the
/// action is not a recognized filter kind, or when the engine refuses the
/// event.
pub struct SelectionInterceptor {
    engine: SelectionEngine,
}

impl SelectionInterceptor {
    pub fn new(engine: SelectionEngine) -> Self {
        Self { engine }
    }
}

impl Middleware for SelectionInterceptor {
    fn handle(&self, dispatched: Dispatched, controls: &Controls) -> Dispatched {
        if dispatched.is_augmented() {
            return dispatched;
        }
        let Some(event) = dispatched.action.event() else {
            return dispatched;
        };
        let Some(store) = controls.records.as_deref() else {
            debug!("Dataset not loaded, passing '{}' through", event.kind());
            return dispatched;
        };

        match self.engine.recompute(event, &controls.filters, store) {
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

/// Logs every action that passes through
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(&self, dispatched: Dispatched, _controls: &Controls) -> Dispatched {
        debug!(
            "Action '{}' (augmented: {})",
            dispatched.action.kind().unwrap_or("<untyped>"),
            dispatched.is_augmented()
        );
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::action::FilterEvent;
    use crate::filter::FilterState;
    use crate::record::{Record, RecordStore};

    fn loaded_controls() -> Controls {
        let store = RecordStore::new(vec![
            Record::new("A").with_category("tissue", "brain").at(1.0, 1.0),
            Record::new("B").with_category("tissue", "liver").at(5.0, 5.0),
        ])
        .unwrap();
        Controls {
            filters: FilterState::for_store(&store),
            records: Some(Arc::new(store)),
            selection: None,
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new()
            .with(TracingMiddleware)
            .with(SelectionInterceptor::new(SelectionEngine::default()))
    }

    #[test]
    fn test_unrecognized_action_is_forwarded_verbatim() {
        let raw = r#"{"type":"rename-field","from":"tissue","to":"organ","extra":[1,2.5,null]}"#;
        let action = Action::from_json(serde_json::from_str(raw).unwrap());

        let dispatched = pipeline().run(action, &loaded_controls());

        assert!(!dispatched.is_augmented());
        assert!(dispatched.rejection.is_none());
        assert_eq!(serde_json::to_string(&dispatched.to_json().unwrap()).unwrap(), raw);
    }

    #[test]
    fn test_filter_action_is_augmented() {
        let action = Action::from_json(json!({
            "type": "categorical-deselect",
            "field": "tissue",
            "value": "liver"
        }));

        let dispatched = pipeline().run(action, &loaded_controls());
        let out = dispatched.to_json().unwrap();

        assert_eq!(out["type"], "categorical-deselect");
        assert_eq!(
            out["selection"],
            json!([
                {"identityKey": "A", "selected": true},
                {"identityKey": "B", "selected": false}
            ])
        );
        assert_eq!(out["categoricalFilterState"]["tissue"]["liver"], false);
    }

    #[test]
    fn test_undeclared_payload_fields_survive_every_path() {
        let select = r#"{"type":"categorical-select","field":"tissue","value":"liver","source":"legend"}"#;
        let unknown = r#"{"source":"legend","type":"categorical-select","field":"organ","value":"heart"}"#;
        let parse = |raw: &str| Action::from_json(serde_json::from_str(raw).unwrap());
        let render = |d: &Dispatched| serde_json::to_string(&d.to_json().unwrap()).unwrap();

        // dataset not loaded
        let unloaded = pipeline().run(parse(select), &Controls::default());
        assert!(!unloaded.is_augmented());
        assert_eq!(render(&unloaded), select);

        // rejected by the engine
        let rejected = pipeline().run(parse(unknown), &loaded_controls());
        assert!(rejected.rejection.is_some());
        assert_eq!(render(&rejected), unknown);

        // augmented: every incoming key kept in order, result keys appended
        let augmented = pipeline().run(parse(select), &loaded_controls());
        let out = augmented.to_json().unwrap();
        let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["type", "field", "value", "source", "selection", "categoricalFilterState"]
        );
        assert_eq!(out["source"], "legend");
    }

    #[test]
    fn test_unloaded_dataset_passes_through() {
        let controls = Controls::default();
        let action = Action::from(FilterEvent::SpatialBrushClear);

        let dispatched = pipeline().run(action.clone(), &controls);

        assert_eq!(dispatched, Dispatched::passthrough(action));
    }

    #[test]
    fn test_rejected_event_forwarded_unchanged() {
        let action = Action::from_json(json!({
            "type": "categorical-select",
            "field": "organ",
            "value": "heart"
        }));

        let dispatched = pipeline().run(action.clone(), &loaded_controls());

        assert_eq!(dispatched.action, action);
        assert!(!dispatched.is_augmented());
        assert!(dispatched.rejection.is_some());
    }

    #[test]
    fn test_already_augmented_is_not_recomputed() {
        let controls = loaded_controls();
        let action = Action::from(FilterEvent::SpatialBrushClear);
        let twice = Pipeline::new()
            .with(SelectionInterceptor::new(SelectionEngine::default()))
            .with(SelectionInterceptor::new(SelectionEngine::default()));

        let dispatched = twice.run(action, &controls);

        assert_eq!(dispatched.recomputation.map(|r| r.filters.version), Some(1));
    }
}
