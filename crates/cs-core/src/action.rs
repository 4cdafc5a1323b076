//! Actions flowing through the dispatch pipeline
//!
//! Anything dispatched by the UI arrives as a JSON object with a `"type"`
//! key. The six filter-affecting kinds parse into [`FilterEvent`]; every other
//! action is carried verbatim so it can be forwarded without modification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::Recomputation;
use crate::error::SelectionError;
use crate::filter::{BrushRect, CategoricalToggle, RangeConstraint, ToggleKind};
use crate::record::CategoricalValue;

/// A filter-affecting event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FilterEvent {
    SpatialBrushChange { brush: BrushRect },
    SpatialBrushClear,
    ContinuousBrushChange { constraints: Vec<RangeConstraint> },
    CategoricalSelect { field: String, value: CategoricalValue },
    CategoricalDeselect { field: String, value: CategoricalValue },
    CategoricalOnlyThis { field: String, value: CategoricalValue },
}

impl FilterEvent {
    /// Wire names of every recognized kind
    pub const KINDS: [&'static str; 6] = [
        "spatial-brush-change",
        "spatial-brush-clear",
        "continuous-brush-change",
        "categorical-select",
        "categorical-deselect",
        "categorical-only-this",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            FilterEvent::SpatialBrushChange { .. } => Self::KINDS[0],
            FilterEvent::SpatialBrushClear => Self::KINDS[1],
            FilterEvent::ContinuousBrushChange { .. } => Self::KINDS[2],
            FilterEvent::CategoricalSelect { .. } => Self::KINDS[3],
            FilterEvent::CategoricalDeselect { .. } => Self::KINDS[4],
            FilterEvent::CategoricalOnlyThis { .. } => Self::KINDS[5],
        }
    }

    pub fn is_recognized(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }

    /// The categorical transition this event performs, if any
    pub fn categorical_toggle(&self) -> Option<CategoricalToggle> {
        let (kind, field, value) = match self {
            FilterEvent::CategoricalSelect { field, value } => (ToggleKind::Select, field, value),
            FilterEvent::CategoricalDeselect { field, value } => (ToggleKind::Deselect, field, value),
            FilterEvent::CategoricalOnlyThis { field, value } => (ToggleKind::OnlyThis, field, value),
            _ => return None,
        };
        Some(CategoricalToggle {
            kind,
            field: field.clone(),
            value: value.as_key().into_owned(),
        })
    }
}

/// A dispatched action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A recognized filter event together with the JSON it was parsed from
    Filter { event: FilterEvent, raw: Value },
    /// Unrecognized or malformed; kept exactly as received
    Other(Value),
}

impl Action {
    /// Classify a JSON action by its `"type"`
    pub fn from_json(value: Value) -> Self {
        let recognized = value
            .get("type")
            .and_then(Value::as_str)
            .map(FilterEvent::is_recognized)
            .unwrap_or(false);
        if !recognized {
            return Action::Other(value);
        }
        match FilterEvent::deserialize(&value) {
            Ok(event) => Action::Filter { event, raw: value },
            Err(e) => {
                tracing::debug!("Malformed filter action passed through: {}", e);
                Action::Other(value)
            }
        }
    }

    /// The parsed filter event, for recognized actions
    pub fn event(&self) -> Option<&FilterEvent> {
        match self {
            Action::Filter { event, .. } => Some(event),
            Action::Other(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Action::Filter { event, .. } => Some(event.kind()),
            Action::Other(value) => value.get("type").and_then(Value::as_str),
        }
    }

    /// The action exactly as it was dispatched
    pub fn raw(&self) -> &Value {
        match self {
            Action::Filter { raw, .. } => raw,
            Action::Other(value) => value,
        }
    }

    pub fn to_json(&self) -> Value {
        self.raw().clone()
    }
}

impl From<FilterEvent> for Action {
    fn from(event: FilterEvent) -> Self {
        let raw = serde_json::to_value(&event).unwrap_or(Value::Null);
        Action::Filter { event, raw }
    }
}

/// An action on its way to the reducer, possibly carrying a recomputed
/// selection
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub action: Action,
    pub recomputation: Option<Recomputation>,
    /// Why a recognized filter event was not applied
    pub rejection: Option<SelectionError>,
}

impl Dispatched {
    pub fn passthrough(action: Action) -> Self {
        Self {
            action,
            recomputation: None,
            rejection: None,
        }
    }

    pub fn is_augmented(&self) -> bool {
        self.recomputation.is_some()
    }

    /// The forwarded action as JSON: the dispatched action plus `selection`
    /// and `categoricalFilterState` when a recomputation is attached
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let mut value = self.action.to_json();
        if let (Some(recomputation), Value::Object(map)) = (&self.recomputation, &mut value) {
            map.insert(
                "selection".to_string(),
                serde_json::to_value(&recomputation.result.selection)?,
            );
            map.insert(
                "categoricalFilterState".to_string(),
                serde_json::to_value(&recomputation.result.categorical)?,
            );
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recognized_kinds_parse() {
        let action = Action::from_json(json!({
            "type": "categorical-deselect",
            "field": "tissue",
            "value": "liver"
        }));
        assert_eq!(
            action.event(),
            Some(&FilterEvent::CategoricalDeselect {
                field: "tissue".to_string(),
                value: CategoricalValue::from("liver"),
            })
        );

        let clear = Action::from_json(json!({"type": "spatial-brush-clear"}));
        assert_eq!(clear.event(), Some(&FilterEvent::SpatialBrushClear));
    }

    #[test]
    fn test_continuous_payload() {
        let action = Action::from_json(json!({
            "type": "continuous-brush-change",
            "constraints": [{"dimension": "nCount", "extent": {"min": 10, "max": 20}}]
        }));
        match action.event() {
            Some(FilterEvent::ContinuousBrushChange { constraints }) => {
                assert_eq!(constraints, &vec![RangeConstraint::new("nCount", 10.0, 20.0)]);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_malformed_kept_verbatim() {
        let rename = json!({"type": "rename-field", "from": "a", "to": "b"});
        assert_eq!(Action::from_json(rename.clone()), Action::Other(rename));

        let malformed = json!({"type": "categorical-select", "field": "tissue"});
        assert_eq!(Action::from_json(malformed.clone()), Action::Other(malformed));

        let untyped = json!([1, 2, 3]);
        assert_eq!(Action::from_json(untyped.clone()), Action::Other(untyped));
    }

    #[test]
    fn test_recognized_action_keeps_raw_payload() {
        let raw = json!({"type": "spatial-brush-clear", "panel": "umap"});
        let action = Action::from_json(raw.clone());

        assert_eq!(action.event(), Some(&FilterEvent::SpatialBrushClear));
        assert_eq!(action.to_json(), raw);
    }

    #[test]
    fn test_numeric_toggle_value_is_coerced() {
        let event = FilterEvent::CategoricalOnlyThis {
            field: "cluster".to_string(),
            value: CategoricalValue::Int(4),
        };
        let toggle = event.categorical_toggle().unwrap();
        assert_eq!(toggle.kind, ToggleKind::OnlyThis);
        assert_eq!(toggle.value, "4");
        assert!(FilterEvent::SpatialBrushClear.categorical_toggle().is_none());
    }

    #[test]
    fn test_kind_round_trips_through_serde() {
        for event in [
            FilterEvent::SpatialBrushClear,
            FilterEvent::ContinuousBrushChange { constraints: vec![] },
        ] {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }
}
