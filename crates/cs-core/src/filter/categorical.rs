//! Categorical inclusion map and its toggle transitions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};
use crate::record::{Record, RecordStore};

/// Which toggle a categorical event performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    /// Mark one value active
    Select,
    /// Mark one value inactive
    Deselect,
    /// Mark every value of the field inactive except this one
    OnlyThis,
}

/// A categorical transition on one (field, value) pair
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalToggle {
    pub kind: ToggleKind,
    pub field: String,
    /// Canonical string form of the value
    pub value: String,
}

/// A (field, value) pair whose flag is false
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivePair<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

/// Field name -> value -> "is active".
///
/// An empty map, or a field whose values are all `true`, constrains nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoricalFilterState {
    fields: IndexMap<String, IndexMap<String, bool>>,
}

impl CategoricalFilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every field and every observed value of the store, all active
    pub fn all_active(store: &RecordStore) -> Self {
        let fields = store
            .categories()
            .iter()
            .map(|(field, values)| {
                let flags = values.iter().map(|v| (v.clone(), true)).collect();
                (field.clone(), flags)
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &IndexMap<String, IndexMap<String, bool>> {
        &self.fields
    }

    pub fn is_active(&self, field: &str, value: &str) -> Option<bool> {
        self.fields.get(field).and_then(|values| values.get(value)).copied()
    }

    /// Produce the state that results from applying a toggle.
    ///
    /// Fields other than the toggled one are carried over untouched. A toggle
    /// naming a value the map has never seen inserts it.
    pub fn apply(&self, toggle: &CategoricalToggle) -> Self {
        let mut next = self.clone();
        let values = next.fields.entry(toggle.field.clone()).or_default();
        match toggle.kind {
            ToggleKind::Select => {
                values.insert(toggle.value.clone(), true);
            }
            ToggleKind::Deselect => {
                values.insert(toggle.value.clone(), false);
            }
            ToggleKind::OnlyThis => {
                for active in values.values_mut() {
                    *active = false;
                }
                values.insert(toggle.value.clone(), true);
            }
        }
        next
    }

    /// All pairs currently marked inactive, across every field
    pub fn inactive_pairs(&self) -> Vec<InactivePair<'_>> {
        self.fields
            .iter()
            .flat_map(|(field, values)| {
                values
                    .iter()
                    .filter(|(_, active)| !**active)
                    .map(move |(value, _)| InactivePair { field, value })
            })
            .collect()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.fields.values().all(|values| values.values().all(|a| *a))
    }
}

/// Check that a toggle names a field and value present in the store
pub fn check_toggle(toggle: &CategoricalToggle, store: &RecordStore) -> Result<()> {
    if !store.categories().contains_key(&toggle.field) {
        return Err(SelectionError::UnknownCategoricalField(toggle.field.clone()));
    }
    if !store.has_categorical_value(&toggle.field, &toggle.value) {
        return Err(SelectionError::UnknownCategoricalValue {
            field: toggle.field.clone(),
            value: toggle.value.clone(),
        });
    }
    Ok(())
}

/// True unless the record's value for some inactive pair's field equals
/// that pair's value
pub fn categorical_ok(record: &Record, inactive: &[InactivePair<'_>]) -> bool {
    !inactive.iter().any(|pair| {
        record
            .category_key(pair.field)
            .map(|value| value == pair.value)
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RecordStore {
        RecordStore::new(vec![
            Record::new("a").with_category("tissue", "brain").with_category("cluster", 1i64),
            Record::new("b").with_category("tissue", "liver").with_category("cluster", 2i64),
            Record::new("c").with_category("tissue", "lung").with_category("cluster", 1i64),
        ])
        .unwrap()
    }

    fn toggle(kind: ToggleKind, field: &str, value: &str) -> CategoricalToggle {
        CategoricalToggle {
            kind,
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_all_active_is_unconstrained() {
        let state = CategoricalFilterState::all_active(&store());
        assert!(state.is_unconstrained());
        assert!(state.inactive_pairs().is_empty());
        assert_eq!(state.is_active("tissue", "liver"), Some(true));
    }

    #[test]
    fn test_deselect_then_select() {
        let state = CategoricalFilterState::all_active(&store());
        let off = state.apply(&toggle(ToggleKind::Deselect, "tissue", "liver"));
        assert_eq!(off.is_active("tissue", "liver"), Some(false));
        assert_eq!(off.is_active("tissue", "brain"), Some(true));
        assert_eq!(state.is_active("tissue", "liver"), Some(true));

        let on = off.apply(&toggle(ToggleKind::Select, "tissue", "liver"));
        assert_eq!(on, state);
    }

    #[test]
    fn test_only_this_leaves_other_fields_alone() {
        let state = CategoricalFilterState::all_active(&store())
            .apply(&toggle(ToggleKind::Deselect, "cluster", "2"));
        let only = state.apply(&toggle(ToggleKind::OnlyThis, "tissue", "liver"));

        assert_eq!(only.is_active("tissue", "liver"), Some(true));
        assert_eq!(only.is_active("tissue", "brain"), Some(false));
        assert_eq!(only.is_active("tissue", "lung"), Some(false));
        assert_eq!(only.fields()["cluster"], state.fields()["cluster"]);
    }

    #[test]
    fn test_inactive_pair_scan() {
        let store = store();
        let state = CategoricalFilterState::all_active(&store)
            .apply(&toggle(ToggleKind::Deselect, "tissue", "liver"));
        let inactive = state.inactive_pairs();
        assert_eq!(inactive, vec![InactivePair { field: "tissue", value: "liver" }]);

        let verdicts: Vec<bool> = store.iter().map(|r| categorical_ok(r, &inactive)).collect();
        assert_eq!(verdicts, vec![true, false, true]);
    }

    #[test]
    fn test_numeric_values_compare_as_strings() {
        let store = store();
        let state = CategoricalFilterState::all_active(&store)
            .apply(&toggle(ToggleKind::Deselect, "cluster", "1"));
        let inactive = state.inactive_pairs();
        let float_record = Record::new("d").with_category("cluster", 1.0);

        assert!(!categorical_ok(&store.records()[0], &inactive));
        assert!(categorical_ok(&store.records()[1], &inactive));
        assert!(!categorical_ok(&float_record, &inactive));
    }

    #[test]
    fn test_record_without_field_is_not_excluded() {
        let state = CategoricalFilterState::all_active(&store())
            .apply(&toggle(ToggleKind::Deselect, "tissue", "liver"));
        let bare = Record::new("z");
        assert!(categorical_ok(&bare, &state.inactive_pairs()));
    }

    #[test]
    fn test_check_toggle_against_store() {
        let store = store();
        assert_eq!(
            check_toggle(&toggle(ToggleKind::Select, "organ", "x"), &store),
            Err(SelectionError::UnknownCategoricalField("organ".to_string()))
        );
        assert!(matches!(
            check_toggle(&toggle(ToggleKind::Select, "tissue", "heart"), &store),
            Err(SelectionError::UnknownCategoricalValue { .. })
        ));
        assert!(check_toggle(&toggle(ToggleKind::OnlyThis, "tissue", "lung"), &store).is_ok());
        // numeric values are checked in their canonical string form
        assert!(check_toggle(&toggle(ToggleKind::Deselect, "cluster", "2"), &store).is_ok());
    }

    #[test]
    fn test_only_this_on_unknown_field_inserts_it() {
        let state = CategoricalFilterState::new()
            .apply(&toggle(ToggleKind::OnlyThis, "batch", "b1"));
        assert_eq!(state.is_active("batch", "b1"), Some(true));
        assert!(state.is_unconstrained());
    }
}
