//! Counts derived from a selection, for the category list and status line

use indexmap::IndexMap;
use serde::Serialize;

use crate::engine::SelectionResult;
use crate::record::RecordStore;

/// Selected-record counts overall and per categorical value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSummary {
    pub total: usize,
    pub selected: usize,
    /// field -> value -> number of selected records with that value
    pub per_value: IndexMap<String, IndexMap<String, usize>>,
}

impl SelectionSummary {
    /// Tally a result produced for `store`. Every known value appears, with
    /// zero when none of its records are selected.
    pub fn from_result(store: &RecordStore, result: &SelectionResult) -> Self {
        let mut per_value: IndexMap<String, IndexMap<String, usize>> = store
            .categories()
            .iter()
            .map(|(field, values)| (field.clone(), values.iter().map(|v| (v.clone(), 0)).collect()))
            .collect();

        let mut selected = 0;
        for (record, cell) in store.iter().zip(result.selection.iter()) {
            if !cell.selected {
                continue;
            }
            selected += 1;
            for (field, value) in &record.categorical {
                if let Some(count) = per_value
                    .get_mut(field)
                    .and_then(|values| values.get_mut(&*value.as_key()))
                {
                    *count += 1;
                }
            }
        }

        Self {
            total: store.len(),
            selected,
            per_value,
        }
    }

    pub fn count(&self, field: &str, value: &str) -> Option<usize> {
        self.per_value.get(field).and_then(|values| values.get(value)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SelectionEngine;
    use crate::filter::{CategoricalToggle, FilterState, ToggleKind};
    use crate::record::Record;

    #[test]
    fn test_counts_follow_selection() {
        let store = RecordStore::new(vec![
            Record::new(1i64).with_category("tissue", "brain"),
            Record::new(2i64).with_category("tissue", "liver"),
            Record::new(3i64).with_category("tissue", "brain"),
        ])
        .unwrap();
        let mut filters = FilterState::for_store(&store);
        filters.categorical = filters.categorical.apply(&CategoricalToggle {
            kind: ToggleKind::Deselect,
            field: "tissue".to_string(),
            value: "liver".to_string(),
        });

        let result = SelectionEngine::default().evaluate(&filters, &store);
        let summary = SelectionSummary::from_result(&store, &result);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.selected, 2);
        assert_eq!(summary.count("tissue", "brain"), Some(2));
        assert_eq!(summary.count("tissue", "liver"), Some(0));
        assert_eq!(summary.count("tissue", "lung"), None);
    }
}
