//! Filter state for the three filter axes and the per-axis predicates

pub mod categorical;
pub mod continuous;
pub mod spatial;

use serde::{Deserialize, Serialize};

use crate::record::RecordStore;

pub use categorical::{
    categorical_ok, check_toggle, CategoricalFilterState, CategoricalToggle, InactivePair, ToggleKind,
};
pub use continuous::{
    continuous_ok, ClosedInterval, ContinuousFilterState, DimensionRegistry, Extent, LogInterval,
    RangeComparator, RangeConstraint,
};
pub use spatial::{spatial_ok, AxisScale, BrushRect, IdentityScale, LinearScale, ScreenPoint, ScreenTransform};

/// Snapshot of every active filter.
///
/// Replaced wholesale on each accepted filter event; `version` increases by
/// one with every replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub version: u64,
    pub categorical: CategoricalFilterState,
    pub continuous: ContinuousFilterState,
    pub spatial: Option<BrushRect>,
}

impl FilterState {
    /// Unfiltered state for a freshly loaded dataset
    pub fn for_store(store: &RecordStore) -> Self {
        Self {
            version: 0,
            categorical: CategoricalFilterState::all_active(store),
            continuous: ContinuousFilterState::default(),
            spatial: None,
        }
    }

    /// True when no axis constrains anything
    pub fn is_unfiltered(&self) -> bool {
        self.spatial.is_none() && self.continuous.is_empty() && self.categorical.is_unconstrained()
    }
}
