//! Range constraints over continuous fields

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};
use crate::record::Record;

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.min.is_nan() && !self.max.is_nan() && self.min <= self.max
    }

    /// Swap inverted bounds
    pub fn normalized(self) -> Self {
        if self.min > self.max {
            Self::new(self.max, self.min)
        } else {
            self
        }
    }
}

/// One active brush on a continuous dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConstraint {
    pub dimension: String,
    pub extent: Extent,
}

impl RangeConstraint {
    pub fn new(dimension: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            dimension: dimension.into(),
            extent: Extent::new(min, max),
        }
    }
}

/// Active continuous brushes. Empty means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuousFilterState {
    constraints: Vec<RangeConstraint>,
}

impl ContinuousFilterState {
    pub fn new(constraints: Vec<RangeConstraint>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[RangeConstraint] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Membership test for a value against an extent.
///
/// Each continuous dimension declares one of these so that scales other than
/// a plain linear axis can decide membership their own way.
pub trait RangeComparator: Send + Sync + fmt::Debug {
    fn within(&self, value: f64, extent: &Extent) -> bool;
}

/// Closed interval test: `min <= value <= max`
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedInterval;

impl RangeComparator for ClosedInterval {
    fn within(&self, value: f64, extent: &Extent) -> bool {
        value >= extent.min && value <= extent.max
    }
}

/// Closed interval test in log10 space, for dimensions drawn on a log axis.
/// Non-positive values never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInterval;

impl RangeComparator for LogInterval {
    fn within(&self, value: f64, extent: &Extent) -> bool {
        if value <= 0.0 || extent.max <= 0.0 {
            return false;
        }
        let v = value.log10();
        let lo = if extent.min > 0.0 { extent.min.log10() } else { f64::NEG_INFINITY };
        v >= lo && v <= extent.max.log10()
    }
}

/// Comparison semantics per continuous field definition
#[derive(Debug, Clone)]
pub struct DimensionRegistry {
    comparators: AHashMap<String, Arc<dyn RangeComparator>>,
    fallback: Arc<dyn RangeComparator>,
}

impl Default for DimensionRegistry {
    fn default() -> Self {
        Self {
            comparators: AHashMap::new(),
            fallback: Arc::new(ClosedInterval),
        }
    }
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the comparison used for one dimension
    pub fn register(&mut self, dimension: impl Into<String>, comparator: Arc<dyn RangeComparator>) {
        self.comparators.insert(dimension.into(), comparator);
    }

    pub fn with(mut self, dimension: impl Into<String>, comparator: Arc<dyn RangeComparator>) -> Self {
        self.register(dimension, comparator);
        self
    }

    /// Comparator for a dimension, [`ClosedInterval`] when none was declared
    pub fn comparator(&self, dimension: &str) -> &dyn RangeComparator {
        self.comparators
            .get(dimension)
            .map(|c| c.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }
}

/// Check one constraint's bounds, normalising them when `strict` is off
pub fn checked_constraint(constraint: &RangeConstraint, strict: bool) -> Result<RangeConstraint> {
    if constraint.extent.is_well_formed() {
        return Ok(constraint.clone());
    }
    let Extent { min, max } = constraint.extent;
    if strict || min.is_nan() || max.is_nan() {
        return Err(SelectionError::InvalidExtent {
            dimension: constraint.dimension.clone(),
            min,
            max,
        });
    }
    Ok(RangeConstraint {
        dimension: constraint.dimension.clone(),
        extent: constraint.extent.normalized(),
    })
}

/// True iff the record satisfies every constraint. A record with no value
/// for a constrained dimension fails that constraint.
pub fn continuous_ok(record: &Record, constraints: &[RangeConstraint], dimensions: &DimensionRegistry) -> bool {
    constraints.iter().all(|constraint| {
        record
            .continuous
            .get(&constraint.dimension)
            .map(|value| {
                dimensions
                    .comparator(&constraint.dimension)
                    .within(*value, &constraint.extent)
            })
            .unwrap_or(false)
    })
}
