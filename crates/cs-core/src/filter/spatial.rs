//! 2-D brush over the embedding plot

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};
use crate::record::EmbeddingCoord;

/// A point in screen space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Rectangle captured by the 2-D brush, in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushRect {
    pub northwest_x: f64,
    pub northwest_y: f64,
    pub southeast_x: f64,
    pub southeast_y: f64,
}

impl BrushRect {
    pub fn new(northwest: ScreenPoint, southeast: ScreenPoint) -> Self {
        Self {
            northwest_x: northwest.x,
            northwest_y: northwest.y,
            southeast_x: southeast.x,
            southeast_y: southeast.y,
        }
    }

    pub fn northwest(&self) -> ScreenPoint {
        ScreenPoint { x: self.northwest_x, y: self.northwest_y }
    }

    pub fn southeast(&self) -> ScreenPoint {
        ScreenPoint { x: self.southeast_x, y: self.southeast_y }
    }

    /// Closed containment test; points on the edges are inside
    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.northwest_x
            && p.x <= self.southeast_x
            && p.y >= self.northwest_y
            && p.y <= self.southeast_y
    }

    fn is_finite(&self) -> bool {
        [self.northwest_x, self.northwest_y, self.southeast_x, self.southeast_y]
            .iter()
            .all(|v| v.is_finite())
    }

    fn is_ordered(&self) -> bool {
        self.northwest_x <= self.southeast_x && self.northwest_y <= self.southeast_y
    }

    /// Rectangle with the corners reordered so northwest is the minimum
    pub fn normalized(&self) -> Self {
        Self {
            northwest_x: self.northwest_x.min(self.southeast_x),
            northwest_y: self.northwest_y.min(self.southeast_y),
            southeast_x: self.northwest_x.max(self.southeast_x),
            southeast_y: self.northwest_y.max(self.southeast_y),
        }
    }

    /// Reject or repair inverted corners depending on `strict`. Corners must
    /// be finite in either mode.
    pub fn checked(&self, strict: bool) -> Result<Self> {
        if !self.is_finite() {
            return Err(SelectionError::InvalidBrush("corner coordinate is not finite".to_string()));
        }
        if self.is_ordered() {
            Ok(*self)
        } else if strict {
            Err(SelectionError::InvalidBrush(format!(
                "northwest ({}, {}) is not above and left of southeast ({}, {})",
                self.northwest_x, self.northwest_y, self.southeast_x, self.southeast_y
            )))
        } else {
            Ok(self.normalized())
        }
    }
}

/// Maps one embedding axis to screen space
pub trait AxisScale: Send + Sync + fmt::Debug {
    fn apply(&self, value: f64) -> f64;
}

/// Pass-through scale
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScale;

impl AxisScale for IdentityScale {
    fn apply(&self, value: f64) -> f64 {
        value
    }
}

/// Linear interpolation from a domain onto a range. The range may be
/// reversed, as for a y axis that grows downward on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }
}

impl AxisScale for LinearScale {
    fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Embedding-to-screen transform, one scale per axis
#[derive(Debug, Clone)]
pub struct ScreenTransform {
    pub x: Arc<dyn AxisScale>,
    pub y: Arc<dyn AxisScale>,
}

impl Default for ScreenTransform {
    fn default() -> Self {
        Self {
            x: Arc::new(IdentityScale),
            y: Arc::new(IdentityScale),
        }
    }
}

impl ScreenTransform {
    pub fn new(x: Arc<dyn AxisScale>, y: Arc<dyn AxisScale>) -> Self {
        Self { x, y }
    }

    pub fn project(&self, coord: EmbeddingCoord) -> ScreenPoint {
        ScreenPoint {
            x: self.x.apply(coord.x),
            y: self.y.apply(coord.y),
        }
    }
}

/// True iff the coordinate projects inside the brush. Unmapped records fail.
pub fn spatial_ok(coords: Option<EmbeddingCoord>, brush: &BrushRect, transform: &ScreenTransform) -> bool {
    coords
        .map(|c| brush.contains(transform.project(c)))
        .unwrap_or(false)
}
