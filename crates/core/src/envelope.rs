//! Axis-aligned envelopes in planar coordinates

use geo::BoundingRect;
use geo_types::{Coord, LineString, Rect};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Degenerate envelope covering a single point
    pub fn of_point(c: Coord<f64>) -> Self {
        Self::new(c.x, c.y, c.x, c.y)
    }

    /// Envelope of all coordinates of a line, `None` for an empty line
    pub fn of_line(line: &LineString<f64>) -> Option<Self> {
        line.bounding_rect().map(Self::from)
    }

    /// Grow the envelope so it contains `c`
    pub fn including(self, c: Coord<f64>) -> Self {
        Self {
            min_x: self.min_x.min(c.x),
            min_y: self.min_y.min(c.y),
            max_x: self.max_x.max(c.x),
            max_y: self.max_y.max(c.y),
        }
    }

    /// Smallest envelope containing both
    pub fn merge(self, other: Envelope) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Expand by `distance` on every side
    pub fn expand_by(self, distance: f64) -> Self {
        Self {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

impl From<Rect<f64>> for Envelope {
    fn from(rect: Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self::new(min.x, min.y, max.x, max.y)
    }
}
