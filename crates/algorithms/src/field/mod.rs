//! Directional car speed vector field
//!
//! A [`SpatialField`] ingests measured speeds along line geometries as
//! directed samples (location, unit direction, speed) and interpolates a
//! speed for any query path:
//!
//! ```text
//! v(path) = Σ_seg Σ_s w(s, seg) * v_s + Σ_seg W0 * prior
//!           --------------------------------------------
//!                  Σ_seg Σ_s w(s, seg) + Σ_seg W0
//! ```
//!
//! where `w` is the [`WeightKernel`] and `W0` is [`ANCHOR_WEIGHT`].
//!
//! Usage has two phases: ingestion (`&mut self`, single writer) followed by
//! queries (`&self`, freely shared across threads).

mod index;
mod kernel;
mod sampling;

pub use index::GridIndex;
pub use kernel::{WeightKernel, RADIUS_MULT};
pub use sampling::{
    distance_to_line, step_count, unit_vector, walk_path, PathSegment, PathWalk,
    STEPS_PER_RADIUS, STEP_SHRINK,
};

use crate::maybe_rayon::*;
use geo::{Coord, Geometry, LineString};
use serde::{Deserialize, Serialize};
use speedfield_core::vector::geometry_kind;
use speedfield_core::{Envelope, Error, PlanarProjector, Result};
use std::ops::{Add, AddAssign};
use tracing::{debug, warn};

/// Weight of the prior speed added for every query segment
pub const ANCHOR_WEIGHT: f64 = 0.1;

/// Grid cell size as a multiple of the sample radius
pub const CELL_SIZE_MULT: f64 = 5.0;

/// Field configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    /// Trust radius of a sample in meters (default: 50).
    /// Drives both the ingestion step and the interpolation decay.
    pub sample_radius: f64,
    /// Cosine of the latitude the planar projection is centered on
    /// (default: 1.0, i.e. the equator).
    pub reference_cos_latitude: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            sample_radius: 50.0,
            reference_cos_latitude: 1.0,
        }
    }
}

impl FieldParams {
    /// Parameters for a field centered on `latitude_deg`
    pub fn centered_at(latitude_deg: f64, sample_radius: f64) -> Self {
        Self {
            sample_radius,
            reference_cos_latitude: latitude_deg.to_radians().cos(),
        }
    }

    /// Validate the parameters, returning an error for unusable configurations
    pub fn validate(&self) -> Result<()> {
        if !self.sample_radius.is_finite() || self.sample_radius <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "sample_radius",
                value: self.sample_radius.to_string(),
                reason: "sample radius must be positive and finite".to_string(),
            });
        }
        PlanarProjector::new(self.reference_cos_latitude)?;
        Ok(())
    }
}

/// One directed speed observation in projected meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedSample {
    location: Coord<f64>,
    direction: Coord<f64>,
    speed: f64,
}

impl DirectedSample {
    /// Build a sample, normalizing `direction`.
    ///
    /// Returns `None` when the direction has no length or the speed is
    /// negative or not finite.
    pub fn new(location: Coord<f64>, direction: Coord<f64>, speed: f64) -> Option<Self> {
        if !speed.is_finite() || speed < 0.0 {
            return None;
        }
        Some(Self {
            location,
            direction: unit_vector(direction)?,
            speed,
        })
    }

    pub fn location(&self) -> Coord<f64> {
        self.location
    }

    /// Unit direction of travel
    pub fn direction(&self) -> Coord<f64> {
        self.direction
    }

    /// Speed in m/s
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The same observation for the opposite direction of travel
    pub fn reversed(&self) -> Self {
        Self {
            direction: Coord {
                x: -self.direction.x,
                y: -self.direction.y,
            },
            ..*self
        }
    }
}

/// Travel directions a speed measurement is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directions {
    pub forward: bool,
    pub reverse: bool,
}

impl Directions {
    pub const FORWARD: Self = Self { forward: true, reverse: false };
    pub const REVERSE: Self = Self { forward: false, reverse: true };
    pub const BOTH: Self = Self { forward: true, reverse: true };

    pub fn new(forward: bool, reverse: bool) -> Self {
        Self { forward, reverse }
    }

    /// Decode a signed direction code: `1` is forward only, `-1` reverse
    /// only, anything else (or no code) both ways.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Self::FORWARD,
            Some(-1) => Self::REVERSE,
            _ => Self::BOTH,
        }
    }
}

impl Default for Directions {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Outcome counters of an ingestion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Line paths walked
    pub paths: usize,
    /// Directed samples inserted into the index
    pub samples: usize,
    /// Geometries skipped because they are neither lines nor collections
    pub unsupported_geometries: usize,
    /// Paths with no usable segment (empty, single point, zero length)
    pub degenerate_paths: usize,
    /// Individual steps skipped for lack of a direction
    pub degenerate_segments: usize,
    /// Paths skipped because the speed was negative or not finite
    pub invalid_speeds: usize,
}

impl IngestReport {
    /// Number of anomalies that caused input to be skipped
    pub fn skipped(&self) -> usize {
        self.unsupported_geometries + self.degenerate_paths + self.degenerate_segments + self.invalid_speeds
    }
}

impl AddAssign for IngestReport {
    fn add_assign(&mut self, rhs: Self) {
        self.paths += rhs.paths;
        self.samples += rhs.samples;
        self.unsupported_geometries += rhs.unsupported_geometries;
        self.degenerate_paths += rhs.degenerate_paths;
        self.degenerate_segments += rhs.degenerate_segments;
        self.invalid_speeds += rhs.invalid_speeds;
    }
}

impl Add for IngestReport {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Spatial vector field of car speeds.
///
/// # Example
///
/// ```ignore
/// use speedfield_algorithms::field::{Directions, FieldParams, SpatialField};
///
/// let mut field = SpatialField::new(FieldParams::centered_at(43.3, 50.0))?;
/// field.add_path(&measured, 13.9, Directions::FORWARD);
///
/// match field.estimate(&street, 8.3) {
///     Some(speed) => println!("{speed:.1} m/s"),
///     None => println!("no data near this street"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SpatialField {
    params: FieldParams,
    projector: PlanarProjector,
    kernel: WeightKernel,
    index: GridIndex<DirectedSample>,
}

impl SpatialField {
    /// Create an empty field.
    ///
    /// Fails when the sample radius is not positive or the reference
    /// cosine is outside (0, 1].
    pub fn new(params: FieldParams) -> Result<Self> {
        params.validate()?;
        let projector = PlanarProjector::new(params.reference_cos_latitude)?;
        let cell = params.sample_radius * CELL_SIZE_MULT;
        Ok(Self {
            params,
            projector,
            kernel: WeightKernel::new(params.sample_radius),
            index: GridIndex::new(cell, cell)?,
        })
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    pub fn projector(&self) -> &PlanarProjector {
        &self.projector
    }

    pub fn kernel(&self) -> &WeightKernel {
        &self.kernel
    }

    /// Number of directed samples
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All directed samples in insertion order
    pub fn samples(&self) -> impl Iterator<Item = &DirectedSample> {
        self.index.iter()
    }

    /// Add a measured speed for any geometry in WGS84 degrees.
    ///
    /// Lines are sampled; multi-lines and geometry collections are visited
    /// recursively. Other geometry types are skipped and counted.
    pub fn add_geometry(&mut self, geom: &Geometry<f64>, speed: f64, directions: Directions) -> IngestReport {
        let mut report = IngestReport::default();
        self.visit(geom, speed, directions, &mut report);
        report
    }

    fn visit(&mut self, geom: &Geometry<f64>, speed: f64, directions: Directions, report: &mut IngestReport) {
        match geom {
            Geometry::LineString(ls) => *report += self.add_path(ls, speed, directions),
            Geometry::Line(l) => {
                let ls = LineString::new(vec![l.start, l.end]);
                *report += self.add_path(&ls, speed, directions);
            }
            Geometry::MultiLineString(mls) => {
                for ls in mls.iter() {
                    *report += self.add_path(ls, speed, directions);
                }
            }
            Geometry::GeometryCollection(gc) => {
                for member in gc.iter() {
                    self.visit(member, speed, directions, report);
                }
            }
            other => {
                warn!("Can't process geometry of type {}", geometry_kind(other));
                report.unsupported_geometries += 1;
            }
        }
    }

    /// Add a measured speed (m/s) along a line in WGS84 degrees.
    pub fn add_path(&mut self, line: &LineString<f64>, speed: f64, directions: Directions) -> IngestReport {
        let mut report = IngestReport::default();
        if !speed.is_finite() || speed < 0.0 {
            debug!("Skipping path with invalid speed {}", speed);
            report.invalid_speeds += 1;
            return report;
        }

        let projected = self.projector.project_line(line);
        let walk = walk_path(&projected, self.params.sample_radius);
        report.paths += 1;
        report.degenerate_segments += walk.skipped_segments;
        if walk.is_empty() {
            debug!("Skipping degenerate path with {} vertices", line.0.len());
            report.degenerate_paths += 1;
            return report;
        }

        for seg in &walk.segments {
            let Some(sample) = DirectedSample::new(seg.midpoint, seg.direction, speed) else {
                report.degenerate_segments += 1;
                continue;
            };
            let envelope = Envelope::of_point(seg.midpoint);
            if directions.forward && self.index.insert(&envelope, sample).is_some() {
                report.samples += 1;
            }
            if directions.reverse && self.index.insert(&envelope, sample.reversed()).is_some() {
                report.samples += 1;
            }
        }
        report
    }

    /// Candidate samples for a projected query path: inside the query
    /// envelope grown by the outer cutoff, and within the cutoff of the path.
    fn candidates(&self, projected: &LineString<f64>) -> Vec<&DirectedSample> {
        let cutoff = self.kernel.outer_cutoff();
        let Some(envelope) = Envelope::of_line(projected).map(|e| e.expand_by(cutoff)) else {
            return Vec::new();
        };
        self.index
            .query(&envelope)
            .into_iter()
            .filter(|s| {
                // the grown envelope alone also admits samples in its corners,
                // which lie beyond the cutoff of every point of the path
                envelope.contains_point(s.location.x, s.location.y)
                    && distance_to_line(s.location, projected) <= cutoff
            })
            .collect()
    }

    /// Interpolate the speed along a path in WGS84 degrees.
    ///
    /// `prior_speed` is blended into every segment with [`ANCHOR_WEIGHT`], so
    /// sparse evidence degrades toward it. Returns `None` when no sample lies
    /// within the outer cutoff of the path, or when the path is degenerate.
    /// No clamping or unit conversion is applied.
    pub fn estimate(&self, line: &LineString<f64>, prior_speed: f64) -> Option<f64> {
        let projected = self.projector.project_line(line);
        let candidates = self.candidates(&projected);
        if candidates.is_empty() {
            return None;
        }

        let walk = walk_path(&projected, self.params.sample_radius);
        if walk.is_empty() {
            return None;
        }

        let mut weighted_speed = 0.0;
        let mut weight_sum = 0.0;
        for seg in &walk.segments {
            for s in &candidates {
                let w = self.kernel.weight(s.location, s.direction, seg.midpoint, seg.direction);
                weighted_speed += w * s.speed;
                weight_sum += w;
            }
            weighted_speed += ANCHOR_WEIGHT * prior_speed;
            weight_sum += ANCHOR_WEIGHT;
        }
        Some(weighted_speed / weight_sum)
    }

    /// Estimate a batch of `(path, prior speed)` queries, in parallel when
    /// the `parallel` feature is enabled. Results follow the input order.
    pub fn estimate_many(&self, queries: &[(&LineString<f64>, f64)]) -> Vec<Option<f64>> {
        queries
            .into_par_iter()
            .map(|&(line, prior)| self.estimate(line, prior))
            .collect()
    }
}
