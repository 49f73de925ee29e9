//! Direction-aware, distance-decayed sample weighting

use geo::Coord;

/// Outer cutoff as a multiple of the sample radius
pub const RADIUS_MULT: f64 = 3.0;

/// Weight of one directed sample toward one query point.
///
/// ```text
/// dp = u · v                       (sample / query directions)
/// w  = 0                           if dp <= 0 or d > 3r
/// w  = dp                          if d < r
/// w  = dp * (3r - d) / (2r)        otherwise
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightKernel {
    radius: f64,
}

impl WeightKernel {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Distance beyond which a sample contributes nothing
    pub fn outer_cutoff(&self) -> f64 {
        self.radius * RADIUS_MULT
    }

    /// Unit-less weight in `[0, 1]`.
    ///
    /// Samples flowing against or across the query direction weigh nothing.
    #[inline]
    pub fn weight(
        &self,
        sample_location: Coord<f64>,
        sample_direction: Coord<f64>,
        query_location: Coord<f64>,
        query_direction: Coord<f64>,
    ) -> f64 {
        let dp = sample_direction.x * query_direction.x + sample_direction.y * query_direction.y;
        if dp <= 0.0 {
            return 0.0;
        }
        let d = (sample_location.x - query_location.x).hypot(sample_location.y - query_location.y);
        let cutoff = self.outer_cutoff();
        if d > cutoff {
            return 0.0;
        }
        if d < self.radius {
            return dp;
        }
        (cutoff - d) / (self.radius * (RADIUS_MULT - 1.0)) * dp
    }
}
