//! Fixed-step walk along planar paths
//!
//! Both ingestion and interpolation cut a path into `n` equal arc-length
//! steps, `n = round(L / (radius / 3))` with a floor of 1, and look at each
//! step as a segment with a midpoint and a unit direction. The step is shrunk
//! by a factor `0.999999` so the last sampled point stays inside the path.

use geo::{
    Coord, Distance, Euclidean, Length, LineInterpolatePoint, LineString, Point,
    RemoveRepeatedPoints,
};

/// Number of walk steps per sample radius
pub const STEPS_PER_RADIUS: f64 = 3.0;

/// Step shrink factor keeping the final point within the parametrization
pub const STEP_SHRINK: f64 = 0.999_999;

/// Upper bound on the steps of one walk; longer paths are treated as degenerate
pub const MAX_STEPS: usize = 1 << 24;

/// One step of a path walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    /// Midpoint of the step
    pub midpoint: Coord<f64>,
    /// Unit vector from the start to the end of the step
    pub direction: Coord<f64>,
}

/// Result of walking a path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathWalk {
    pub segments: Vec<PathSegment>,
    /// Steps dropped because they had no defined direction
    pub skipped_segments: usize,
}

impl PathWalk {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Number of steps used to walk a path of `length` meters
pub fn step_count(length: f64, sample_radius: f64) -> usize {
    let n = (length / (sample_radius / STEPS_PER_RADIUS)).round();
    if n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// Walk a planar path in fixed arc-length steps.
///
/// Paths with fewer than two distinct vertices, a non-finite length, or more
/// than [`MAX_STEPS`] steps produce no segments. Steps whose endpoints
/// coincide are skipped and counted in [`PathWalk::skipped_segments`].
pub fn walk_path(line: &LineString<f64>, sample_radius: f64) -> PathWalk {
    // zero-length pieces have no interpolation parameter
    let line = line.remove_repeated_points();
    if line.0.len() < 2 {
        return PathWalk::default();
    }
    let length = line.length::<Euclidean>();
    if !length.is_finite() || length <= 0.0 {
        return PathWalk::default();
    }

    let n = step_count(length, sample_radius);
    if n > MAX_STEPS {
        return PathWalk::default();
    }
    let fraction_step = STEP_SHRINK / n as f64;

    let mut walk = PathWalk {
        segments: Vec::with_capacity(n),
        skipped_segments: 0,
    };
    let mut a = line.0[0];
    for i in 1..=n {
        let Some(b) = line.line_interpolate_point(i as f64 * fraction_step) else {
            walk.skipped_segments += 1;
            continue;
        };
        let b = b.0;
        match unit_vector(b - a) {
            Some(direction) => walk.segments.push(PathSegment {
                midpoint: Coord {
                    x: (a.x + b.x) / 2.0,
                    y: (a.y + b.y) / 2.0,
                },
                direction,
            }),
            None => walk.skipped_segments += 1,
        }
        a = b;
    }
    walk
}

/// Normalize `v`, `None` when it has no direction
pub fn unit_vector(v: Coord<f64>) -> Option<Coord<f64>> {
    let len = v.x.hypot(v.y);
    if !len.is_finite() || len <= 0.0 {
        return None;
    }
    Some(Coord {
        x: v.x / len,
        y: v.y / len,
    })
}

/// Euclidean distance from `p` to the closest point of a planar polyline.
///
/// A single-vertex line is treated as a point; an empty line is infinitely far.
pub fn distance_to_line(p: Coord<f64>, line: &LineString<f64>) -> f64 {
    match line.0.as_slice() {
        [] => f64::INFINITY,
        [only] => Euclidean::distance(Point(p), Point(*only)),
        _ => Euclidean::distance(&Point(p), line),
    }
}
