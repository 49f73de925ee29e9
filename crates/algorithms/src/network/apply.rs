//! Writing field estimates back onto street edges

use geo::LineString;
use tracing::info;

use crate::field::SpatialField;
use crate::maybe_rayon::*;

/// Progress is logged every this many edges
const PROGRESS_EVERY: usize = 100_000;

/// A street edge carrying a current car speed in m/s
pub trait SpeedEdge {
    /// Edge geometry in WGS84 degrees, oriented in the direction of travel
    fn geometry(&self) -> &LineString<f64>;

    fn current_speed(&self) -> f64;

    fn set_current_speed(&mut self, speed: f64);
}

/// Decides whether an estimate may replace an edge's current speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptancePolicy {
    /// Reject estimates above `current * max_ratio` (default: 1.2).
    /// `None` accepts every estimate.
    pub max_ratio: Option<f64>,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self { max_ratio: Some(1.2) }
    }
}

impl AcceptancePolicy {
    /// Accept every estimate
    pub fn accept_all() -> Self {
        Self { max_ratio: None }
    }

    pub fn accepts(&self, current: f64, estimate: f64) -> bool {
        match self.max_ratio {
            Some(ratio) => estimate <= current * ratio,
            None => true,
        }
    }
}

/// Outcome counters of [`apply_to_edges`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Edges whose speed was replaced
    pub set: usize,
    /// Edges with no field data nearby
    pub no_speed: usize,
    /// Edges whose estimate was rejected by the policy
    pub clamped: usize,
}

/// Estimate every edge (prior = its current speed) and write accepted
/// estimates back.
///
/// Estimation runs in parallel against the frozen field; write-back is
/// sequential.
pub fn apply_to_edges<E>(field: &SpatialField, edges: &mut [E], policy: &AcceptancePolicy) -> ApplyReport
where
    E: SpeedEdge + Sync,
{
    let estimates: Vec<Option<f64>> = {
        let edges: &[E] = edges;
        edges
            .into_par_iter()
            .map(|e| field.estimate(e.geometry(), e.current_speed()))
            .collect()
    };

    let total = edges.len();
    let mut report = ApplyReport::default();
    for (n, (edge, estimate)) in edges.iter_mut().zip(estimates).enumerate() {
        match estimate {
            None => report.no_speed += 1,
            Some(speed) if policy.accepts(edge.current_speed(), speed) => {
                edge.set_current_speed(speed);
                report.set += 1;
            }
            Some(_) => report.clamped += 1,
        }
        if (n + 1) % PROGRESS_EVERY == 0 {
            info!("Processed {} / {} edges...", n + 1, total);
        }
    }
    info!(
        "Set speed on {} edges, {} no speed, {} clamped",
        report.set, report.no_speed, report.clamped
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Directions, FieldParams};
    use approx::assert_relative_eq;
    use speedfield_core::EARTH_RADIUS_M;

    struct Edge {
        line: LineString<f64>,
        speed: f64,
    }

    impl SpeedEdge for Edge {
        fn geometry(&self) -> &LineString<f64> {
            &self.line
        }

        fn current_speed(&self) -> f64 {
            self.speed
        }

        fn set_current_speed(&mut self, speed: f64) {
            self.speed = speed;
        }
    }

    fn line(lon0: f64, meters: f64) -> LineString<f64> {
        let span = (meters / (EARTH_RADIUS_M * 45f64.to_radians().cos())).to_degrees();
        LineString::from(vec![(lon0, 45.0), (lon0 + span, 45.0)])
    }

    #[test]
    fn test_policy() {
        let p = AcceptancePolicy::default();
        assert!(p.accepts(10.0, 12.0));
        assert!(!p.accepts(10.0, 12.5));
        assert!(p.accepts(10.0, 1.0));
        assert!(AcceptancePolicy::accept_all().accepts(1.0, 100.0));
    }

    #[test]
    fn test_apply_to_edges() {
        let mut field = SpatialField::new(FieldParams::centered_at(45.0, 50.0)).unwrap();
        let measured = line(5.0, 500.0);
        field.add_path(&measured, 8.0, Directions::FORWARD);
        field.add_path(&line(5.1, 500.0), 30.0, Directions::FORWARD);

        let mut reversed = measured.clone();
        reversed.0.reverse();
        let mut edges = vec![
            // slower measurement: accepted
            Edge { line: measured.clone(), speed: 13.9 },
            // no data around
            Edge { line: line(7.0, 300.0), speed: 13.9 },
            // much faster measurement: rejected
            Edge { line: line(5.1, 500.0), speed: 13.9 },
            // opposite flow: only the anchor, equal to the current speed
            Edge { line: reversed, speed: 13.9 },
        ];

        let report = apply_to_edges(&field, &mut edges, &AcceptancePolicy::default());

        assert_eq!(report, ApplyReport { set: 2, no_speed: 1, clamped: 1 });
        assert!(edges[0].speed < 8.5 && edges[0].speed > 8.0);
        assert_eq!(edges[1].speed, 13.9);
        assert_eq!(edges[2].speed, 13.9);
        assert_relative_eq!(edges[3].speed, 13.9, epsilon = 1e-9);
    }

    #[test]
    fn test_apply_without_policy_writes_everything() {
        let mut field = SpatialField::new(FieldParams::centered_at(45.0, 50.0)).unwrap();
        field.add_path(&line(5.0, 500.0), 30.0, Directions::BOTH);

        let mut edges = vec![Edge { line: line(5.0, 500.0), speed: 10.0 }];
        let report = apply_to_edges(&field, &mut edges, &AcceptancePolicy::accept_all());

        assert_eq!(report.set, 1);
        assert!(edges[0].speed > 29.0);
    }
}
