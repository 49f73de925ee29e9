//! End-to-end behavior of the speed field through its public API.

use approx::assert_relative_eq;
use geo::{Geometry, LineString, MultiLineString};
use speedfield_algorithms::prelude::*;
use speedfield_core::io::read_geojson_from_str;

/// Line heading east from `(lon0, 45°N)`, `meters` long in the 45° projection
fn east_line(lon0: f64, meters: f64) -> LineString<f64> {
    let span = (meters / (EARTH_RADIUS_M * 45f64.to_radians().cos())).to_degrees();
    LineString::from(vec![(lon0, 45.0), (lon0 + span, 45.0)])
}

/// Shift a line north by `meters`
fn shifted_north(line: &LineString<f64>, meters: f64) -> LineString<f64> {
    let dlat = (meters / EARTH_RADIUS_M).to_degrees();
    line.coords().map(|c| (c.x, c.y + dlat)).collect::<Vec<_>>().into()
}

fn reversed(line: &LineString<f64>) -> LineString<f64> {
    let mut coords = line.0.clone();
    coords.reverse();
    LineString::new(coords)
}

fn field_45() -> SpatialField {
    SpatialField::new(FieldParams::centered_at(45.0, 50.0)).unwrap()
}

#[test]
fn reference_scenario() {
    let mut field = field_45();
    let line = east_line(5.0, 500.0);
    let report = field.add_path(&line, 10.0, Directions::FORWARD);
    assert_eq!(report.samples, 30);

    let same = field.estimate(&line, 5.0).unwrap();
    assert!((9.5..10.0).contains(&same), "same path estimate {}", same);

    let back = field.estimate(&reversed(&line), 5.0).unwrap();
    assert_relative_eq!(back, 5.0, epsilon = 1e-12);

    assert_eq!(field.estimate(&shifted_north(&line, 200.0), 5.0), None);
}

#[test]
fn same_path_deviation_bounded_by_anchor() {
    for meters in [100.0, 250.0, 800.0] {
        for speed in [3.0, 12.0, 25.0] {
            let mut field = field_45();
            let line = east_line(5.0, meters);
            field.add_path(&line, speed, Directions::FORWARD);

            let prior = 0.0;
            let est = field.estimate(&line, prior).unwrap();
            // every query step sees at least its own sample at full weight
            let bound = (speed - prior).abs() * ANCHOR_WEIGHT / (1.0 + ANCHOR_WEIGHT);
            assert!(
                (est - speed).abs() <= bound + 1e-9,
                "{} m at {} m/s estimated {}",
                meters,
                speed,
                est
            );
        }
    }
}

#[test]
fn opposite_flow_never_returns_sample_speed() {
    let mut field = field_45();
    let line = east_line(5.0, 300.0);
    field.add_path(&line, 30.0, Directions::FORWARD);

    match field.estimate(&reversed(&line), 8.0) {
        None => {}
        Some(v) => assert_relative_eq!(v, 8.0, epsilon = 1e-12),
    }
}

#[test]
fn decay_with_lateral_offset() {
    let mut field = field_45();
    let line = east_line(5.0, 400.0);
    field.add_path(&line, 20.0, Directions::FORWARD);

    let mut previous = f64::INFINITY;
    for offset in [0.0, 40.0, 80.0, 120.0] {
        let est = field.estimate(&shifted_north(&line, offset), 0.0).unwrap();
        assert!(est <= previous + 1e-9, "estimate grew at offset {}", offset);
        previous = est;
    }
}

#[test]
fn frozen_field_is_pure() {
    let mut field = field_45();
    field.add_path(&east_line(5.0, 500.0), 12.0, Directions::BOTH);
    field.add_path(&shifted_north(&east_line(5.0, 500.0), 60.0), 7.0, Directions::FORWARD);

    let query = shifted_north(&east_line(5.001, 200.0), 30.0);
    let first = field.estimate(&query, 9.0);
    for _ in 0..5 {
        assert_eq!(field.estimate(&query, 9.0), first);
    }
    let batch = field.estimate_many(&[(&query, 9.0), (&query, 9.0)]);
    assert_eq!(batch, vec![first, first]);
}

#[test]
fn mixed_geometries_are_counted_not_fatal() {
    let mut field = field_45();
    let multi = MultiLineString::new(vec![east_line(5.0, 200.0), east_line(5.01, 200.0)]);
    let geom = Geometry::GeometryCollection(geo::GeometryCollection(vec![
        Geometry::MultiLineString(multi),
        Geometry::Point(geo::Point::new(5.0, 45.0)),
        Geometry::LineString(LineString::from(vec![(5.0, 45.0)])),
    ]));

    let report = field.add_geometry(&geom, 10.0, Directions::BOTH);

    assert_eq!(report.paths, 3);
    assert_eq!(report.unsupported_geometries, 1);
    assert_eq!(report.degenerate_paths, 1);
    assert_eq!(field.len(), report.samples);
    assert_eq!(report.samples, 2 * 2 * 12);
}

const SAMPLES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"speed": 36, "direction": 1},
     "geometry": {"type": "LineString", "coordinates": [[5.0, 45.0], [5.004, 45.0]]}},
    {"type": "Feature", "properties": {"speed": "90"},
     "geometry": {"type": "LineString", "coordinates": [[6.0, 45.0], [6.004, 45.0]]}},
    {"type": "Feature", "properties": {"speed": null},
     "geometry": {"type": "LineString", "coordinates": [[7.0, 45.0], [7.004, 45.0]]}},
    {"type": "Feature", "properties": {"speed": 50}, "geometry": null}
  ]
}"#;

struct Street {
    line: LineString<f64>,
    speed: f64,
}

impl SpeedEdge for Street {
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

#[test]
fn geojson_samples_to_street_speeds() {
    let features = read_geojson_from_str(SAMPLES).unwrap();
    let mut field = field_45();
    let loaded = load_features(&mut field, features.iter(), &SpeedAttributes::default());

    assert_eq!(loaded.loaded, 2);
    assert_eq!(loaded.skipped_no_speed, 1);
    assert_eq!(loaded.skipped_no_geometry, 1);

    let urban = 50.0 / KMH_PER_MS;
    let mut streets = vec![
        // measured 10 m/s eastbound
        Street { line: LineString::from(vec![(5.0, 45.0), (5.004, 45.0)]), speed: urban },
        // measured eastbound only
        Street { line: LineString::from(vec![(5.004, 45.0), (5.0, 45.0)]), speed: urban },
        // measured 25 m/s both ways, far above the current speed
        Street { line: LineString::from(vec![(6.004, 45.0), (6.0, 45.0)]), speed: urban },
        // null speed sample contributes nothing
        Street { line: LineString::from(vec![(7.0, 45.0), (7.004, 45.0)]), speed: urban },
    ];

    let report = apply_to_edges(&field, &mut streets, &AcceptancePolicy::default());

    assert_eq!(report, ApplyReport { set: 2, no_speed: 1, clamped: 1 });
    assert!(streets[0].speed > 10.0 && streets[0].speed < 10.5);
    assert_relative_eq!(streets[1].speed, urban, epsilon = 1e-12);
    assert_relative_eq!(streets[2].speed, urban);
    assert_relative_eq!(streets[3].speed, urban);
}
