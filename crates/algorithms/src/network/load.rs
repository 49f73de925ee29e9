//! Loading measured speed features into a field

use speedfield_core::{AttributeValue, Feature};
use std::ops::AddAssign;
use tracing::{debug, info};

use crate::field::{Directions, IngestReport, SpatialField};

/// km/h per m/s
pub const KMH_PER_MS: f64 = 3.6;

/// Attribute layout of measured speed features
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedAttributes {
    /// Attribute holding the measured speed (default: "speed")
    pub speed: String,
    /// Attribute holding the direction code: `1` forward only, `-1` reverse
    /// only, anything else both ways. `None` treats every feature as
    /// two-way (default: "direction").
    pub direction: Option<String>,
    /// Speeds are stored in km/h rather than m/s (default: true)
    pub speed_in_kmh: bool,
}

impl Default for SpeedAttributes {
    fn default() -> Self {
        Self {
            speed: "speed".to_string(),
            direction: Some("direction".to_string()),
            speed_in_kmh: true,
        }
    }
}

impl SpeedAttributes {
    /// Speed of a feature in m/s, `None` when missing or not numeric
    pub fn speed_of(&self, feature: &Feature) -> Option<f64> {
        let raw = feature.get_property(&self.speed).and_then(AttributeValue::as_f64)?;
        Some(if self.speed_in_kmh { raw / KMH_PER_MS } else { raw })
    }

    /// Travel directions of a feature
    pub fn directions_of(&self, feature: &Feature) -> Directions {
        let code = self
            .direction
            .as_deref()
            .and_then(|name| feature.get_property(name))
            .and_then(AttributeValue::as_i64);
        Directions::from_code(code)
    }
}

/// Outcome counters of a feature batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Features handed to the field
    pub loaded: usize,
    /// Features without a usable speed attribute
    pub skipped_no_speed: usize,
    /// Features without geometry
    pub skipped_no_geometry: usize,
    /// Accumulated field ingestion counters
    pub ingest: IngestReport,
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, rhs: Self) {
        self.loaded += rhs.loaded;
        self.skipped_no_speed += rhs.skipped_no_speed;
        self.skipped_no_geometry += rhs.skipped_no_geometry;
        self.ingest += rhs.ingest;
    }
}

/// Add every usable feature to `field`.
///
/// Malformed features are counted and skipped; the batch never aborts.
pub fn load_features<'a, I>(field: &mut SpatialField, features: I, attrs: &SpeedAttributes) -> LoadReport
where
    I: IntoIterator<Item = &'a Feature>,
{
    let mut report = LoadReport::default();
    for feature in features {
        let Some(geometry) = feature.geometry.as_ref() else {
            report.skipped_no_geometry += 1;
            continue;
        };
        let Some(speed) = attrs.speed_of(feature) else {
            debug!("Feature {:?} has no usable '{}' attribute", feature.id, attrs.speed);
            report.skipped_no_speed += 1;
            continue;
        };
        report.ingest += field.add_geometry(geometry, speed, attrs.directions_of(feature));
        report.loaded += 1;
    }
    info!(
        "Loaded {} features, skipped {}: no speed, {}: no geom.",
        report.loaded, report.skipped_no_speed, report.skipped_no_geometry
    );
    debug!("Ingestion: {:?}", report.ingest);
    report
}
