//! Local planar projection
//!
//! Converts WGS84 longitude/latitude degrees to an equirectangular plane in
//! meters around a reference latitude. Distances and bearings in that plane
//! approximate ground distances at city/region scale; accuracy degrades over
//! large latitude spans and near the poles.

use geo_types::{Coord, LineString};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_010.0;

/// Equirectangular projection parameterized by `cos(reference latitude)`.
///
/// ```text
/// x = radians(lon) * cos_lat * R
/// y = radians(lat) * R
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarProjector {
    cos_lat: f64,
}

impl PlanarProjector {
    /// Create a projector from the cosine of the reference latitude.
    ///
    /// The cosine must lie in (0, 1].
    pub fn new(cos_lat: f64) -> Result<Self> {
        if !cos_lat.is_finite() || cos_lat <= 0.0 || cos_lat > 1.0 {
            return Err(Error::InvalidParameter {
                name: "reference_cos_latitude",
                value: cos_lat.to_string(),
                reason: "cosine of the reference latitude must be in (0, 1]".to_string(),
            });
        }
        Ok(Self { cos_lat })
    }

    /// Create a projector centered on a latitude given in degrees
    pub fn centered_at(latitude_deg: f64) -> Result<Self> {
        Self::new(latitude_deg.to_radians().cos())
    }

    pub fn cos_lat(&self) -> f64 {
        self.cos_lat
    }

    /// Project a single (lon, lat) coordinate to meters
    #[inline]
    pub fn project(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: c.x.to_radians() * self.cos_lat * EARTH_RADIUS_M,
            y: c.y.to_radians() * EARTH_RADIUS_M,
        }
    }

    /// Inverse of [`project`](Self::project)
    #[inline]
    pub fn unproject(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x / (self.cos_lat * EARTH_RADIUS_M)).to_degrees(),
            y: (c.y / EARTH_RADIUS_M).to_degrees(),
        }
    }

    /// Project every vertex of a line
    pub fn project_line(&self, line: &LineString<f64>) -> LineString<f64> {
        line.coords().map(|c| self.project(*c)).collect()
    }
}

impl fmt::Display for PlanarProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "equirectangular(lat0={:.4}°)",
            self.cos_lat.acos().to_degrees()
        )
    }
}

impl Default for PlanarProjector {
    fn default() -> Self {
        Self { cos_lat: 1.0 }
    }
}
