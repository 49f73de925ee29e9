//! # SpeedField Core
//!
//! Core types and I/O shared by the SpeedField crates.
//!
//! This crate provides:
//! - `PlanarProjector`: local equirectangular projection from degrees to meters
//! - `Envelope`: axis-aligned bounding box in planar coordinates
//! - `Feature` / `FeatureCollection`: geometries with attributes
//! - GeoJSON reading and writing for feature collections

pub mod envelope;
pub mod error;
pub mod io;
pub mod projection;
pub mod vector;

pub use envelope::Envelope;
pub use error::{Error, Result};
pub use projection::{PlanarProjector, EARTH_RADIUS_M};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::envelope::Envelope;
    pub use crate::error::{Error, Result};
    pub use crate::projection::{PlanarProjector, EARTH_RADIUS_M};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
