//! # SpeedField Algorithms
//!
//! Directional car speed vector field built from sparse line samples.
//!
//! ## Modules
//!
//! - **field**: planar sample walk, uniform-grid sample index, weight kernel,
//!   and the [`SpatialField`](field::SpatialField) that ingests directed
//!   samples and interpolates speeds for arbitrary paths
//! - **network**: loading speed features into a field and applying a field
//!   to street edges under an acceptance policy

pub mod field;
mod maybe_rayon;
pub mod network;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::field::{
        DirectedSample, Directions, FieldParams, GridIndex, IngestReport, SpatialField,
        WeightKernel, ANCHOR_WEIGHT, RADIUS_MULT,
    };
    pub use crate::network::{
        apply_to_edges, load_features, AcceptancePolicy, ApplyReport, LoadReport,
        SpeedAttributes, SpeedEdge, KMH_PER_MS,
    };
    pub use speedfield_core::prelude::*;
}
