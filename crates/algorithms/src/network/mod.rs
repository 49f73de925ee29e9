//! Street network collaborators
//!
//! - **load**: turn measured speed features into field samples
//! - **apply**: estimate street edges from a field under an acceptance policy

mod apply;
mod load;

pub use apply::{apply_to_edges, AcceptancePolicy, ApplyReport, SpeedEdge};
pub use load::{load_features, LoadReport, SpeedAttributes, KMH_PER_MS};
