//! Error types for SpeedField

use thiserror::Error;

/// Main error type for SpeedField operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for SpeedField operations
pub type Result<T> = std::result::Result<T, Error>;
