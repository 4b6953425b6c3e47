//! Error types for the tap processor.

use thiserror::Error;

use crate::motion::Axis;

/// Result type for tap processing operations
pub type Result<T> = std::result::Result<T, TapError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TapError {
    /// A pause policy value is out of range
    #[error("Invalid pause policy: {0}")]
    InvalidPolicy(String),

    /// Coordinate word present but its number could not be read (strict mode only)
    #[error("Malformed {axis} coordinate {token:?} on line {line}")]
    MalformedCoordinate {
        line: usize,
        axis: Axis,
        token: String,
    },

    /// Scale factor must be finite and positive
    #[error("Invalid scale factor: {0}")]
    InvalidScale(f64),

    /// No built-in material with this id
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    /// Year/month/day do not form a calendar date
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}
