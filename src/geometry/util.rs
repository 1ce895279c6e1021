//! Geometric utility functions.
//!
//! - [`conversions`]: checked scalar conversions to and from `f64`
//! - [`norms`]: vector norms on coordinate arrays
//! - [`point_generation`]: seeded random and structured point sets

pub mod conversions;
pub mod norms;
pub mod point_generation;

pub use conversions::*;
pub use norms::*;
pub use point_generation::*;

/// Errors produced by the point generators.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum RandomPointGenerationError {
    /// The sampling range is empty or inverted.
    #[error("Invalid range: min ({min}) must be less than max ({max})")]
    InvalidRange {
        /// Lower bound, formatted.
        min: String,
        /// Upper bound, formatted.
        max: String,
    },
    /// A structured generator was asked for zero points per axis.
    #[error("Invalid point count: {n_points}")]
    InvalidPointCount {
        /// The rejected count.
        n_points: usize,
    },
    /// A generated coordinate could not be represented in the scalar type.
    #[error("Coordinate conversion failed: {0}")]
    Conversion(#[from] crate::geometry::traits::coordinate::CoordinateConversionError),
}
