//! Coordinate traits for geometric computations.
//!
//! The coordinate layer is built from a handful of small traits:
//!
//! - **`Coordinate<T, D>`**: storage abstraction for a point in `D` dimensions
//! - **`CoordinateScalar`**: the bundle of bounds a scalar type must satisfy
//! - **`FiniteCheck`**: rejects NaN and infinite values
//! - **`OrderedEq`**: NaN-aware equality and total ordering of scalars
//! - **`HashCoordinate`**: consistent hashing of floating-point values
//!
//! Triangulations compare points lexicographically and use them as hash keys
//! (duplicate detection, seeding of randomized point location), so scalars
//! must have a total order and a stable hash even though IEEE 754 floats have
//! neither.
//!
//! ```rust
//! use simplicial::geometry::point::Point;
//! use simplicial::geometry::traits::coordinate::Coordinate;
//!
//! let p: Point<f64, 3> = Coordinate::new([1.0, 2.0, 3.0]);
//! assert_eq!(p.dim(), 3);
//! assert!(p.validate().is_ok());
//!
//! let bad: Point<f64, 2> = Coordinate::new([f64::NAN, 1.0]);
//! assert!(bad.validate().is_err());
//! ```

use num_traits::{Float, Zero};
use ordered_float::OrderedFloat;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    cmp::Ordering,
    fmt::Debug,
    hash::{Hash, Hasher},
};

/// Errors that can occur while converting coordinates between scalar types.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinateConversionError {
    /// A coordinate could not be represented in the target type.
    #[error(
        "Failed to convert coordinate at index {coordinate_index} from {from_type} to {to_type}: {coordinate_value}"
    )]
    ConversionFailed {
        /// Index of the coordinate that failed to convert.
        coordinate_index: usize,
        /// String representation of the problematic coordinate value.
        coordinate_value: String,
        /// Source type name.
        from_type: &'static str,
        /// Target type name.
        to_type: &'static str,
    },
    /// A NaN or infinite value was produced or encountered.
    #[error(
        "Non-finite value (NaN or infinity) at coordinate index {coordinate_index}: {coordinate_value}"
    )]
    NonFiniteValue {
        /// Index of the coordinate that contains the non-finite value.
        coordinate_index: usize,
        /// String representation of the non-finite coordinate value.
        coordinate_value: String,
    },
}

/// Errors that can occur during coordinate validation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinateValidationError {
    /// A coordinate value is NaN or infinite.
    #[error(
        "Invalid coordinate at index {coordinate_index} in dimension {dimension}: {coordinate_value}"
    )]
    InvalidCoordinate {
        /// Index of the invalid coordinate.
        coordinate_index: usize,
        /// Value of the invalid coordinate, as a string.
        coordinate_value: String,
        /// The dimensionality of the coordinate system.
        dimension: usize,
    },
}

/// Default tolerance for `f32` comparisons.
pub const DEFAULT_TOLERANCE_F32: f32 = 1e-6;

/// Default tolerance for `f64` comparisons.
pub const DEFAULT_TOLERANCE_F64: f64 = 1e-15;

// =============================================================================
// SUPPORTING TRAITS
// =============================================================================

/// Finiteness check shared by all coordinate scalars.
///
/// # Examples
///
/// ```
/// use simplicial::geometry::traits::coordinate::FiniteCheck;
///
/// assert!(3.5f64.is_finite_generic());
/// assert!(!f64::NAN.is_finite_generic());
/// assert!(!f32::INFINITY.is_finite_generic());
/// ```
pub trait FiniteCheck {
    /// Returns `true` if the value is neither NaN nor infinite.
    fn is_finite_generic(&self) -> bool;
}

macro_rules! impl_finite_check {
    (float: $($t:ty),*) => {
        $(
            impl FiniteCheck for $t {
                #[inline(always)]
                fn is_finite_generic(&self) -> bool {
                    self.is_finite()
                }
            }
        )*
    };
}

impl_finite_check!(float: f32, f64);

/// NaN-aware equality and ordering based on [`OrderedFloat`].
///
/// NaN compares equal to itself and greater than every other value, which
/// gives points a total lexicographic order.
///
/// # Examples
///
/// ```
/// use simplicial::geometry::traits::coordinate::OrderedEq;
/// use std::cmp::Ordering;
///
/// assert!(f64::NAN.ordered_eq(&f64::NAN));
/// assert!(0.0f64.ordered_eq(&(-0.0f64)));
/// assert_eq!(1.0f64.ordered_cmp(&2.0), Ordering::Less);
/// ```
pub trait OrderedEq {
    /// Equality under ordered comparison semantics.
    fn ordered_eq(&self, other: &Self) -> bool;

    /// Total order under ordered comparison semantics.
    fn ordered_cmp(&self, other: &Self) -> Ordering;
}

macro_rules! impl_ordered_eq {
    (float: $($t:ty),*) => {
        $(
            impl OrderedEq for $t {
                #[inline(always)]
                fn ordered_eq(&self, other: &Self) -> bool {
                    OrderedFloat(*self) == OrderedFloat(*other)
                }

                #[inline(always)]
                fn ordered_cmp(&self, other: &Self) -> Ordering {
                    OrderedFloat(*self).cmp(&OrderedFloat(*other))
                }
            }
        )*
    };
}

impl_ordered_eq!(float: f32, f64);

/// Consistent hashing of floating-point scalars.
///
/// ```
/// use simplicial::geometry::traits::coordinate::HashCoordinate;
/// use std::collections::hash_map::DefaultHasher;
/// use std::hash::Hasher;
///
/// let mut h1 = DefaultHasher::new();
/// let mut h2 = DefaultHasher::new();
/// f64::NAN.hash_scalar(&mut h1);
/// f64::NAN.hash_scalar(&mut h2);
/// assert_eq!(h1.finish(), h2.finish());
/// ```
pub trait HashCoordinate {
    /// Feeds this value into `state`.
    fn hash_scalar<H: Hasher>(&self, state: &mut H);
}

macro_rules! impl_hash_coordinate {
    (float: $($t:ty),*) => {
        $(
            impl HashCoordinate for $t {
                #[inline(always)]
                fn hash_scalar<H: Hasher>(&self, state: &mut H) {
                    OrderedFloat(*self).hash(state);
                }
            }
        )*
    };
}

impl_hash_coordinate!(float: f32, f64);

/// Scalar requirements for coordinates.
///
/// Bundles floating-point arithmetic, ordered equality, hashing, finiteness
/// checks and serde support. Implemented for `f32` and `f64`.
///
/// ```rust
/// use simplicial::geometry::traits::coordinate::CoordinateScalar;
///
/// fn nearly_equal<T: CoordinateScalar>(a: T, b: T) -> bool {
///     (a - b).abs() <= T::default_tolerance()
/// }
/// assert!(nearly_equal(1.0f32, 1.0 + 1e-7));
/// ```
pub trait CoordinateScalar:
    Float
    + OrderedEq
    + HashCoordinate
    + FiniteCheck
    + Default
    + Debug
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + 'static
{
    /// Type-specific tolerance for near-zero comparisons
    /// (`1e-6` for `f32`, `1e-15` for `f64`).
    fn default_tolerance() -> Self;
}

impl CoordinateScalar for f32 {
    fn default_tolerance() -> Self {
        DEFAULT_TOLERANCE_F32
    }
}

impl CoordinateScalar for f64 {
    fn default_tolerance() -> Self {
        DEFAULT_TOLERANCE_F64
    }
}

/// Storage abstraction for a `D`-dimensional coordinate.
///
/// ```
/// use simplicial::geometry::{point::Point, traits::coordinate::Coordinate};
///
/// let p: Point<f64, 3> = Coordinate::new([1.0, 2.0, 3.0]);
/// assert_eq!(p.get(0), Some(1.0));
/// assert_eq!(p.get(3), None);
/// assert_eq!(Point::<f64, 3>::origin().to_array(), [0.0; 3]);
/// ```
pub trait Coordinate<T, const D: usize>
where
    T: CoordinateScalar,
    Self: Copy
        + Clone
        + Default
        + Debug
        + PartialEq
        + Eq
        + Hash
        + PartialOrd
        + Serialize
        + DeserializeOwned
        + Sized,
{
    /// The ambient dimension `D`.
    #[must_use]
    fn dim(&self) -> usize {
        D
    }

    /// Creates a coordinate from an array of scalars.
    fn new(coords: [T; D]) -> Self;

    /// Copies the coordinate into an array.
    #[must_use]
    fn to_array(&self) -> [T; D];

    /// Coordinate at `index`, or `None` when out of bounds.
    #[must_use]
    fn get(&self, index: usize) -> Option<T>;

    /// The origin (all zeros).
    #[must_use]
    fn origin() -> Self
    where
        T: Zero,
    {
        Self::new([T::zero(); D])
    }

    /// Checks that every coordinate is finite.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateValidationError::InvalidCoordinate`] for the first
    /// NaN or infinite coordinate.
    fn validate(&self) -> Result<(), CoordinateValidationError>;

    /// Hashes all coordinates with [`HashCoordinate`].
    fn hash_coordinate<H: Hasher>(&self, state: &mut H);

    /// Coordinate-wise [`OrderedEq`] equality.
    #[must_use]
    fn ordered_equals(&self, other: &Self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn coordinate_basic_accessors() {
        let p: Point<f64, 4> = Coordinate::new([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.dim(), 4);
        assert_eq!(p.to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.get(3), Some(4.0));
        assert_eq!(p.get(4), None);
        assert_eq!(Point::<f32, 2>::origin().to_array(), [0.0f32, 0.0]);
    }

    #[test]
    fn validate_reports_first_invalid_coordinate() {
        let p: Point<f64, 3> = Coordinate::new([1.0, f64::INFINITY, f64::NAN]);
        match p.validate() {
            Err(CoordinateValidationError::InvalidCoordinate {
                coordinate_index,
                dimension,
                ..
            }) => {
                assert_eq!(coordinate_index, 1);
                assert_eq!(dimension, 3);
            }
            other => panic!("expected InvalidCoordinate, got {other:?}"),
        }
    }

    #[test]
    fn ordered_semantics_for_special_values() {
        assert!(f32::NAN.ordered_eq(&f32::NAN));
        assert!(!f64::INFINITY.ordered_eq(&f64::NEG_INFINITY));
        assert_eq!(f64::NAN.ordered_cmp(&f64::INFINITY), Ordering::Greater);
        assert_eq!((-1.0f64).ordered_cmp(&0.0), Ordering::Less);
        assert_eq!(0.0f64.ordered_cmp(&-0.0), Ordering::Equal);
    }

    #[test]
    fn equal_points_hash_equally() {
        let a: Point<f64, 2> = Coordinate::new([f64::NAN, 0.5]);
        let b: Point<f64, 2> = Coordinate::new([f64::NAN, 0.5]);
        assert!(a.ordered_equals(&b));
        assert_eq!(hash_of(&a), hash_of(&b));
        let c: Point<f64, 2> = Coordinate::new([0.5, f64::NAN]);
        assert_ne!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn default_tolerances() {
        assert!((f32::default_tolerance() - DEFAULT_TOLERANCE_F32).abs() < f32::EPSILON);
        assert!((f64::default_tolerance() - 1e-15).abs() < f64::EPSILON);
    }

    #[test]
    fn conversion_error_messages() {
        let err = CoordinateConversionError::NonFiniteValue {
            coordinate_index: 2,
            coordinate_value: "NaN".to_string(),
        };
        assert!(err.to_string().contains("index 2"));
        let err = CoordinateConversionError::ConversionFailed {
            coordinate_index: 0,
            coordinate_value: "1e300".to_string(),
            from_type: "f64",
            to_type: "f32",
        };
        assert!(err.to_string().contains("from f64 to f32"));
    }
}
