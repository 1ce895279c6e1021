//! Points in `D`-dimensional space.
//!
//! Point equality, hashing and ordering use
//! [`OrderedEq`](crate::geometry::traits::coordinate::OrderedEq) semantics:
//! NaN is equal to itself and points are ordered lexicographically by
//! coordinate.
//! This makes points usable as hash keys and gives triangulations a
//! deterministic tie-breaking order.

#![forbid(unsafe_code)]

use crate::geometry::traits::coordinate::{
    Coordinate, CoordinateConversionError, CoordinateScalar, CoordinateValidationError,
};
use num_traits::cast;
use serde::de::{Error, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

// =============================================================================
// POINT STRUCT DEFINITION
// =============================================================================

/// A point in `D`-dimensional space with scalar type `T`.
///
/// Points are immutable once created.
///
/// # Examples
///
/// ```rust
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::traits::coordinate::Coordinate;
///
/// let p = Point::new([1.0, 2.0]);
/// assert_eq!(p.coords(), &[1.0, 2.0]);
/// assert!(Point::new([0.0, 5.0]) < Point::new([1.0, -5.0]));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Point<T, const D: usize>
where
    T: CoordinateScalar,
{
    coords: [T; D],
}

impl<T, const D: usize> Point<T, D>
where
    T: CoordinateScalar,
{
    /// Read-only access to the coordinate array.
    #[inline]
    #[must_use]
    pub const fn coords(&self) -> &[T; D] {
        &self.coords
    }

    /// Squared Euclidean norm `|p|²`, the lifting used by sphere predicates.
    #[must_use]
    pub fn squared_norm(&self) -> T {
        self.coords.iter().fold(T::zero(), |acc, &c| acc + c * c)
    }
}

// =============================================================================
// TRAIT IMPLEMENTATIONS
// =============================================================================

impl<T, const D: usize> Coordinate<T, D> for Point<T, D>
where
    T: CoordinateScalar,
{
    #[inline]
    fn new(coords: [T; D]) -> Self {
        Self { coords }
    }

    #[inline]
    fn to_array(&self) -> [T; D] {
        self.coords
    }

    #[inline]
    fn get(&self, index: usize) -> Option<T> {
        self.coords.get(index).copied()
    }

    fn validate(&self) -> Result<(), CoordinateValidationError> {
        match self
            .coords
            .iter()
            .position(|c| !c.is_finite_generic())
        {
            Some(index) => Err(CoordinateValidationError::InvalidCoordinate {
                coordinate_index: index,
                coordinate_value: format!("{:?}", self.coords[index]),
                dimension: D,
            }),
            None => Ok(()),
        }
    }

    fn hash_coordinate<H: Hasher>(&self, state: &mut H) {
        for &coord in &self.coords {
            coord.hash_scalar(state);
        }
    }

    fn ordered_equals(&self, other: &Self) -> bool {
        self.coords
            .iter()
            .zip(other.coords.iter())
            .all(|(a, b)| a.ordered_eq(b))
    }
}

impl<T, const D: usize> Hash for Point<T, D>
where
    T: CoordinateScalar,
{
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_coordinate(state);
    }
}

impl<T, const D: usize> PartialEq for Point<T, D>
where
    T: CoordinateScalar,
{
    fn eq(&self, other: &Self) -> bool {
        self.ordered_equals(other)
    }
}

impl<T, const D: usize> Eq for Point<T, D> where T: CoordinateScalar {}

impl<T, const D: usize> Ord for Point<T, D>
where
    T: CoordinateScalar,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.coords
            .iter()
            .zip(other.coords.iter())
            .map(|(a, b)| a.ordered_cmp(b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl<T, const D: usize> PartialOrd for Point<T, D>
where
    T: CoordinateScalar,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, const D: usize> Default for Point<T, D>
where
    T: CoordinateScalar,
{
    fn default() -> Self {
        Self {
            coords: [T::default(); D],
        }
    }
}

// Serialized as a fixed-length tuple of numbers; NaN becomes null.
impl<T, const D: usize> Serialize for Point<T, D>
where
    T: CoordinateScalar,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tuple = serializer.serialize_tuple(D)?;
        for coord in &self.coords {
            if coord.is_nan() {
                tuple.serialize_element(&Option::<T>::None)?;
            } else {
                tuple.serialize_element(coord)?;
            }
        }
        tuple.end()
    }
}

impl<'de, T, const D: usize> Deserialize<'de> for Point<T, D>
where
    T: CoordinateScalar,
{
    fn deserialize<DE>(deserializer: DE) -> Result<Self, DE::Error>
    where
        DE: serde::Deserializer<'de>,
    {
        struct ArrayVisitor<T, const D: usize>(PhantomData<T>);

        impl<'de, T, const D: usize> Visitor<'de> for ArrayVisitor<T, D>
        where
            T: CoordinateScalar,
        {
            type Value = Point<T, D>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_fmt(format_args!("an array of {D} coordinates"))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut coords = [T::zero(); D];
                for (i, slot) in coords.iter_mut().enumerate() {
                    let element: Option<T> = seq
                        .next_element()?
                        .ok_or_else(|| Error::invalid_length(i, &self))?;
                    *slot = element.unwrap_or_else(T::nan);
                }
                Ok(Point::new(coords))
            }
        }

        deserializer.deserialize_tuple(D, ArrayVisitor(PhantomData))
    }
}

// =============================================================================
// TYPE CONVERSION IMPLEMENTATIONS
// =============================================================================

/// Fallible conversion from arrays of any numeric type.
///
/// Fails if a coordinate cannot be cast or is non-finite after the cast.
impl<T, U, const D: usize> TryFrom<[T; D]> for Point<U, D>
where
    T: cast::NumCast + fmt::Debug,
    U: CoordinateScalar + cast::NumCast,
{
    type Error = CoordinateConversionError;

    fn try_from(coords: [T; D]) -> Result<Self, Self::Error> {
        let mut out: [U; D] = [U::zero(); D];
        for (i, c) in coords.into_iter().enumerate() {
            let c_debug = format!("{c:?}");
            let v: U =
                cast::cast(c).ok_or_else(|| CoordinateConversionError::ConversionFailed {
                    coordinate_index: i,
                    coordinate_value: c_debug,
                    from_type: any::type_name::<T>(),
                    to_type: any::type_name::<U>(),
                })?;
            if !v.is_finite_generic() {
                return Err(CoordinateConversionError::NonFiniteValue {
                    coordinate_index: i,
                    coordinate_value: format!("{v:?}"),
                });
            }
            out[i] = v;
        }
        Ok(Self::new(out))
    }
}

impl<T, const D: usize> From<Point<T, D>> for [T; D]
where
    T: CoordinateScalar,
{
    #[inline]
    fn from(point: Point<T, D>) -> [T; D] {
        point.to_array()
    }
}

impl<T, const D: usize> From<&Point<T, D>> for [T; D]
where
    T: CoordinateScalar,
{
    #[inline]
    fn from(point: &Point<T, D>) -> [T; D] {
        point.to_array()
    }
}
