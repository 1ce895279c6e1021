//! Norms on coordinate arrays.

use num_traits::Float;

use crate::geometry::traits::coordinate::CoordinateScalar;

/// Sum of squared coordinates.
///
/// ```
/// use simplicial::geometry::util::squared_norm;
///
/// assert_eq!(squared_norm(&[1.0, 2.0, 2.0]), 9.0);
/// ```
pub fn squared_norm<T, const D: usize>(coords: &[T; D]) -> T
where
    T: CoordinateScalar,
{
    coords.iter().fold(T::zero(), |acc, &x| acc + x * x)
}

/// Squared Euclidean distance between two coordinate arrays.
pub fn squared_distance<T, const D: usize>(a: &[T; D], b: &[T; D]) -> T
where
    T: CoordinateScalar,
{
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + (x - y) * (x - y))
}

/// Euclidean norm, scaled by the largest component to avoid overflow.
///
/// ```
/// use simplicial::geometry::util::hypot;
///
/// assert_eq!(hypot(&[3.0, 4.0]), 5.0);
/// assert_eq!(hypot(&[1.0, 1.0, 1.0, 1.0]), 2.0);
/// ```
pub fn hypot<T, const D: usize>(coords: &[T; D]) -> T
where
    T: CoordinateScalar,
{
    let max_abs = coords
        .iter()
        .map(|&x| Float::abs(x))
        .fold(T::zero(), Float::max);

    if max_abs == T::zero() {
        return T::zero();
    }

    let sum_of_scaled_squares = coords
        .iter()
        .map(|&x| {
            let scaled = x / max_abs;
            scaled * scaled
        })
        .fold(T::zero(), |acc, x| acc + x);

    max_abs * Float::sqrt(sum_of_scaled_squares)
}
