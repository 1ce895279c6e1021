//! Checked conversions between coordinate scalars and `f64`.
//!
//! All predicates evaluate their determinants in `f64`. These helpers reject
//! non-finite input up front so a NaN never reaches a determinant.

use num_traits::cast;

use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::{Coordinate, CoordinateConversionError, CoordinateScalar};

fn safe_cast_to_f64<T: CoordinateScalar>(
    value: T,
    coordinate_index: usize,
) -> Result<f64, CoordinateConversionError> {
    if !value.is_finite_generic() {
        return Err(CoordinateConversionError::NonFiniteValue {
            coordinate_index,
            coordinate_value: format!("{value:?}"),
        });
    }

    cast(value).ok_or_else(|| CoordinateConversionError::ConversionFailed {
        coordinate_index,
        coordinate_value: format!("{value:?}"),
        from_type: std::any::type_name::<T>(),
        to_type: "f64",
    })
}

fn safe_cast_from_f64<T: CoordinateScalar>(
    value: f64,
    coordinate_index: usize,
) -> Result<T, CoordinateConversionError> {
    if !value.is_finite() {
        return Err(CoordinateConversionError::NonFiniteValue {
            coordinate_index,
            coordinate_value: format!("{value:?}"),
        });
    }

    let converted: T = cast(value).ok_or_else(|| CoordinateConversionError::ConversionFailed {
        coordinate_index,
        coordinate_value: format!("{value:?}"),
        from_type: "f64",
        to_type: std::any::type_name::<T>(),
    })?;
    // f64 -> f32 saturates to infinity instead of failing
    if converted.is_finite_generic() {
        Ok(converted)
    } else {
        Err(CoordinateConversionError::NonFiniteValue {
            coordinate_index,
            coordinate_value: format!("{converted:?}"),
        })
    }
}

/// Converts a coordinate array to `f64`.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if any coordinate is non-finite or
/// cannot be cast.
///
/// ```
/// use simplicial::geometry::util::safe_coords_to_f64;
///
/// assert_eq!(safe_coords_to_f64([1.5f32, 2.5]).unwrap(), [1.5, 2.5]);
/// assert!(safe_coords_to_f64([f64::NAN]).is_err());
/// ```
pub fn safe_coords_to_f64<T: CoordinateScalar, const D: usize>(
    coords: [T; D],
) -> Result<[f64; D], CoordinateConversionError> {
    let mut result = [0.0_f64; D];
    for (i, &coord) in coords.iter().enumerate() {
        result[i] = safe_cast_to_f64(coord, i)?;
    }
    Ok(result)
}

/// Converts an `f64` coordinate array to `T`.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if any value is non-finite in `T`.
pub fn safe_coords_from_f64<T: CoordinateScalar, const D: usize>(
    coords: [f64; D],
) -> Result<[T; D], CoordinateConversionError> {
    let mut result = [T::zero(); D];
    for (i, &coord) in coords.iter().enumerate() {
        result[i] = safe_cast_from_f64(coord, i)?;
    }
    Ok(result)
}

/// Converts a single scalar to `f64`.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if `value` is non-finite.
pub fn safe_scalar_to_f64<T: CoordinateScalar>(value: T) -> Result<f64, CoordinateConversionError> {
    safe_cast_to_f64(value, 0)
}

/// Converts a single `f64` to `T`.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if the value is non-finite in `T`.
pub fn safe_scalar_from_f64<T: CoordinateScalar>(
    value: f64,
) -> Result<T, CoordinateConversionError> {
    safe_cast_from_f64(value, 0)
}

/// Converts a point to an `f64` coordinate array.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if any coordinate is non-finite.
pub fn point_to_f64<T: CoordinateScalar, const D: usize>(
    point: &Point<T, D>,
) -> Result<[f64; D], CoordinateConversionError> {
    safe_coords_to_f64(point.to_array())
}
