//! Seeded point generation for tests and benchmarks.
//!
//! Every generator takes an explicit seed so that failing scenarios can be
//! replayed exactly.

use rand::distr::uniform::SampleUniform;
use rand::{Rng, SeedableRng};

use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::{Coordinate, CoordinateScalar};

use super::RandomPointGenerationError;
use super::conversions::{safe_coords_from_f64, safe_scalar_from_f64};
use super::norms::hypot;

/// Generates `n_points` points uniformly in the box `[range.0, range.1)^D`.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidRange`] if `range.0 >= range.1`.
///
/// ```
/// use simplicial::geometry::util::generate_random_points_seeded;
///
/// let a = generate_random_points_seeded::<f64, 3>(20, (-1.0, 1.0), 7).unwrap();
/// let b = generate_random_points_seeded::<f64, 3>(20, (-1.0, 1.0), 7).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn generate_random_points_seeded<T: CoordinateScalar + SampleUniform, const D: usize>(
    n_points: usize,
    range: (T, T),
    seed: u64,
) -> Result<Vec<Point<T, D>>, RandomPointGenerationError> {
    if range.0 >= range.1 {
        return Err(RandomPointGenerationError::InvalidRange {
            min: format!("{:?}", range.0),
            max: format!("{:?}", range.1),
        });
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(n_points);
    for _ in 0..n_points {
        let coords = [T::zero(); D].map(|_| rng.random_range(range.0..range.1));
        points.push(Point::new(coords));
    }
    Ok(points)
}

/// Generates `n_points` points on the sphere of the given `radius` centered at
/// the origin. Useful for co-spherical (degenerate) Delaunay inputs.
///
/// Directions are normalized Gaussian-like samples built from sums of
/// uniforms, which is uniform enough for stress testing.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidRange`] for a non-positive
/// radius and [`RandomPointGenerationError::Conversion`] if a coordinate does
/// not fit in `T`.
pub fn generate_points_on_sphere_seeded<T: CoordinateScalar, const D: usize>(
    n_points: usize,
    radius: f64,
    seed: u64,
) -> Result<Vec<Point<T, D>>, RandomPointGenerationError> {
    if radius.partial_cmp(&0.0) != Some(std::cmp::Ordering::Greater) {
        return Err(RandomPointGenerationError::InvalidRange {
            min: "0.0".to_string(),
            max: format!("{radius:?}"),
        });
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(n_points);
    while points.len() < n_points {
        let direction: [f64; D] =
            [0.0; D].map(|_| (0..4).map(|_| rng.random_range(-1.0..1.0)).sum::<f64>());
        let length = hypot(&direction);
        if length < 1e-6 {
            continue;
        }
        let coords: [T; D] = safe_coords_from_f64(direction.map(|value| radius * value / length))?;
        points.push(Point::new(coords));
    }
    Ok(points)
}

/// Generates a regular grid of `points_per_dim^D` points with the given
/// spacing, translated by `offset`.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidPointCount`] when
/// `points_per_dim` is zero.
///
/// ```
/// use simplicial::geometry::util::generate_grid_points;
///
/// let grid = generate_grid_points::<f64, 2>(3, 1.0, [0.0, 0.0]).unwrap();
/// assert_eq!(grid.len(), 9);
/// ```
pub fn generate_grid_points<T: CoordinateScalar, const D: usize>(
    points_per_dim: usize,
    spacing: T,
    offset: [T; D],
) -> Result<Vec<Point<T, D>>, RandomPointGenerationError> {
    if points_per_dim == 0 {
        return Err(RandomPointGenerationError::InvalidPointCount { n_points: 0 });
    }

    let total = (0..D).fold(1usize, |acc, _| acc.saturating_mul(points_per_dim));
    let mut points = Vec::with_capacity(total);
    // mixed-radix counter over grid indices
    let mut index = [0usize; D];
    for _ in 0..total {
        let mut coords = offset;
        for (axis, &i) in index.iter().enumerate() {
            let step: T = safe_scalar_from_f64(i as f64)?;
            coords[axis] = coords[axis] + step * spacing;
        }
        points.push(Point::new(coords));

        for digit in &mut index {
            *digit += 1;
            if *digit < points_per_dim {
                break;
            }
            *digit = 0;
        }
    }
    Ok(points)
}
