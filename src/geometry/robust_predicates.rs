//! Predicates with consensus refinement for near-degenerate input.
//!
//! Every matrix evaluated here is the normalized orientation or lifted matrix
//! of [`predicates`](super::predicates). Its entries do not change under
//! uniform scaling of the input, and all thresholds below are pure numbers.
//!
//! The robust variants accept the determinant of the matrix based at the
//! first vertex when it exceeds `exact_arithmetic_threshold` times its
//! Hadamard bound. Otherwise the matrix is rebuilt from up to
//! `max_refinement_iterations + 1` base vertices, each row is normalized to
//! unit length, and the resulting determinant (bounded by one in magnitude)
//! is compared to `base_tolerance + relative_tolerance_factor`. The
//! rebuilds differ only in rounding, so they are not independent estimates;
//! requiring all of them to agree filters out signs that flip under a change
//! of base. Any zero or disagreement yields a deterministic tie
//! (`DEGENERATE` / `BOUNDARY`).

use nalgebra::DMatrix;
use num_traits::cast;

use super::predicates::{
    InSphere, Orientation, hadamard_tolerance, lifted_matrix, orientation_matrix,
    points_to_rows,
};
use crate::core::collections::SmallBuffer;
use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};
use crate::geometry::util::{safe_coords_to_f64, safe_scalar_to_f64};
use crate::geometry::weighted_point::WeightedPoint;

/// Configuration for robust geometric predicates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustPredicateConfig<T> {
    /// Cutoff on the row-normalized determinant, which lies in `[-1, 1]`.
    pub base_tolerance: T,
    /// Relative tolerance factor, multiplied by the Hadamard bound of the
    /// normalized matrix.
    pub relative_tolerance_factor: T,
    /// Maximum number of additional base vertices used for refinement.
    pub max_refinement_iterations: usize,
    /// A determinant larger than this fraction of its Hadamard bound is
    /// accepted without refinement.
    pub exact_arithmetic_threshold: T,
}

impl<T: CoordinateScalar> Default for RobustPredicateConfig<T> {
    fn default() -> Self {
        config_presets::general_triangulation()
    }
}

/// Tolerances of a [`RobustPredicateConfig`] converted to `f64` once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedConfig {
    base_tolerance: f64,
    relative_tolerance_factor: f64,
    max_refinement_iterations: usize,
    exact_arithmetic_threshold: f64,
}

impl<T: CoordinateScalar> TryFrom<&RobustPredicateConfig<T>> for ResolvedConfig {
    type Error = CoordinateConversionError;

    fn try_from(config: &RobustPredicateConfig<T>) -> Result<Self, Self::Error> {
        Ok(Self {
            base_tolerance: safe_scalar_to_f64(config.base_tolerance)?,
            relative_tolerance_factor: safe_scalar_to_f64(config.relative_tolerance_factor)?,
            max_refinement_iterations: config.max_refinement_iterations,
            exact_arithmetic_threshold: safe_scalar_to_f64(config.exact_arithmetic_threshold)?,
        })
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            base_tolerance: f64::default_tolerance(),
            relative_tolerance_factor: 1e-12,
            max_refinement_iterations: 3,
            exact_arithmetic_threshold: 1e-10,
        }
    }
}

/// Sign of a determinant after normalizing every row to unit length.
///
/// The normalized determinant is at most one in magnitude, so the cutoff
/// `base_tolerance + relative_tolerance_factor` is a fraction of the largest
/// possible value.
fn conditioned_sign(mut matrix: DMatrix<f64>, config: &ResolvedConfig) -> i8 {
    for mut row in matrix.row_iter_mut() {
        let norm = row.norm();
        if norm == 0.0 || !norm.is_finite() {
            return 0;
        }
        row /= norm;
    }
    let det = matrix.determinant();
    let tolerance = config.base_tolerance + config.relative_tolerance_factor;
    if det > tolerance {
        1
    } else if det < -tolerance {
        -1
    } else {
        0
    }
}

/// Fast-path sign: `Some` when the determinant is clearly away from zero.
fn decisive_sign(matrix: &DMatrix<f64>, config: &ResolvedConfig) -> (Option<i8>, f64) {
    let det = matrix.determinant();
    let bound: f64 = matrix.row_iter().map(|row| row.norm()).product();
    let tolerance = hadamard_tolerance(
        matrix,
        config.base_tolerance,
        config.relative_tolerance_factor,
    );
    if !det.is_finite() {
        return (None, det);
    }
    let decisive = config.exact_arithmetic_threshold.mul_add(bound, tolerance);
    if det > decisive {
        (Some(1), det)
    } else if det < -decisive {
        (Some(-1), det)
    } else {
        (None, det)
    }
}

/// Unanimous sign over several bases, each corrected by the base parity.
fn consensus_sign(
    vertex_count: usize,
    config: &ResolvedConfig,
    build: impl Fn(usize) -> DMatrix<f64>,
) -> i8 {
    let attempts = vertex_count.min(config.max_refinement_iterations + 1).max(1);
    let mut agreed: Option<i8> = None;
    for base in 0..attempts {
        let mut sign = conditioned_sign(build(base), config);
        if base % 2 == 1 {
            sign = -sign;
        }
        if sign == 0 {
            return 0;
        }
        match agreed {
            None => agreed = Some(sign),
            Some(previous) if previous != sign => return 0,
            Some(_) => {}
        }
    }
    agreed.unwrap_or(0)
}

/// Robust orientation of `k + 1` rows in a `k`-dimensional frame.
#[must_use]
pub fn robust_orientation_of_rows(rows: &[&[f64]], config: &ResolvedConfig) -> Orientation {
    if rows.len() <= 1 {
        return Orientation::POSITIVE;
    }
    let (fast, _) = decisive_sign(&orientation_matrix(rows, 0), config);
    let sign = fast.unwrap_or_else(|| {
        consensus_sign(rows.len(), config, |base| orientation_matrix(rows, base))
    });
    match sign {
        1 => Orientation::POSITIVE,
        -1 => Orientation::NEGATIVE,
        _ => Orientation::DEGENERATE,
    }
}

/// Robust power-sphere side test of `test` against the weighted simplex `rows`.
#[must_use]
pub fn robust_power_side_of_rows(
    rows: &[&[f64]],
    weights: &[f64],
    test: &[f64],
    test_weight: f64,
    config: &ResolvedConfig,
) -> InSphere {
    let orientation = robust_orientation_of_rows(rows, config);
    let orient_sign: i8 = match orientation {
        Orientation::POSITIVE => 1,
        Orientation::NEGATIVE => -1,
        Orientation::DEGENERATE => return InSphere::BOUNDARY,
    };
    let (fast, _) = decisive_sign(&lifted_matrix(rows, weights, test, test_weight, 0), config);
    let sign = fast.unwrap_or_else(|| {
        consensus_sign(rows.len(), config, |base| {
            lifted_matrix(rows, weights, test, test_weight, base)
        })
    });
    match sign * orient_sign {
        s if s < 0 => InSphere::INSIDE,
        s if s > 0 => InSphere::OUTSIDE,
        _ => InSphere::BOUNDARY,
    }
}

/// Robust orientation of a full-dimensional simplex.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if the point count is not `D + 1` or
/// a coordinate or tolerance cannot be converted to `f64`.
///
/// ```
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::traits::coordinate::Coordinate;
/// use simplicial::geometry::predicates::Orientation;
/// use simplicial::geometry::robust_predicates::{config_presets, robust_orientation};
///
/// let simplex = [Point::new([0.0, 0.0]), Point::new([1.0, 0.0]), Point::new([0.0, 1.0])];
/// let config = config_presets::general_triangulation::<f64>();
/// assert_eq!(robust_orientation(&simplex, &config).unwrap(), Orientation::POSITIVE);
/// ```
pub fn robust_orientation<T, const D: usize>(
    simplex_points: &[Point<T, D>],
    config: &RobustPredicateConfig<T>,
) -> Result<Orientation, CoordinateConversionError>
where
    T: CoordinateScalar,
{
    check_count(simplex_points.len(), D + 1)?;
    let resolved = ResolvedConfig::try_from(config)?;
    let rows = points_to_rows(simplex_points.iter().copied())?;
    let slices: SmallBuffer<&[f64], 8> = rows.iter().map(<[f64; D]>::as_slice).collect();
    Ok(robust_orientation_of_rows(&slices, &resolved))
}

/// Robust in-sphere test.
///
/// # Errors
///
/// Same conditions as [`robust_orientation`].
pub fn robust_insphere<T, const D: usize>(
    simplex_points: &[Point<T, D>],
    test_point: &Point<T, D>,
    config: &RobustPredicateConfig<T>,
) -> Result<InSphere, CoordinateConversionError>
where
    T: CoordinateScalar,
{
    let weighted: SmallBuffer<WeightedPoint<T, D>, 8> = simplex_points
        .iter()
        .copied()
        .map(WeightedPoint::unweighted)
        .collect();
    robust_power_test(&weighted, &WeightedPoint::unweighted(*test_point), config)
}

/// Robust power test.
///
/// # Errors
///
/// Same conditions as [`robust_orientation`].
pub fn robust_power_test<T, const D: usize>(
    simplex_points: &[WeightedPoint<T, D>],
    test: &WeightedPoint<T, D>,
    config: &RobustPredicateConfig<T>,
) -> Result<InSphere, CoordinateConversionError>
where
    T: CoordinateScalar,
{
    check_count(simplex_points.len(), D + 1)?;
    let resolved = ResolvedConfig::try_from(config)?;
    let rows = points_to_rows(simplex_points.iter().map(|wp| *wp.point()))?;
    let weights: SmallBuffer<f64, 8> = simplex_points
        .iter()
        .map(|wp| safe_scalar_to_f64(wp.weight()))
        .collect::<Result<_, _>>()?;
    let test_row = safe_coords_to_f64(*test.point().coords())?;
    let slices: SmallBuffer<&[f64], 8> = rows.iter().map(<[f64; D]>::as_slice).collect();
    Ok(robust_power_side_of_rows(
        &slices,
        &weights,
        &test_row,
        safe_scalar_to_f64(test.weight())?,
        &resolved,
    ))
}

fn check_count(actual: usize, expected: usize) -> Result<(), CoordinateConversionError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CoordinateConversionError::ConversionFailed {
            coordinate_index: 0,
            coordinate_value: format!("Expected {expected} points, got {actual}"),
            from_type: "point count",
            to_type: "valid simplex",
        })
    }
}

/// Ready-made configurations.
pub mod config_presets {
    use super::{CoordinateScalar, RobustPredicateConfig, cast};

    /// Balanced configuration for general-purpose triangulation.
    #[must_use]
    pub fn general_triangulation<T: CoordinateScalar>() -> RobustPredicateConfig<T> {
        RobustPredicateConfig {
            base_tolerance: T::default_tolerance(),
            relative_tolerance_factor: cast(1e-12).unwrap_or_else(T::default_tolerance),
            max_refinement_iterations: 3,
            exact_arithmetic_threshold: cast(1e-10).unwrap_or_else(T::default_tolerance),
        }
    }

    /// Stricter tolerances; ties are reported less often.
    #[must_use]
    pub fn high_precision<T: CoordinateScalar>() -> RobustPredicateConfig<T> {
        let base_tol = T::default_tolerance();
        RobustPredicateConfig {
            base_tolerance: base_tol / cast(100.0).unwrap_or_else(T::one),
            relative_tolerance_factor: cast(1e-14).unwrap_or(base_tol),
            max_refinement_iterations: 5,
            exact_arithmetic_threshold: cast(1e-12).unwrap_or(base_tol),
        }
    }

    /// Lenient tolerances for heavily degenerate input (grids, co-spherical sets).
    #[must_use]
    pub fn degenerate_robust<T: CoordinateScalar>() -> RobustPredicateConfig<T> {
        let base_tol = T::default_tolerance();
        RobustPredicateConfig {
            base_tolerance: base_tol * cast(100.0).unwrap_or_else(T::one),
            relative_tolerance_factor: cast(1e-10).unwrap_or(base_tol),
            max_refinement_iterations: 2,
            exact_arithmetic_threshold: cast(1e-8).unwrap_or(base_tol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::predicates::{insphere, simplex_orientation};
    use crate::geometry::traits::coordinate::Coordinate;
    use crate::geometry::util::generate_random_points_seeded;

    #[test]
    fn presets_are_ordered_by_strictness() {
        let general = config_presets::general_triangulation::<f64>();
        let strict = config_presets::high_precision::<f64>();
        let lenient = config_presets::degenerate_robust::<f64>();
        assert!(strict.base_tolerance < general.base_tolerance);
        assert!(lenient.base_tolerance > general.base_tolerance);
        assert!(strict.max_refinement_iterations > lenient.max_refinement_iterations);
        assert_eq!(RobustPredicateConfig::<f64>::default(), general);
    }

    #[test]
    fn robust_and_fast_agree_on_well_conditioned_input() {
        let config = config_presets::general_triangulation::<f64>();
        let points = generate_random_points_seeded::<f64, 3>(40, (-10.0, 10.0), 5).unwrap();
        for window in points.windows(5) {
            let simplex = &window[..4];
            let fast = simplex_orientation(simplex).unwrap();
            let robust = robust_orientation(simplex, &config).unwrap();
            assert_eq!(fast, robust);
            if fast != Orientation::DEGENERATE {
                assert_eq!(
                    insphere(simplex, window[4]).unwrap(),
                    robust_insphere(simplex, &window[4], &config).unwrap()
                );
            }
        }
    }

    #[test]
    fn nearly_collinear_points_are_a_tie() {
        let config = config_presets::degenerate_robust::<f64>();
        let simplex = [
            Point::new([0.0, 0.0]),
            Point::new([1.0, 1.0]),
            Point::new([2.0, 2.0 + 1e-14]),
        ];
        assert_eq!(
            robust_orientation(&simplex, &config).unwrap(),
            Orientation::DEGENERATE
        );
    }

    #[test]
    fn cocircular_points_are_on_the_boundary() {
        let config = config_presets::general_triangulation::<f64>();
        let square = [
            Point::new([0.0, 0.0]),
            Point::new([1.0, 0.0]),
            Point::new([1.0, 1.0]),
        ];
        assert_eq!(
            robust_insphere(&square, &Point::new([0.0, 1.0]), &config).unwrap(),
            InSphere::BOUNDARY
        );
        assert_eq!(
            robust_insphere(&square, &Point::new([0.5, 0.5]), &config).unwrap(),
            InSphere::INSIDE
        );
    }

    #[test]
    fn robust_insphere_ignores_coordinate_scale_5d() {
        let config = config_presets::general_triangulation::<f64>();
        for seed in 0..20 {
            let points = generate_random_points_seeded::<f64, 5>(6, (-1.0, 1.0), seed).unwrap();
            if robust_orientation(&points, &config).unwrap() == Orientation::DEGENERATE {
                continue;
            }
            for scale in [1e-3, 1.0, 100.0, 1e3] {
                let simplex: Vec<Point<f64, 5>> = points
                    .iter()
                    .map(|p| Point::new(p.coords().map(|c| c * scale)))
                    .collect();
                let mut centroid = [0.0; 5];
                for p in &simplex {
                    for (sum, c) in centroid.iter_mut().zip(p.coords()) {
                        *sum += c / 6.0;
                    }
                }
                assert_eq!(
                    robust_insphere(&simplex, &Point::new(centroid), &config).unwrap(),
                    InSphere::INSIDE,
                    "seed {seed}, scale {scale}"
                );
            }
        }
    }

    #[test]
    fn robust_power_test_matches_weights() {
        let config = config_presets::general_triangulation::<f64>();
        let simplex = [
            WeightedPoint::new(Point::new([0.0, 0.0]), 0.0),
            WeightedPoint::new(Point::new([2.0, 0.0]), 0.0),
            WeightedPoint::new(Point::new([0.0, 2.0]), 0.0),
        ];
        let light = WeightedPoint::new(Point::new([3.0, 3.0]), 0.0);
        let heavy = WeightedPoint::new(Point::new([3.0, 3.0]), 20.0);
        assert_eq!(
            robust_power_test(&simplex, &light, &config).unwrap(),
            InSphere::OUTSIDE
        );
        assert_eq!(
            robust_power_test(&simplex, &heavy, &config).unwrap(),
            InSphere::INSIDE
        );
    }
}
