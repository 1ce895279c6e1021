//! Geometric predicates for d-dimensional simplices.
//!
//! All predicates work on difference matrices evaluated in `f64`:
//!
//! ```text
//! orientation(p₀..p_k)   = sign det | p₁-p₀ ... p_k-p₀ |
//!
//! power side(p₀..p_k; q) = sign det | pᵢ-p₀   |pᵢ-p₀|² - (wᵢ-w₀) |   i = 1..k
//!                                   | q -p₀   |q -p₀|² - (w_q-w₀) |
//! ```
//!
//! The second determinant equals `orient · (|q - c|² - r² - w_q)` up to a
//! positive factor, where `(c, r)` is the sphere orthogonal to the weighted
//! vertices. The query is therefore `INSIDE` (in conflict) exactly when the
//! determinant has the opposite sign of the orientation. Plain in-sphere is
//! the special case of zero weights.
//!
//! Rows may live in any `k`-dimensional frame, which is how cells of a
//! triangulation whose dimension is below the ambient one are evaluated.
//!
//! Both matrices are normalized before evaluation. The orientation matrix is
//! divided by its largest row norm; the lifted matrix has its spatial columns
//! divided by the largest spatial row norm and its lift column by the largest
//! lift magnitude. Uniform scaling of the input (coordinates by `s`, weights
//! by `s²`) therefore leaves the evaluated matrix unchanged, and so does a
//! translation or rotation.
//!
//! Results within `base + rel · Π‖rowᵢ‖` of zero on the normalized matrix are
//! reported as [`Orientation::DEGENERATE`] / [`InSphere::BOUNDARY`]. Callers
//! treat those as deterministic ties: not positive, not in conflict.

use nalgebra::DMatrix;

use crate::core::collections::SmallBuffer;
use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};
use crate::geometry::util::{safe_coords_to_f64, safe_scalar_to_f64};
use crate::geometry::weighted_point::WeightedPoint;

/// Relative tolerance factor applied to the Hadamard bound of a determinant.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-12;

/// Position of a point relative to a (power) circumsphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InSphere {
    /// The point is outside the sphere.
    OUTSIDE,
    /// The point is on the sphere within tolerance.
    BOUNDARY,
    /// The point is strictly inside the sphere.
    INSIDE,
}

impl std::fmt::Display for InSphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

/// Orientation of a simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Negative determinant.
    NEGATIVE,
    /// Determinant within tolerance of zero.
    DEGENERATE,
    /// Positive determinant.
    POSITIVE,
}

impl Orientation {
    /// The orientation obtained by swapping two vertices.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::NEGATIVE => Self::POSITIVE,
            Self::DEGENERATE => Self::DEGENERATE,
            Self::POSITIVE => Self::NEGATIVE,
        }
    }

    /// Classifies a determinant against a non-negative tolerance.
    #[must_use]
    pub fn from_determinant(det: f64, tolerance: f64) -> Self {
        if det > tolerance {
            Self::POSITIVE
        } else if det < -tolerance {
            Self::NEGATIVE
        } else {
            Self::DEGENERATE
        }
    }

    const fn sign(self) -> f64 {
        match self {
            Self::NEGATIVE => -1.0,
            Self::DEGENERATE => 0.0,
            Self::POSITIVE => 1.0,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

// =============================================================================
// ROW-LEVEL PREDICATES
// =============================================================================

/// Tolerance `base + rel · Π‖rowᵢ‖` derived from the Hadamard bound of `matrix`.
#[must_use]
pub fn hadamard_tolerance(matrix: &DMatrix<f64>, base_tol: f64, rel_factor: f64) -> f64 {
    let bound: f64 = matrix.row_iter().map(|row| row.norm()).product();
    rel_factor.mul_add(bound, base_tol)
}

/// `k × k` difference matrix of `k + 1` rows, based at `rows[base]` and
/// divided by its largest row norm.
pub(crate) fn orientation_matrix(rows: &[&[f64]], base: usize) -> DMatrix<f64> {
    let k = rows.len().saturating_sub(1);
    let origin = rows[base];
    let mut matrix = DMatrix::zeros(k, k);
    for (r, row) in rows
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != base)
        .map(|(_, row)| row)
        .enumerate()
    {
        for j in 0..k {
            matrix[(r, j)] = row[j] - origin[j];
        }
    }
    let largest = matrix
        .row_iter()
        .map(|row| row.norm())
        .fold(0.0_f64, f64::max);
    if largest > 0.0 && largest.is_finite() {
        matrix /= largest;
    }
    matrix
}

/// `(k + 1) × (k + 1)` lifted difference matrix, based at `rows[base]`.
///
/// The spatial columns are divided by the largest spatial row norm and the
/// lift column by its largest magnitude. Both factors are positive, so the
/// sign of the determinant is unchanged.
pub(crate) fn lifted_matrix(
    rows: &[&[f64]],
    weights: &[f64],
    test: &[f64],
    test_weight: f64,
    base: usize,
) -> DMatrix<f64> {
    let k = rows.len().saturating_sub(1);
    let origin = rows[base];
    let origin_weight = weights[base];
    let mut matrix = DMatrix::zeros(k + 1, k + 1);
    let others = rows
        .iter()
        .zip(weights.iter())
        .enumerate()
        .filter(|(i, _)| *i != base)
        .map(|(_, (row, &w))| (*row, w))
        .chain(std::iter::once((test, test_weight)));
    let mut spatial_sq = 0.0_f64;
    let mut lift_scale = 0.0_f64;
    for (r, (row, w)) in others.enumerate() {
        let mut squared = 0.0;
        for j in 0..k {
            let d = row[j] - origin[j];
            matrix[(r, j)] = d;
            squared = d.mul_add(d, squared);
        }
        let lift = squared - (w - origin_weight);
        matrix[(r, k)] = lift;
        spatial_sq = spatial_sq.max(squared);
        lift_scale = lift_scale.max(lift.abs());
    }

    let spatial_scale = spatial_sq.sqrt();
    if spatial_scale > 0.0 && spatial_scale.is_finite() {
        for r in 0..=k {
            for j in 0..k {
                matrix[(r, j)] /= spatial_scale;
            }
        }
    }
    if lift_scale > 0.0 && lift_scale.is_finite() {
        for r in 0..=k {
            matrix[(r, k)] /= lift_scale;
        }
    }
    matrix
}

pub(crate) fn orientation_of_rows_at(
    rows: &[&[f64]],
    base: usize,
    base_tol: f64,
    rel_factor: f64,
) -> Orientation {
    if rows.len() <= 1 {
        // a single point is a positively oriented 0-simplex
        return Orientation::POSITIVE;
    }
    let matrix = orientation_matrix(rows, base);
    let tolerance = hadamard_tolerance(&matrix, base_tol, rel_factor);
    let det = matrix.determinant();
    if !det.is_finite() {
        return Orientation::DEGENERATE;
    }
    let orientation = Orientation::from_determinant(det, tolerance);
    // basing at row j permutes the underlying determinant by (-1)^j
    if base % 2 == 1 {
        orientation.reversed()
    } else {
        orientation
    }
}

pub(crate) fn power_side_of_rows_at(
    rows: &[&[f64]],
    weights: &[f64],
    test: &[f64],
    test_weight: f64,
    base: usize,
    base_tol: f64,
    rel_factor: f64,
) -> InSphere {
    let orientation = orientation_of_rows_at(rows, base, base_tol, rel_factor);
    if orientation == Orientation::DEGENERATE {
        return InSphere::BOUNDARY;
    }
    let matrix = lifted_matrix(rows, weights, test, test_weight, base);
    let tolerance = hadamard_tolerance(&matrix, base_tol, rel_factor);
    let det = matrix.determinant();
    if !det.is_finite() {
        return InSphere::BOUNDARY;
    }
    let det = if base % 2 == 1 { -det } else { det };
    let oriented = det * orientation.sign();
    if oriented < -tolerance {
        InSphere::INSIDE
    } else if oriented > tolerance {
        InSphere::OUTSIDE
    } else {
        InSphere::BOUNDARY
    }
}

/// Orientation of `k + 1` points given as rows of a `k`-dimensional frame.
///
/// A single row is a 0-simplex and is always [`Orientation::POSITIVE`].
///
/// ```
/// use simplicial::geometry::predicates::{orientation_of_rows, Orientation};
///
/// let rows: [&[f64]; 3] = [&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]];
/// assert_eq!(orientation_of_rows(&rows, 1e-15, 1e-12), Orientation::POSITIVE);
/// ```
#[must_use]
pub fn orientation_of_rows(rows: &[&[f64]], base_tol: f64, rel_factor: f64) -> Orientation {
    orientation_of_rows_at(rows, 0, base_tol, rel_factor)
}

/// Side of `test` relative to the power sphere of the weighted simplex `rows`
/// within its own `k`-dimensional frame. Zero weights give the in-sphere test.
///
/// A degenerate simplex yields [`InSphere::BOUNDARY`].
#[must_use]
pub fn power_side_of_rows(
    rows: &[&[f64]],
    weights: &[f64],
    test: &[f64],
    test_weight: f64,
    base_tol: f64,
    rel_factor: f64,
) -> InSphere {
    power_side_of_rows_at(rows, weights, test, test_weight, 0, base_tol, rel_factor)
}

// =============================================================================
// POINT-LEVEL PREDICATES
// =============================================================================

fn expect_simplex_size(actual: usize, expected: usize) -> Result<(), CoordinateConversionError> {
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

pub(crate) fn points_to_rows<T: CoordinateScalar, const D: usize>(
    points: impl IntoIterator<Item = Point<T, D>>,
) -> Result<SmallBuffer<[f64; D], 8>, CoordinateConversionError> {
    points
        .into_iter()
        .map(|p| safe_coords_to_f64(*p.coords()))
        .collect()
}

fn base_tolerance<T: CoordinateScalar>() -> Result<f64, CoordinateConversionError> {
    safe_scalar_to_f64(T::default_tolerance())
}

/// Orientation of a full-dimensional simplex of `D + 1` points.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if the point count is not `D + 1` or a
/// coordinate is non-finite.
///
/// # Example
///
/// ```
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::traits::coordinate::Coordinate;
/// use simplicial::geometry::predicates::{simplex_orientation, Orientation};
///
/// let simplex = [
///     Point::new([0.0, 0.0, 0.0]),
///     Point::new([1.0, 0.0, 0.0]),
///     Point::new([0.0, 1.0, 0.0]),
///     Point::new([0.0, 0.0, 1.0]),
/// ];
/// assert_eq!(simplex_orientation(&simplex).unwrap(), Orientation::POSITIVE);
/// ```
pub fn simplex_orientation<T, const D: usize>(
    simplex_points: &[Point<T, D>],
) -> Result<Orientation, CoordinateConversionError>
where
    T: CoordinateScalar,
{
    expect_simplex_size(simplex_points.len(), D + 1)?;
    let rows = points_to_rows(simplex_points.iter().copied())?;
    let slices: SmallBuffer<&[f64], 8> = rows.iter().map(<[f64; D]>::as_slice).collect();
    Ok(orientation_of_rows(
        &slices,
        base_tolerance::<T>()?,
        DEFAULT_RELATIVE_TOLERANCE,
    ))
}

/// In-sphere test of `test_point` against the circumsphere of `D + 1` points.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if the point count is not `D + 1` or a
/// coordinate is non-finite.
///
/// ```
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::traits::coordinate::Coordinate;
/// use simplicial::geometry::predicates::{insphere, InSphere};
///
/// let triangle = [Point::new([0.0, 0.0]), Point::new([1.0, 0.0]), Point::new([0.0, 1.0])];
/// assert_eq!(insphere(&triangle, Point::new([1.0, 1.0])).unwrap(), InSphere::BOUNDARY);
/// assert_eq!(insphere(&triangle, Point::new([0.4, 0.4])).unwrap(), InSphere::INSIDE);
/// assert_eq!(insphere(&triangle, Point::new([2.0, 2.0])).unwrap(), InSphere::OUTSIDE);
/// ```
pub fn insphere<T, const D: usize>(
    simplex_points: &[Point<T, D>],
    test_point: Point<T, D>,
) -> Result<InSphere, CoordinateConversionError>
where
    T: CoordinateScalar,
{
    expect_simplex_size(simplex_points.len(), D + 1)?;
    if simplex_points.contains(&test_point) {
        return Ok(InSphere::BOUNDARY);
    }
    let rows = points_to_rows(simplex_points.iter().copied())?;
    let test = safe_coords_to_f64(*test_point.coords())?;
    let slices: SmallBuffer<&[f64], 8> = rows.iter().map(<[f64; D]>::as_slice).collect();
    let weights: SmallBuffer<f64, 8> = std::iter::repeat_n(0.0, rows.len()).collect();
    Ok(power_side_of_rows(
        &slices,
        &weights,
        &test,
        0.0,
        base_tolerance::<T>()?,
        DEFAULT_RELATIVE_TOLERANCE,
    ))
}

/// Power test of `test` against the power sphere of `D + 1` weighted points.
///
/// `INSIDE` means the weighted test point is in conflict with the simplex.
///
/// # Errors
///
/// Returns [`CoordinateConversionError`] if the point count is not `D + 1`, or a
/// coordinate or weight is non-finite.
///
/// ```
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::traits::coordinate::Coordinate;
/// use simplicial::geometry::weighted_point::WeightedPoint;
/// use simplicial::geometry::predicates::{power_test, InSphere};
///
/// let simplex = [
///     WeightedPoint::new(Point::new([0.0, 0.0]), 0.0),
///     WeightedPoint::new(Point::new([2.0, 0.0]), 0.0),
///     WeightedPoint::new(Point::new([0.0, 2.0]), 0.0),
/// ];
/// // (3, 3) is outside the circumcircle but heavy enough to conflict
/// let heavy = WeightedPoint::new(Point::new([3.0, 3.0]), 20.0);
/// assert_eq!(power_test(&simplex, &heavy).unwrap(), InSphere::INSIDE);
/// ```
pub fn power_test<T, const D: usize>(
    simplex_points: &[WeightedPoint<T, D>],
    test: &WeightedPoint<T, D>,
) -> Result<InSphere, CoordinateConversionError>
where
    T: CoordinateScalar,
{
    expect_simplex_size(simplex_points.len(), D + 1)?;
    let rows = points_to_rows(simplex_points.iter().map(|wp| *wp.point()))?;
    let weights: SmallBuffer<f64, 8> = simplex_points
        .iter()
        .map(|wp| safe_scalar_to_f64(wp.weight()))
        .collect::<Result<_, _>>()?;
    let test_row = safe_coords_to_f64(*test.point().coords())?;
    let test_weight = safe_scalar_to_f64(test.weight())?;
    let slices: SmallBuffer<&[f64], 8> = rows.iter().map(<[f64; D]>::as_slice).collect();
    Ok(power_side_of_rows(
        &slices,
        &weights,
        &test_row,
        test_weight,
        base_tolerance::<T>()?,
        DEFAULT_RELATIVE_TOLERANCE,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::traits::coordinate::Coordinate;

    fn unit_simplex<const D: usize>() -> Vec<Point<f64, D>> {
        let mut points = vec![Point::origin()];
        for axis in 0..D {
            let mut coords = [0.0; D];
            coords[axis] = 1.0;
            points.push(Point::new(coords));
        }
        points
    }

    #[test]
    fn unit_simplices_are_positive_in_every_dimension() {
        assert_eq!(
            simplex_orientation(&unit_simplex::<2>()).unwrap(),
            Orientation::POSITIVE
        );
        assert_eq!(
            simplex_orientation(&unit_simplex::<3>()).unwrap(),
            Orientation::POSITIVE
        );
        assert_eq!(
            simplex_orientation(&unit_simplex::<5>()).unwrap(),
            Orientation::POSITIVE
        );
    }

    #[test]
    fn swapping_two_vertices_reverses_orientation() {
        let mut simplex = unit_simplex::<4>();
        simplex.swap(1, 3);
        assert_eq!(
            simplex_orientation(&simplex).unwrap(),
            Orientation::NEGATIVE
        );
        assert_eq!(Orientation::NEGATIVE.reversed(), Orientation::POSITIVE);
        assert_eq!(Orientation::DEGENERATE.reversed(), Orientation::DEGENERATE);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let simplex = [
            Point::new([0.0, 0.0]),
            Point::new([1.0, 1.0]),
            Point::new([3.0, 3.0]),
        ];
        assert_eq!(
            simplex_orientation(&simplex).unwrap(),
            Orientation::DEGENERATE
        );
        assert_eq!(
            insphere(&simplex, Point::new([1.0, 0.0])).unwrap(),
            InSphere::BOUNDARY
        );
    }

    #[test]
    fn insphere_is_independent_of_vertex_order() {
        let mut simplex = unit_simplex::<3>();
        let inside = Point::new([0.25, 0.25, 0.25]);
        let outside = Point::new([1.0, 1.0, 1.0]);
        assert_eq!(insphere(&simplex, inside).unwrap(), InSphere::INSIDE);
        assert_eq!(insphere(&simplex, outside).unwrap(), InSphere::BOUNDARY);
        simplex.swap(0, 2);
        assert_eq!(insphere(&simplex, inside).unwrap(), InSphere::INSIDE);
        assert_eq!(
            insphere(&simplex, Point::new([2.0, 0.0, 0.0])).unwrap(),
            InSphere::OUTSIDE
        );
    }

    #[test]
    fn wrong_point_count_is_an_error() {
        let simplex = unit_simplex::<2>();
        assert!(simplex_orientation(&simplex[..2]).is_err());
        assert!(insphere(&simplex[..2], Point::new([0.1, 0.1])).is_err());
    }

    #[test]
    fn power_test_weights_shift_the_sphere() {
        let simplex: Vec<_> = unit_simplex::<2>()
            .into_iter()
            .map(WeightedPoint::unweighted)
            .collect();
        let centroid = Point::new([1.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(
            power_test(&simplex, &WeightedPoint::new(centroid, 0.0)).unwrap(),
            InSphere::INSIDE
        );
        // a strongly negative weight makes the centroid lose against the vertices
        assert_eq!(
            power_test(&simplex, &WeightedPoint::new(centroid, -1.0)).unwrap(),
            InSphere::OUTSIDE
        );

        // heavy vertices push the orthogonal sphere outward
        let heavy: Vec<_> = unit_simplex::<2>()
            .into_iter()
            .map(|p| WeightedPoint::new(p, 1.0))
            .collect();
        assert_eq!(
            power_test(&heavy, &WeightedPoint::new(centroid, 0.0)).unwrap(),
            InSphere::OUTSIDE
        );
    }

    #[test]
    fn row_predicates_in_lower_dimensional_frames() {
        // a segment in a 1D frame
        let rows: [&[f64]; 2] = [&[0.0], &[2.0]];
        assert_eq!(orientation_of_rows(&rows, 1e-15, 1e-12), Orientation::POSITIVE);
        let weights = [0.0, 0.0];
        assert_eq!(
            power_side_of_rows(&rows, &weights, &[1.0], 0.0, 1e-15, 1e-12),
            InSphere::INSIDE
        );
        assert_eq!(
            power_side_of_rows(&rows, &weights, &[3.0], 0.0, 1e-15, 1e-12),
            InSphere::OUTSIDE
        );
        let reversed: [&[f64]; 2] = [&[2.0], &[0.0]];
        assert_eq!(
            orientation_of_rows(&reversed, 1e-15, 1e-12),
            Orientation::NEGATIVE
        );
        assert_eq!(
            power_side_of_rows(&reversed, &weights, &[1.0], 0.0, 1e-15, 1e-12),
            InSphere::INSIDE
        );
    }

    #[test]
    fn zero_dimensional_power_comparison() {
        let rows: [&[f64]; 1] = [&[]];
        assert_eq!(orientation_of_rows(&rows, 1e-15, 1e-12), Orientation::POSITIVE);
        assert_eq!(
            power_side_of_rows(&rows, &[1.0], &[], 2.0, 1e-15, 1e-12),
            InSphere::INSIDE
        );
        assert_eq!(
            power_side_of_rows(&rows, &[1.0], &[], 0.5, 1e-15, 1e-12),
            InSphere::OUTSIDE
        );
        assert_eq!(
            power_side_of_rows(&rows, &[0.0], &[], 0.0, 1e-15, 1e-12),
            InSphere::BOUNDARY
        );
    }

    #[test]
    fn rebasing_preserves_predicate_results() {
        let rows: [&[f64]; 4] = [&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0]];
        let weights = [0.0; 4];
        for base in 0..4 {
            assert_eq!(
                orientation_of_rows_at(&rows, base, 1e-15, 1e-12),
                Orientation::POSITIVE
            );
            assert_eq!(
                power_side_of_rows_at(&rows, &weights, &[0.2, 0.2, 0.2], 0.0, base, 1e-15, 1e-12),
                InSphere::INSIDE
            );
            assert_eq!(
                power_side_of_rows_at(&rows, &weights, &[2.0, 0.0, 0.0], 0.0, base, 1e-15, 1e-12),
                InSphere::OUTSIDE
            );
        }
    }

    fn scaled_simplex_5d(seed: u64, scale: f64) -> (Vec<Point<f64, 5>>, Point<f64, 5>) {
        let points =
            crate::geometry::util::generate_random_points_seeded::<f64, 5>(6, (-1.0, 1.0), seed)
                .unwrap();
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
        (simplex, Point::new(centroid))
    }

    #[test]
    fn centroid_is_inside_at_every_scale_5d() {
        for seed in 0..20 {
            let (unit, _) = scaled_simplex_5d(seed, 1.0);
            let orientation = simplex_orientation(&unit).unwrap();
            if orientation == Orientation::DEGENERATE {
                continue;
            }
            let far = insphere(&unit, Point::new([3.0; 5])).unwrap();
            for scale in [1e-3, 1.0, 100.0, 1e3] {
                let (simplex, centroid) = scaled_simplex_5d(seed, scale);
                assert_eq!(simplex_orientation(&simplex).unwrap(), orientation);
                assert_eq!(
                    insphere(&simplex, centroid).unwrap(),
                    InSphere::INSIDE,
                    "seed {seed}, scale {scale}"
                );
                assert_eq!(
                    insphere(&simplex, Point::new([3.0 * scale; 5])).unwrap(),
                    far,
                    "seed {seed}, scale {scale}"
                );
            }
        }
    }

    #[test]
    fn orientation_is_scale_invariant_4d() {
        let unit = unit_simplex::<4>();
        for scale in [1e-3, 1.0, 100.0, 1e3] {
            let scaled: Vec<_> = unit
                .iter()
                .map(|p| Point::new(p.coords().map(|c| c * scale + 7.0 * scale)))
                .collect();
            assert_eq!(
                simplex_orientation(&scaled).unwrap(),
                Orientation::POSITIVE,
                "scale {scale}"
            );
        }
    }

    #[test]
    fn power_test_is_scale_invariant_when_weights_scale_quadratically() {
        let unit: Vec<_> = unit_simplex::<4>()
            .into_iter()
            .map(|p| WeightedPoint::new(p, 0.1))
            .collect();
        let centroid = Point::new([0.2; 4]);
        for scale in [1e-3, 1.0, 100.0, 1e3] {
            let simplex: Vec<_> = unit
                .iter()
                .map(|wp| {
                    WeightedPoint::new(
                        Point::new(wp.point().coords().map(|c| c * scale)),
                        wp.weight() * scale * scale,
                    )
                })
                .collect();
            let center = Point::new(centroid.coords().map(|c| c * scale));
            assert_eq!(
                power_test(&simplex, &WeightedPoint::new(center, 0.0)).unwrap(),
                InSphere::INSIDE,
                "scale {scale}"
            );
            assert_eq!(
                power_test(&simplex, &WeightedPoint::new(center, -scale * scale)).unwrap(),
                InSphere::OUTSIDE,
                "scale {scale}"
            );
        }
    }

    #[test]
    fn lifted_matrix_does_not_depend_on_scale() {
        let rows: [&[f64]; 3] = [&[0.0, 0.0], &[3.0, 0.0], &[0.0, 2.0]];
        let scaled: [&[f64]; 3] = [&[0.0, 0.0], &[300.0, 0.0], &[0.0, 200.0]];
        let weights = [0.0; 3];
        let unit = lifted_matrix(&rows, &weights, &[1.0, 1.0], 0.0, 0);
        let big = lifted_matrix(&scaled, &weights, &[100.0, 100.0], 0.0, 0);
        assert!((unit - big).norm() < 1e-14);
    }

    #[test]
    fn hadamard_tolerance_scales_with_rows() {
        let m = DMatrix::from_row_slice(2, 2, &[3.0, 4.0, 0.0, 2.0]);
        let tol = hadamard_tolerance(&m, 0.0, 1.0);
        assert!((tol - 10.0).abs() < 1e-12);
    }
}
