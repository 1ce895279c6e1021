//! Geometric kernel abstraction.
//!
//! The [`Kernel`] trait is the only channel through which triangulations make
//! geometric decisions. Swapping [`FastKernel`] for [`RobustKernel`] changes
//! how near-degenerate configurations are classified without touching any
//! combinatorial code.

use core::marker::PhantomData;
use std::cmp::Ordering;

use crate::core::collections::SmallBuffer;
use crate::geometry::affine_hull::{AffineHull, LiftedPoint};
use crate::geometry::point::Point;
use crate::geometry::predicates::{
    DEFAULT_RELATIVE_TOLERANCE, InSphere, Orientation, insphere, orientation_of_rows,
    power_side_of_rows, power_test, simplex_orientation,
};
use crate::geometry::robust_predicates::{
    ResolvedConfig, RobustPredicateConfig, config_presets, robust_insphere,
    robust_orientation, robust_orientation_of_rows, robust_power_side_of_rows,
    robust_power_test,
};
use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};
use crate::geometry::util::{point_to_f64, safe_scalar_to_f64};
use crate::geometry::weighted_point::WeightedPoint;

/// Geometric predicates consumed by triangulations.
///
/// Full-dimensional predicates take `D + 1` points. The `*_in_frame`
/// predicates take rows of coordinates in some `k`-dimensional frame and are
/// used while the triangulation has not yet reached dimension `D`, or for
/// simplices that lie in a hyperplane of the current hull.
///
/// # Examples
///
/// ```
/// use simplicial::geometry::kernel::{FastKernel, Kernel};
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::predicates::{InSphere, Orientation};
/// use simplicial::geometry::traits::coordinate::Coordinate;
///
/// let kernel = FastKernel::<f64>::new();
/// let triangle = [
///     Point::new([0.0, 0.0]),
///     Point::new([1.0, 0.0]),
///     Point::new([0.5, 1.0]),
/// ];
/// assert_eq!(kernel.orientation(&triangle).unwrap(), Orientation::POSITIVE);
/// assert_eq!(
///     kernel.in_sphere(&triangle, &Point::new([0.5, 0.3])).unwrap(),
///     InSphere::INSIDE
/// );
/// ```
pub trait Kernel<const D: usize>: Clone {
    /// The scalar type used for coordinates.
    type Scalar: CoordinateScalar;

    /// Orientation of `D + 1` points.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateConversionError`] for a wrong point count or
    /// non-finite coordinates.
    fn orientation(
        &self,
        points: &[Point<Self::Scalar, D>],
    ) -> Result<Orientation, CoordinateConversionError>;

    /// Side of `test_point` relative to the circumsphere of `D + 1` points.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Kernel::orientation`].
    fn in_sphere(
        &self,
        simplex_points: &[Point<Self::Scalar, D>],
        test_point: &Point<Self::Scalar, D>,
    ) -> Result<InSphere, CoordinateConversionError>;

    /// Side of `test` relative to the power sphere of `D + 1` weighted points.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Kernel::orientation`].
    fn power_test(
        &self,
        simplex_points: &[WeightedPoint<Self::Scalar, D>],
        test: &WeightedPoint<Self::Scalar, D>,
    ) -> Result<InSphere, CoordinateConversionError>;

    /// Orientation of `k + 1` rows of a `k`-dimensional frame.
    fn orientation_in_frame(&self, rows: &[&[f64]]) -> Orientation;

    /// Power side test of `k + 1` weighted rows of a `k`-dimensional frame.
    fn power_side_in_frame(
        &self,
        rows: &[&[f64]],
        weights: &[f64],
        test: &[f64],
        test_weight: f64,
    ) -> InSphere;

    /// Power side test of a lower-dimensional weighted simplex within its own
    /// affine span. The query is assumed to lie in that span.
    ///
    /// The result does not depend on the vertex order or on the frame chosen
    /// for the span.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateConversionError`] for non-finite coordinates or weights.
    fn side_of_power_sphere_in_span(
        &self,
        simplex_points: &[WeightedPoint<Self::Scalar, D>],
        test: &WeightedPoint<Self::Scalar, D>,
    ) -> Result<InSphere, CoordinateConversionError> {
        let coords: SmallBuffer<[f64; D], 8> = simplex_points
            .iter()
            .map(|wp| point_to_f64(wp.point()))
            .collect::<Result<_, _>>()?;
        let weights: SmallBuffer<f64, 8> = simplex_points
            .iter()
            .map(|wp| safe_scalar_to_f64(wp.weight()))
            .collect::<Result<_, _>>()?;
        let frame = AffineHull::from_points(coords.iter());
        let lifted: SmallBuffer<LiftedPoint, 8> = coords.iter().map(|c| frame.project(c)).collect();
        if lifted
            .first()
            .is_none_or(|first| first.len() + 1 != lifted.len())
        {
            // the simplex does not span a flat of its own dimension
            return Ok(InSphere::BOUNDARY);
        }
        let test_lifted = frame.project(&point_to_f64(test.point())?);
        let rows: SmallBuffer<&[f64], 8> = lifted.iter().map(LiftedPoint::as_slice).collect();
        Ok(self.power_side_in_frame(
            &rows,
            &weights,
            &test_lifted,
            safe_scalar_to_f64(test.weight())?,
        ))
    }

    /// Lexicographic comparison of coordinates.
    fn compare_lexicographically(
        &self,
        a: &Point<Self::Scalar, D>,
        b: &Point<Self::Scalar, D>,
    ) -> Ordering {
        a.cmp(b)
    }

    /// Coordinates of `point` in the frame of `hull`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateConversionError`] for non-finite coordinates.
    fn construct_lifted_point(
        &self,
        hull: &AffineHull<D>,
        point: &Point<Self::Scalar, D>,
    ) -> Result<LiftedPoint, CoordinateConversionError> {
        Ok(hull.project(&point_to_f64(point)?))
    }
}

/// Plain floating-point kernel with adaptive tolerances.
#[derive(Clone, Copy, Default, Debug)]
pub struct FastKernel<T: CoordinateScalar> {
    _phantom: PhantomData<T>,
}

impl<T: CoordinateScalar> FastKernel<T> {
    /// Creates a new fast kernel.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }

    fn base_tolerance() -> f64 {
        safe_scalar_to_f64(T::default_tolerance()).unwrap_or(f64::EPSILON)
    }
}

impl<T, const D: usize> Kernel<D> for FastKernel<T>
where
    T: CoordinateScalar,
{
    type Scalar = T;

    fn orientation(
        &self,
        points: &[Point<Self::Scalar, D>],
    ) -> Result<Orientation, CoordinateConversionError> {
        simplex_orientation(points)
    }

    fn in_sphere(
        &self,
        simplex_points: &[Point<Self::Scalar, D>],
        test_point: &Point<Self::Scalar, D>,
    ) -> Result<InSphere, CoordinateConversionError> {
        insphere(simplex_points, *test_point)
    }

    fn power_test(
        &self,
        simplex_points: &[WeightedPoint<Self::Scalar, D>],
        test: &WeightedPoint<Self::Scalar, D>,
    ) -> Result<InSphere, CoordinateConversionError> {
        power_test(simplex_points, test)
    }

    fn orientation_in_frame(&self, rows: &[&[f64]]) -> Orientation {
        orientation_of_rows(rows, Self::base_tolerance(), DEFAULT_RELATIVE_TOLERANCE)
    }

    fn power_side_in_frame(
        &self,
        rows: &[&[f64]],
        weights: &[f64],
        test: &[f64],
        test_weight: f64,
    ) -> InSphere {
        power_side_of_rows(
            rows,
            weights,
            test,
            test_weight,
            Self::base_tolerance(),
            DEFAULT_RELATIVE_TOLERANCE,
        )
    }
}

/// Kernel backed by the consensus-refined robust predicates.
///
/// ```
/// use simplicial::geometry::kernel::{Kernel, RobustKernel};
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::predicates::Orientation;
/// use simplicial::geometry::robust_predicates::config_presets;
/// use simplicial::geometry::traits::coordinate::Coordinate;
///
/// let kernel = RobustKernel::<f64>::with_config(config_presets::high_precision()).unwrap();
/// let points = [Point::new([0.0, 0.0]), Point::new([1.0, 0.0]), Point::new([2.0, 1e-20])];
/// assert_eq!(kernel.orientation(&points).unwrap(), Orientation::DEGENERATE);
/// ```
#[derive(Clone, Debug)]
pub struct RobustKernel<T: CoordinateScalar> {
    config: RobustPredicateConfig<T>,
    resolved: ResolvedConfig,
}

impl<T: CoordinateScalar> RobustKernel<T> {
    /// Creates a robust kernel with [`config_presets::general_triangulation`].
    #[must_use]
    pub fn new() -> Self {
        let config = config_presets::general_triangulation();
        let resolved = ResolvedConfig::try_from(&config).unwrap_or_default();
        Self { config, resolved }
    }

    /// Creates a robust kernel with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateConversionError`] if a tolerance is non-finite.
    pub fn with_config(config: RobustPredicateConfig<T>) -> Result<Self, CoordinateConversionError> {
        let resolved = ResolvedConfig::try_from(&config)?;
        Ok(Self { config, resolved })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &RobustPredicateConfig<T> {
        &self.config
    }
}

impl<T: CoordinateScalar> Default for RobustKernel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const D: usize> Kernel<D> for RobustKernel<T>
where
    T: CoordinateScalar,
{
    type Scalar = T;

    fn orientation(
        &self,
        points: &[Point<Self::Scalar, D>],
    ) -> Result<Orientation, CoordinateConversionError> {
        robust_orientation(points, &self.config)
    }

    fn in_sphere(
        &self,
        simplex_points: &[Point<Self::Scalar, D>],
        test_point: &Point<Self::Scalar, D>,
    ) -> Result<InSphere, CoordinateConversionError> {
        robust_insphere(simplex_points, test_point, &self.config)
    }

    fn power_test(
        &self,
        simplex_points: &[WeightedPoint<Self::Scalar, D>],
        test: &WeightedPoint<Self::Scalar, D>,
    ) -> Result<InSphere, CoordinateConversionError> {
        robust_power_test(simplex_points, test, &self.config)
    }

    fn orientation_in_frame(&self, rows: &[&[f64]]) -> Orientation {
        robust_orientation_of_rows(rows, &self.resolved)
    }

    fn power_side_in_frame(
        &self,
        rows: &[&[f64]],
        weights: &[f64],
        test: &[f64],
        test_weight: f64,
    ) -> InSphere {
        robust_power_side_of_rows(rows, weights, test, test_weight, &self.resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::traits::coordinate::Coordinate;

    fn square_corners() -> [Point<f64, 3>; 3] {
        [
            Point::new([0.0, 0.0, 1.0]),
            Point::new([1.0, 0.0, 1.0]),
            Point::new([1.0, 1.0, 1.0]),
        ]
    }

    #[test]
    fn in_span_test_on_a_triangle_embedded_in_3d() {
        let kernel = FastKernel::<f64>::new();
        let triangle: Vec<_> = square_corners()
            .into_iter()
            .map(WeightedPoint::unweighted)
            .collect();
        let inside = WeightedPoint::unweighted(Point::new([0.5, 0.5, 1.0]));
        let on = WeightedPoint::unweighted(Point::new([0.0, 1.0, 1.0]));
        let outside = WeightedPoint::unweighted(Point::new([3.0, 3.0, 1.0]));
        assert_eq!(
            kernel.side_of_power_sphere_in_span(&triangle, &inside).unwrap(),
            InSphere::INSIDE
        );
        assert_eq!(
            kernel.side_of_power_sphere_in_span(&triangle, &on).unwrap(),
            InSphere::BOUNDARY
        );
        assert_eq!(
            kernel.side_of_power_sphere_in_span(&triangle, &outside).unwrap(),
            InSphere::OUTSIDE
        );

        let mut reversed = triangle;
        reversed.swap(0, 1);
        assert_eq!(
            kernel.side_of_power_sphere_in_span(&reversed, &inside).unwrap(),
            InSphere::INSIDE
        );
    }

    #[test]
    fn in_span_test_on_a_segment_with_weights() {
        let kernel = RobustKernel::<f64>::new();
        let segment = [
            WeightedPoint::new(Point::new([0.0, 0.0]), 0.0),
            WeightedPoint::new(Point::new([2.0, 2.0]), 0.0),
        ];
        let far = WeightedPoint::new(Point::new([3.0, 3.0]), 0.0);
        let heavy_far = WeightedPoint::new(Point::new([3.0, 3.0]), 10.0);
        assert_eq!(
            kernel.side_of_power_sphere_in_span(&segment, &far).unwrap(),
            InSphere::OUTSIDE
        );
        assert_eq!(
            kernel.side_of_power_sphere_in_span(&segment, &heavy_far).unwrap(),
            InSphere::INSIDE
        );
    }

    #[test]
    fn frame_predicates_match_full_predicates_when_frame_is_ambient() {
        let fast = FastKernel::<f64>::new();
        let robust = RobustKernel::<f64>::default();
        let rows: [&[f64]; 3] = [&[0.0, 0.0], &[0.0, 1.0], &[1.0, 0.0]];
        let points = [
            Point::new([0.0, 0.0]),
            Point::new([0.0, 1.0]),
            Point::new([1.0, 0.0]),
        ];
        assert_eq!(
            Kernel::<2>::orientation_in_frame(&fast, &rows),
            fast.orientation(&points).unwrap()
        );
        assert_eq!(
            Kernel::<2>::orientation_in_frame(&robust, &rows),
            Orientation::NEGATIVE
        );
        assert_eq!(robust.orientation(&points).unwrap(), Orientation::NEGATIVE);
    }

    #[test]
    fn lexicographic_comparison_and_lifting() {
        let kernel = FastKernel::<f64>::new();
        let a = Point::new([0.0, 5.0]);
        let b = Point::new([1.0, -5.0]);
        assert_eq!(kernel.compare_lexicographically(&a, &b), Ordering::Less);
        assert_eq!(kernel.compare_lexicographically(&b, &b), Ordering::Equal);

        let mut hull = AffineHull::<2>::new();
        hull.extend(&[0.0, 0.0]);
        hull.extend(&[2.0, 0.0]);
        let lifted = kernel.construct_lifted_point(&hull, &Point::new([1.5, 0.0])).unwrap();
        assert_eq!(lifted.as_slice(), &[1.5]);
    }
}
