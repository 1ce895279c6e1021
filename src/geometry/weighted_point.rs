//! Weighted points for regular (weighted Delaunay) triangulations.
//!
//! A weighted point `(p, w)` is the sphere centered at `p` with squared
//! radius `w`. The power of a point `q` with respect to it is
//! `|p - q|² - w`; regular triangulations are defined by the power distance
//! the same way Delaunay triangulations are defined by the Euclidean one.

use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::{Coordinate, CoordinateScalar, CoordinateValidationError};
use crate::geometry::util::squared_distance;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A point with a scalar weight.
///
/// # Examples
///
/// ```rust
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::traits::coordinate::Coordinate;
/// use simplicial::geometry::weighted_point::WeightedPoint;
///
/// let wp = WeightedPoint::new(Point::new([1.0, 0.0]), 0.25);
/// assert_eq!(wp.weight(), 0.25);
/// // power of the origin: |(1,0)|² - 0.25
/// assert_eq!(wp.power_distance(&Point::new([0.0, 0.0])), 0.75);
/// ```
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(bound = "T: CoordinateScalar")]
pub struct WeightedPoint<T, const D: usize>
where
    T: CoordinateScalar,
{
    point: Point<T, D>,
    weight: T,
}

impl<T, const D: usize> WeightedPoint<T, D>
where
    T: CoordinateScalar,
{
    /// Creates a weighted point.
    #[must_use]
    pub const fn new(point: Point<T, D>, weight: T) -> Self {
        Self { point, weight }
    }

    /// Creates a weighted point with zero weight.
    #[must_use]
    pub fn unweighted(point: Point<T, D>) -> Self {
        Self::new(point, T::zero())
    }

    /// The bare point.
    #[inline]
    #[must_use]
    pub const fn point(&self) -> &Point<T, D> {
        &self.point
    }

    /// The weight (squared radius of the associated sphere).
    #[inline]
    #[must_use]
    pub const fn weight(&self) -> T {
        self.weight
    }

    /// Power distance `|p - q|² - w` from `query`.
    #[must_use]
    pub fn power_distance(&self, query: &Point<T, D>) -> T {
        squared_distance(self.point.coords(), query.coords()) - self.weight
    }

    /// Validates the point and the weight.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateValidationError`] if a coordinate is non-finite;
    /// a non-finite weight is reported at index `D`.
    pub fn validate(&self) -> Result<(), CoordinateValidationError> {
        self.point.validate()?;
        if self.weight.is_finite_generic() {
            Ok(())
        } else {
            Err(CoordinateValidationError::InvalidCoordinate {
                coordinate_index: D,
                coordinate_value: format!("{:?}", self.weight),
                dimension: D,
            })
        }
    }
}

impl<T, const D: usize> PartialEq for WeightedPoint<T, D>
where
    T: CoordinateScalar,
{
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point && self.weight.ordered_eq(&other.weight)
    }
}

impl<T, const D: usize> Eq for WeightedPoint<T, D> where T: CoordinateScalar {}

impl<T, const D: usize> Hash for WeightedPoint<T, D>
where
    T: CoordinateScalar,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.point.hash(state);
        self.weight.hash_scalar(state);
    }
}

impl<T, const D: usize> From<Point<T, D>> for WeightedPoint<T, D>
where
    T: CoordinateScalar,
{
    fn from(point: Point<T, D>) -> Self {
        Self::unweighted(point)
    }
}
