//! Orthonormal frames of affine hulls.
//!
//! A triangulation whose current dimension `k` is below the ambient dimension
//! `D` evaluates orientations in the coordinates of its affine hull. The
//! frame is an origin plus an orthonormal basis built by Gram–Schmidt as
//! points leave the current hull. Extending the frame never changes the
//! coordinates of points already in the hull; the new axis is appended.

use nalgebra::SVector;

use crate::core::collections::{MAX_PRACTICAL_DIMENSION_SIZE, SmallBuffer};

/// Coordinates of a point in a frame of dimension at most `D`.
pub type LiftedPoint = SmallBuffer<f64, MAX_PRACTICAL_DIMENSION_SIZE>;

/// Residuals up to `HULL_TOLERANCE · |p - origin|` count as "in the hull".
///
/// The bound is relative, so only the origin itself is in a 0-dimensional hull.
pub const HULL_TOLERANCE: f64 = 1e-10;

/// Origin and orthonormal basis of the affine hull of a point set.
///
/// # Examples
///
/// ```
/// use simplicial::geometry::affine_hull::AffineHull;
///
/// let mut hull = AffineHull::<3>::new();
/// assert_eq!(hull.dimension(), -1);
/// assert!(hull.extend(&[0.0, 0.0, 0.0]));
/// assert!(hull.extend(&[1.0, 1.0, 0.0]));
/// assert_eq!(hull.dimension(), 1);
/// assert!(hull.contains(&[3.0, 3.0, 0.0]));
/// assert!(!hull.contains(&[0.0, 1.0, 0.0]));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AffineHull<const D: usize> {
    origin: Option<SVector<f64, D>>,
    basis: Vec<SVector<f64, D>>,
}

impl<const D: usize> AffineHull<D> {
    /// The hull of the empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            origin: None,
            basis: Vec::new(),
        }
    }

    /// Builds the hull of `points`, extending greedily in iteration order.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; D]>) -> Self {
        let mut hull = Self::new();
        for p in points {
            hull.extend(p);
            if hull.is_full() {
                break;
            }
        }
        hull
    }

    /// Affine dimension: `-1` for the empty hull, `0` for a single point.
    #[must_use]
    pub fn dimension(&self) -> i32 {
        self.origin.map_or(-1, |_| {
            i32::try_from(self.basis.len()).unwrap_or(i32::MAX)
        })
    }

    /// `true` when the hull spans the ambient space.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.origin.is_some() && self.basis.len() == D
    }

    /// Component of `p - origin` orthogonal to the frame, and its frame coordinates.
    fn decompose(&self, p: &[f64; D]) -> Option<(SVector<f64, D>, LiftedPoint)> {
        let origin = self.origin?;
        let mut v = SVector::<f64, D>::from_row_slice(p) - origin;
        let mut coords = LiftedPoint::new();
        for axis in &self.basis {
            let c = axis.dot(&v);
            coords.push(c);
            v -= axis * c;
        }
        // second pass against cancellation
        for (axis, c) in self.basis.iter().zip(coords.iter_mut()) {
            let correction = axis.dot(&v);
            *c += correction;
            v -= axis * correction;
        }
        Some((v, coords))
    }

    fn threshold(&self, p: &[f64; D]) -> f64 {
        let scale = self
            .origin
            .map_or(0.0, |o| (SVector::<f64, D>::from_row_slice(p) - o).norm());
        HULL_TOLERANCE * scale
    }

    /// `true` if `p` lies in the hull within tolerance. The empty hull contains nothing.
    #[must_use]
    pub fn contains(&self, p: &[f64; D]) -> bool {
        self.decompose(p)
            .is_some_and(|(residual, _)| residual.norm() <= self.threshold(p))
    }

    /// Adds `p` to the hull. Returns `true` if the dimension grew.
    pub fn extend(&mut self, p: &[f64; D]) -> bool {
        if self.origin.is_none() {
            self.origin = Some(SVector::<f64, D>::from_row_slice(p));
            return true;
        }
        let threshold = self.threshold(p);
        match self.decompose(p) {
            Some((residual, _)) if residual.norm() > threshold && self.basis.len() < D => {
                self.basis.push(residual.normalize());
                true
            }
            _ => false,
        }
    }

    /// Coordinates of `p` in the frame (its orthogonal projection onto the hull).
    #[must_use]
    pub fn project(&self, p: &[f64; D]) -> LiftedPoint {
        self.decompose(p)
            .map(|(_, coords)| coords)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_and_single_point_hulls() {
        let mut hull = AffineHull::<2>::new();
        assert!(!hull.contains(&[0.0, 0.0]));
        assert!(hull.project(&[1.0, 1.0]).is_empty());
        hull.extend(&[1.0, 2.0]);
        assert_eq!(hull.dimension(), 0);
        assert!(hull.contains(&[1.0, 2.0]));
        assert!(!hull.contains(&[1.0, 2.1]));
        assert!(!hull.contains(&[1.0 + 1e-11, 2.0]));
        assert!(hull.project(&[5.0, 5.0]).is_empty());
    }

    #[test]
    fn extension_appends_axes_without_moving_old_coordinates() {
        let mut hull = AffineHull::<3>::new();
        hull.extend(&[1.0, 0.0, 0.0]);
        hull.extend(&[3.0, 0.0, 0.0]);
        let before = hull.project(&[2.0, 0.0, 0.0]);
        assert_eq!(before.len(), 1);
        assert_relative_eq!(before[0], 1.0);

        assert!(hull.extend(&[1.0, 4.0, 0.0]));
        let after = hull.project(&[2.0, 0.0, 0.0]);
        assert_eq!(after.len(), 2);
        assert_relative_eq!(after[0], 1.0);
        assert_relative_eq!(after[1], 0.0);
        let lifted = hull.project(&[1.0, 4.0, 0.0]);
        assert_relative_eq!(lifted[1].abs(), 4.0);
    }

    #[test]
    fn redundant_points_do_not_grow_the_hull() {
        let mut hull = AffineHull::<2>::new();
        hull.extend(&[0.0, 0.0]);
        hull.extend(&[1.0, 1.0]);
        assert!(!hull.extend(&[2.0, 2.0]));
        assert!(!hull.extend(&[-5.0, -5.0 + 1e-13]));
        assert_eq!(hull.dimension(), 1);
        assert!(hull.extend(&[0.0, 1.0]));
        assert!(hull.is_full());
        assert!(!hull.extend(&[7.0, -3.0]));
    }

    #[test]
    fn containment_does_not_depend_on_scale() {
        for scale in [1e-3, 1.0, 1e3] {
            let mut hull = AffineHull::<3>::new();
            hull.extend(&[0.0, 0.0, 0.0]);
            hull.extend(&[scale, scale, 0.0]);
            assert!(hull.contains(&[3.0 * scale, 3.0 * scale, 0.0]));
            assert!(!hull.contains(&[scale, scale, 1e-6 * scale]));
            assert!(hull.extend(&[0.0, scale, 0.0]));
            assert!(!hull.contains(&[0.0, 0.0, 1e-6 * scale]));
        }
    }

    #[test]
    fn from_points_spans_the_set() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let hull = AffineHull::from_points(points.iter());
        assert_eq!(hull.dimension(), 2);
        assert!(hull.contains(&[5.0, 0.0, -3.0]));
        assert!(!hull.contains(&[0.0, 1.0, 0.0]));
    }
}
