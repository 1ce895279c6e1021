//! Delaunay triangulation layer with incremental insertion and removal.
//!
//! This layer adds Delaunay-specific operations on top of the generic
//! [`Triangulation`] struct, following CGAL's architecture. Read-only queries
//! are reached through `Deref`; every mutation goes through this type so the
//! empty-circumsphere property is maintained.

use std::ops::Deref;

use crate::core::algorithms::incremental_insertion::{
    InsertionError, InsertionOutcome, InsertionStrategy, insert_vertex,
};
use crate::core::algorithms::locate::LocateOptions;
use crate::core::algorithms::removal::{RemovalError, remove_vertex};
use crate::core::traits::data_type::DataType;
use crate::core::triangulation::{SpherePredicate, Triangulation};
use crate::core::triangulation_data_structure::{
    CellKey, TriangulationValidationError, VertexKey,
};
use crate::core::util::delaunay_validation::{validate_delaunay, validate_locally_delaunay};
use crate::core::vertex::Vertex;
use crate::geometry::kernel::Kernel;

/// Delaunay triangulation with incremental insertion and removal.
///
/// # Type Parameters
/// - `K`: Geometric kernel implementing predicates
/// - `U`: User data type for vertices
/// - `V`: User data type for cells
/// - `D`: Dimension of the triangulation
///
/// # Delaunay Property
///
/// No finite vertex lies strictly inside the circumsphere of a finite cell.
/// Co-spherical configurations are triangulated consistently: a point on a
/// circumsphere never conflicts with the cell.
///
/// # Implementation
///
/// - Point location (visibility walk) - [`locate`]
/// - Conflict region computation (BFS) - [`find_conflict_region`]
/// - Hole filling - [`Tds::insert_in_hole`]
/// - Vertex removal by star re-triangulation - [`remove_vertex`]
///
/// [`locate`]: crate::core::algorithms::locate::locate
/// [`find_conflict_region`]: crate::core::algorithms::locate::find_conflict_region
/// [`Tds::insert_in_hole`]: crate::core::triangulation_data_structure::Tds::insert_in_hole
///
/// # Examples
///
/// ```rust
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 3> = DelaunayTriangulation::new();
/// for p in [
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ] {
///     dt.insert(vertex!(p)).unwrap();
/// }
/// assert_eq!(dt.dim(), 3);
/// assert_eq!(dt.number_of_finite_cells(), 1);
/// assert_eq!(dt.number_of_cells(), 5);
/// assert!(dt.validate_delaunay().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct DelaunayTriangulation<K, U, V, const D: usize>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    /// The underlying generic triangulation.
    pub(crate) tri: Triangulation<K, U, V, D>,
}

impl<K, U, V, const D: usize> Default for DelaunayTriangulation<K, U, V, D>
where
    K: Kernel<D> + Default,
    U: DataType,
    V: DataType,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, U, V, const D: usize> DelaunayTriangulation<K, U, V, D>
where
    K: Kernel<D> + Default,
    U: DataType,
    V: DataType,
{
    /// Create an empty Delaunay triangulation with the default kernel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_kernel(K::default())
    }

    /// Builds a Delaunay triangulation by inserting `vertices` in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`InsertionError`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use simplicial::prelude::*;
    ///
    /// let vertices = vec![
    ///     vertex!([0.0, 0.0]),
    ///     vertex!([1.0, 0.0]),
    ///     vertex!([0.0, 1.0]),
    ///     vertex!([1.0, 1.0]),
    /// ];
    /// let dt: DelaunayTriangulation<RobustKernel<f64>, (), (), 2> =
    ///     DelaunayTriangulation::from_vertices(&vertices).unwrap();
    /// assert_eq!(dt.number_of_finite_cells(), 2);
    /// ```
    pub fn from_vertices(vertices: &[Vertex<K::Scalar, U, D>]) -> Result<Self, InsertionError> {
        let mut dt = Self::new();
        for &vertex in vertices {
            dt.insert(vertex)?;
        }
        Ok(dt)
    }
}

impl<K, U, V, const D: usize> DelaunayTriangulation<K, U, V, D>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    /// Create an empty Delaunay triangulation with the given kernel.
    #[must_use]
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            tri: Triangulation::new(kernel),
        }
    }

    /// Replaces the point location options.
    #[must_use]
    pub fn with_locate_options(self, options: LocateOptions) -> Self {
        Self {
            tri: self.tri.with_locate_options(options),
        }
    }

    /// The underlying generic triangulation.
    #[must_use]
    pub const fn triangulation(&self) -> &Triangulation<K, U, V, D> {
        &self.tri
    }

    /// Inserts a vertex, restoring the empty-circumsphere property.
    ///
    /// A point equal to an existing vertex returns that vertex's key and
    /// leaves the triangulation unchanged. Vertex weights are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError`] for invalid vertices or failed predicates;
    /// the triangulation is unchanged in that case.
    pub fn insert(&mut self, vertex: Vertex<K::Scalar, U, D>) -> Result<VertexKey, InsertionError> {
        match insert_vertex(&mut self.tri, vertex, InsertionStrategy::Delaunay)? {
            InsertionOutcome::Inserted { vertex, .. } | InsertionOutcome::Existing(vertex) => {
                Ok(vertex)
            }
            InsertionOutcome::Hidden => Err(InsertionError::UnexpectedlyHidden),
        }
    }

    /// Removes a vertex and re-triangulates its star.
    ///
    /// Returns a cell near the removed point, or `None` once empty.
    ///
    /// # Errors
    ///
    /// Returns [`RemovalError`] for the infinite vertex, unknown keys, or a
    /// failed re-triangulation; the triangulation is unchanged in that case.
    pub fn remove(&mut self, vertex: VertexKey) -> Result<Option<CellKey>, RemovalError> {
        remove_vertex(&mut self.tri, vertex, SpherePredicate::InSphere)
    }

    /// Checks the global empty-circumsphere property.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationValidationError::DelaunayViolation`] for the
    /// first violation.
    pub fn validate_delaunay(&self) -> Result<(), TriangulationValidationError> {
        validate_delaunay(&self.tri)
    }

    /// Checks the empty-circumsphere property across every interior facet.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationValidationError::DelaunayViolation`] for the
    /// first violation.
    pub fn validate_locally_delaunay(&self) -> Result<(), TriangulationValidationError> {
        validate_locally_delaunay(&self.tri)
    }
}

impl<K, U, V, const D: usize> Deref for DelaunayTriangulation<K, U, V, D>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    type Target = Triangulation<K, U, V, D>;

    fn deref(&self) -> &Self::Target {
        &self.tri
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithms::locate::LocateResult;
    use crate::core::triangulation_data_structure::ValidationOptions;
    use crate::core::vertex::vertex;
    use crate::geometry::kernel::{FastKernel, RobustKernel};
    use crate::geometry::point::Point;
    use crate::geometry::traits::coordinate::Coordinate;
    use crate::geometry::util::generate_random_points_seeded;

    type Dt<const D: usize> = DelaunayTriangulation<FastKernel<f64>, (), (), D>;

    #[test]
    fn test_unit_square() {
        let mut dt = Dt::<2>::new();
        for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
            dt.insert(vertex!(p)).unwrap();
        }
        assert_eq!(dt.number_of_finite_cells(), 2);
        assert_eq!(dt.number_of_cells(), 6);
        assert!(dt.validate(ValidationOptions { check_delaunay: true }).is_ok());
    }

    #[test]
    fn test_single_point_then_second() {
        let mut dt = Dt::<2>::new();
        let p = dt.insert(vertex!([1.0, 2.0])).unwrap();
        assert_eq!(dt.dim(), 0);
        assert_eq!(dt.number_of_cells(), 2);
        let (finite, _) = dt.finite_cells().next().unwrap();
        assert_eq!(dt.cell(finite).unwrap().vertices(), &[p]);
        let other = dt.neighbor(finite, 0).unwrap();
        assert!(dt.is_infinite_cell(other));
        assert_eq!(dt.neighbor(other, 0), Some(finite));

        dt.insert(vertex!([3.0, 2.0])).unwrap();
        assert_eq!(dt.dim(), 1);
        assert!(dt.is_valid().is_ok());
    }

    #[test]
    fn test_idempotent_insert() {
        let mut dt = Dt::<3>::new();
        let points = generate_random_points_seeded::<f64, 3>(12, (-1.0, 1.0), 5).unwrap();
        let keys: Vec<VertexKey> = points
            .iter()
            .map(|p| dt.insert(vertex!(p.to_array())).unwrap())
            .collect();
        let cells = dt.number_of_cells();
        assert_eq!(dt.insert(vertex!(points[4].to_array())).unwrap(), keys[4]);
        assert_eq!(dt.number_of_cells(), cells);
        assert_eq!(dt.number_of_vertices(), 12);
    }

    #[test]
    fn test_dimension_is_monotone_under_insertion() {
        let mut dt = Dt::<3>::new();
        let mut last = dt.dim();
        for p in [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.5, 0.5, 0.5],
        ] {
            dt.insert(vertex!(p)).unwrap();
            assert!(dt.dim() >= last);
            last = dt.dim();
            assert!(dt.is_valid().is_ok());
            assert!(dt.validate_delaunay().is_ok());
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn test_insert_remove_round_trip() {
        let mut dt = Dt::<2>::new();
        let points = generate_random_points_seeded::<f64, 2>(30, (-10.0, 10.0), 17).unwrap();
        let keys: Vec<VertexKey> = points
            .iter()
            .map(|p| dt.insert(vertex!(p.to_array())).unwrap())
            .collect();
        for key in keys.iter().step_by(3) {
            dt.remove(*key).unwrap();
            assert!(dt.is_valid().is_ok());
            assert!(dt.validate_delaunay().is_ok());
        }
        assert_eq!(dt.number_of_vertices(), 20);
    }

    #[test]
    fn test_locate_after_insertion() {
        let mut dt = Dt::<2>::new();
        for p in [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]] {
            dt.insert(vertex!(p)).unwrap();
        }
        assert!(matches!(
            dt.locate(&Point::new([0.5, 0.5])).unwrap(),
            LocateResult::InsideCell(_)
        ));
    }

    #[test]
    fn test_kernels_agree_on_well_conditioned_input() {
        let points = generate_random_points_seeded::<f64, 3>(20, (-3.0, 3.0), 31).unwrap();
        let vertices: Vec<_> = points.iter().map(|p| vertex!(p.to_array())).collect();
        let fast = Dt::<3>::from_vertices(&vertices).unwrap();
        let robust: DelaunayTriangulation<RobustKernel<f64>, (), (), 3> =
            DelaunayTriangulation::from_vertices(&vertices).unwrap();
        assert_eq!(fast.number_of_finite_cells(), robust.number_of_finite_cells());
        assert_eq!(fast.number_of_cells(), robust.number_of_cells());
        assert!(robust.validate_locally_delaunay().is_ok());
    }

    #[test]
    fn test_f32_coordinates() {
        let mut dt: DelaunayTriangulation<FastKernel<f32>, (), (), 2> = DelaunayTriangulation::new();
        for p in [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [0.3, 0.3]] {
            dt.insert(vertex!(p)).unwrap();
        }
        assert_eq!(dt.number_of_finite_cells(), 3);
        assert!(dt.validate_delaunay().is_ok());
    }
}
