//! Regular (weighted Delaunay) triangulation.
//!
//! Each vertex carries a weight, the squared radius of a sphere centered at
//! the point. A cell is regular when no other weighted point has negative
//! power distance to the cell's orthogonal sphere. Points whose sphere is
//! dominated by their neighbours have no cell at all: inserting one leaves
//! the triangulation unchanged, and inserting a heavy point may hide existing
//! vertices, which are then dropped.

use std::ops::Deref;

use tracing::debug;

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
use crate::core::util::delaunay_validation::validate_regular;
use crate::core::vertex::Vertex;
use crate::geometry::kernel::Kernel;

/// Regular triangulation of weighted points.
///
/// # Examples
///
/// ```rust
/// use simplicial::prelude::*;
///
/// let mut rt: RegularTriangulation<FastKernel<f64>, (), (), 2> = RegularTriangulation::new();
/// for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]] {
///     rt.insert(weighted_vertex!(p, 1.0)).unwrap();
/// }
/// // a light point deep inside heavy neighbours is hidden
/// assert_eq!(rt.insert(weighted_vertex!([1.0, 1.0], -20.0)).unwrap(), None);
/// assert_eq!(rt.number_of_vertices(), 3);
/// assert!(rt.validate_regular().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct RegularTriangulation<K, U, V, const D: usize>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    pub(crate) tri: Triangulation<K, U, V, D>,
}

impl<K, U, V, const D: usize> Default for RegularTriangulation<K, U, V, D>
where
    K: Kernel<D> + Default,
    U: DataType,
    V: DataType,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, U, V, const D: usize> RegularTriangulation<K, U, V, D>
where
    K: Kernel<D> + Default,
    U: DataType,
    V: DataType,
{
    /// Create an empty regular triangulation with the default kernel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_kernel(K::default())
    }

    /// Builds a regular triangulation by inserting `vertices` in order.
    /// Hidden points are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`InsertionError`].
    pub fn from_vertices(vertices: &[Vertex<K::Scalar, U, D>]) -> Result<Self, InsertionError> {
        let mut rt = Self::new();
        for &vertex in vertices {
            rt.insert(vertex)?;
        }
        Ok(rt)
    }
}

impl<K, U, V, const D: usize> RegularTriangulation<K, U, V, D>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    /// Create an empty regular triangulation with the given kernel.
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

    /// Inserts a weighted vertex.
    ///
    /// Returns `None` if the point is hidden. A point at the position of an
    /// existing vertex with the same weight returns that vertex; with a
    /// larger weight it replaces the vertex.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError`] for invalid vertices or failed predicates;
    /// the triangulation is unchanged in that case.
    pub fn insert(
        &mut self,
        vertex: Vertex<K::Scalar, U, D>,
    ) -> Result<Option<VertexKey>, InsertionError> {
        Ok(self.insert_reporting_hidden(vertex)?.0)
    }

    /// [`RegularTriangulation::insert`], also returning the vertices that the
    /// new point hides.
    ///
    /// # Errors
    ///
    /// Same conditions as [`RegularTriangulation::insert`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use simplicial::prelude::*;
    ///
    /// let mut rt: RegularTriangulation<FastKernel<f64>, (), (), 2> = RegularTriangulation::new();
    /// for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0], [1.0, 1.0]] {
    ///     rt.insert(weighted_vertex!(p, 0.0)).unwrap();
    /// }
    /// let (key, hidden) = rt
    ///     .insert_reporting_hidden(weighted_vertex!([1.2, 1.2], 20.0))
    ///     .unwrap();
    /// assert!(key.is_some());
    /// assert_eq!(hidden.len(), 1);
    /// ```
    pub fn insert_reporting_hidden(
        &mut self,
        vertex: Vertex<K::Scalar, U, D>,
    ) -> Result<(Option<VertexKey>, Vec<Vertex<K::Scalar, U, D>>), InsertionError> {
        Ok(
            match insert_vertex(&mut self.tri, vertex, InsertionStrategy::Regular)? {
                InsertionOutcome::Inserted { vertex, hidden } => (Some(vertex), hidden),
                InsertionOutcome::Existing(vertex) => (Some(vertex), Vec::new()),
                InsertionOutcome::Hidden => {
                    debug!("inserted point is hidden");
                    (None, Vec::new())
                }
            },
        )
    }

    /// Removes a vertex and re-triangulates its star with power tests.
    /// Points hidden earlier are not restored.
    ///
    /// # Errors
    ///
    /// Returns [`RemovalError`] for the infinite vertex, unknown keys, or a
    /// failed re-triangulation; the triangulation is unchanged in that case.
    pub fn remove(&mut self, vertex: VertexKey) -> Result<Option<CellKey>, RemovalError> {
        remove_vertex(&mut self.tri, vertex, SpherePredicate::Power)
    }

    /// Checks that no finite vertex conflicts with a finite cell's power sphere.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationValidationError::RegularityViolation`] for the
    /// first violation.
    pub fn validate_regular(&self) -> Result<(), TriangulationValidationError> {
        validate_regular(&self.tri)
    }
}

impl<K, U, V, const D: usize> Deref for RegularTriangulation<K, U, V, D>
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
    use crate::core::vertex::weighted_vertex;
    use crate::geometry::kernel::FastKernel;
    use crate::geometry::traits::coordinate::Coordinate;
    use crate::geometry::util::generate_random_points_seeded;

    type Rt<const D: usize> = RegularTriangulation<FastKernel<f64>, (), (), D>;

    #[test]
    fn test_zero_weights_match_delaunay() {
        let points = generate_random_points_seeded::<f64, 2>(25, (-5.0, 5.0), 3).unwrap();
        let mut rt = Rt::<2>::new();
        for p in &points {
            assert!(rt.insert(weighted_vertex!(p.to_array(), 0.0)).unwrap().is_some());
        }
        assert_eq!(rt.number_of_vertices(), 25);
        assert!(rt.validate_regular().is_ok());
        assert!(crate::core::util::delaunay_validation::validate_delaunay(rt.triangulation()).is_ok());
    }

    #[test]
    fn test_random_weights_stay_regular() {
        let points = generate_random_points_seeded::<f64, 3>(20, (-5.0, 5.0), 8).unwrap();
        let weights = generate_random_points_seeded::<f64, 3>(20, (0.0, 2.0), 9).unwrap();
        let mut rt = Rt::<3>::new();
        for (p, w) in points.iter().zip(&weights) {
            rt.insert(weighted_vertex!(p.to_array(), w.coords()[0])).unwrap();
            assert!(rt.is_valid().is_ok());
        }
        assert!(rt.validate_regular().is_ok());
        assert!(rt.number_of_vertices() <= 20);
    }

    #[test]
    fn test_heavy_point_hides_vertex() {
        let mut rt = Rt::<2>::new();
        for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0], [1.0, 1.0]] {
            rt.insert(weighted_vertex!(p, 0.0)).unwrap();
        }
        let (key, hidden) = rt
            .insert_reporting_hidden(weighted_vertex!([1.2, 1.2], 20.0))
            .unwrap();
        assert!(key.is_some());
        assert_eq!(hidden.len(), 1);
        assert_eq!(rt.number_of_vertices(), 4);
        assert!(rt.validate_regular().is_ok());
    }

    #[test]
    fn test_remove_keeps_regularity() {
        let points = generate_random_points_seeded::<f64, 2>(20, (-5.0, 5.0), 21).unwrap();
        let weights = generate_random_points_seeded::<f64, 2>(20, (0.0, 1.0), 22).unwrap();
        let mut rt = Rt::<2>::new();
        let mut keys = Vec::new();
        for (p, w) in points.iter().zip(&weights) {
            if let Some(key) = rt.insert(weighted_vertex!(p.to_array(), w.coords()[0])).unwrap() {
                keys.push(key);
            }
        }
        for key in keys.iter().take(5) {
            if rt.vertex(*key).is_some() {
                rt.remove(*key).unwrap();
                assert!(rt.is_valid().is_ok());
                assert!(rt.validate_regular().is_ok());
            }
        }
    }
}
