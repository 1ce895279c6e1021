//! Generic triangulation combining kernel and combinatorial data structure.
//!
//! Following CGAL's architecture, the [`Triangulation`] struct combines:
//! - a geometric [`Kernel`] for predicates,
//! - a purely combinatorial [`Tds`] for topology,
//! - the [`AffineHull`] frame of the current finite vertices.
//!
//! While the dimension `k` is below `D`, every orientation and sphere test is
//! evaluated in the `k`-dimensional coordinates of the affine hull. Once the
//! triangulation is full-dimensional the kernel's ambient predicates are used.
//!
//! The plain triangulation inserts points by star insertion and can be turned
//! into a Delaunay triangulation by Lawson flips; see
//! [`DelaunayTriangulation`](crate::core::delaunay_triangulation::DelaunayTriangulation)
//! and [`RegularTriangulation`](crate::core::regular_triangulation::RegularTriangulation)
//! for the incremental variants.

#![forbid(unsafe_code)]

use tracing::debug;

use crate::core::algorithms::flips::{FlipError, FlipStatistics, flip, make_delaunay_by_flips};
use crate::core::algorithms::incremental_insertion::{
    InsertionError, InsertionOutcome, InsertionStrategy, insert_vertex,
};
use crate::core::algorithms::locate::{LocateError, LocateOptions, LocateResult, locate};
use crate::core::cell::Cell;
use crate::core::collections::{CellKeyBuffer, MAX_PRACTICAL_DIMENSION_SIZE, SmallBuffer};
use crate::core::traits::data_type::DataType;
use crate::core::triangulation_data_structure::{
    CellKey, Tds, TriangulationValidationError, ValidationOptions, VertexKey,
};
use crate::core::util::delaunay_validation::validate_delaunay;
use crate::core::vertex::Vertex;
use crate::geometry::affine_hull::{AffineHull, LiftedPoint};
use crate::geometry::kernel::Kernel;
use crate::geometry::point::Point;
use crate::geometry::predicates::{InSphere, Orientation};
use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};
use crate::geometry::util::{point_to_f64, safe_scalar_to_f64};
use crate::geometry::weighted_point::WeightedPoint;

/// Points of a simplex of the current dimension.
pub(crate) type SimplexPoints<T, const D: usize> =
    SmallBuffer<Point<T, D>, MAX_PRACTICAL_DIMENSION_SIZE>;

/// Which sphere a conflict or validation test compares against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpherePredicate {
    /// Circumsphere; vertex weights are ignored.
    InSphere,
    /// Power sphere of the weighted vertices.
    Power,
}

/// Generic triangulation combining kernel and data structure.
///
/// # Type Parameters
/// - `K`: Geometric kernel implementing predicates
/// - `U`: User data type for vertices
/// - `V`: User data type for cells
/// - `D`: Ambient dimension
///
/// ```rust
/// use simplicial::prelude::*;
///
/// let mut tri: Triangulation<FastKernel<f64>, (), (), 2> = Triangulation::default();
/// for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
///     tri.insert(vertex!(p)).unwrap();
/// }
/// assert_eq!(tri.dim(), 2);
/// assert_eq!(tri.number_of_finite_cells(), 2);
/// assert!(tri.is_valid().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Triangulation<K, U, V, const D: usize>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    /// The geometric kernel for predicates.
    pub(crate) kernel: K,
    /// The combinatorial triangulation data structure.
    pub(crate) tds: Tds<K::Scalar, U, V, D>,
    /// Frame of the affine hull of the finite vertices.
    pub(crate) hull: AffineHull<D>,
    pub(crate) locate_options: LocateOptions,
    /// Cell created by the last mutation; starting point of the next walk.
    pub(crate) last_cell: Option<CellKey>,
}

impl<K, U, V, const D: usize> Default for Triangulation<K, U, V, D>
where
    K: Kernel<D> + Default,
    U: DataType,
    V: DataType,
{
    fn default() -> Self {
        Self::new(K::default())
    }
}

impl<K, U, V, const D: usize> Triangulation<K, U, V, D>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    /// Create an empty triangulation with the given kernel.
    #[must_use]
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            tds: Tds::new(),
            hull: AffineHull::new(),
            locate_options: LocateOptions::default(),
            last_cell: None,
        }
    }

    /// Replaces the point location options.
    #[must_use]
    pub const fn with_locate_options(mut self, options: LocateOptions) -> Self {
        self.locate_options = options;
        self
    }

    /// The point location options.
    #[must_use]
    pub const fn locate_options(&self) -> &LocateOptions {
        &self.locate_options
    }

    /// The geometric kernel.
    #[must_use]
    pub const fn kernel(&self) -> &K {
        &self.kernel
    }

    /// The combinatorial data structure.
    #[must_use]
    pub const fn tds(&self) -> &Tds<K::Scalar, U, V, D> {
        &self.tds
    }

    /// Frame of the affine hull of the finite vertices.
    #[must_use]
    pub const fn affine_hull(&self) -> &AffineHull<D> {
        &self.hull
    }

    // -------------------------------------------------------------------------
    // Queries, delegated to the Tds
    // -------------------------------------------------------------------------

    /// Returns the current dimension (`-1` when empty).
    #[must_use]
    pub const fn dim(&self) -> i32 {
        self.tds.dim()
    }

    /// All vertices, the infinite one included.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex<K::Scalar, U, D>)> {
        self.tds.vertices()
    }

    /// Finite vertices.
    pub fn finite_vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex<K::Scalar, U, D>)> {
        self.tds.finite_vertices()
    }

    /// All cells, infinite ones included.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &Cell<K::Scalar, U, V, D>)> {
        self.tds.cells()
    }

    /// Cells without the infinite vertex.
    pub fn finite_cells(&self) -> impl Iterator<Item = (CellKey, &Cell<K::Scalar, U, V, D>)> {
        self.tds.finite_cells()
    }

    /// Returns the number of finite vertices.
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.tds.number_of_vertices()
    }

    /// Returns the number of cells, infinite ones included.
    #[must_use]
    pub fn number_of_cells(&self) -> usize {
        self.tds.number_of_cells()
    }

    /// Returns the number of finite cells.
    #[must_use]
    pub fn number_of_finite_cells(&self) -> usize {
        self.tds.number_of_finite_cells()
    }

    /// The infinite vertex.
    #[must_use]
    pub const fn infinite_vertex(&self) -> VertexKey {
        self.tds.infinite_vertex()
    }

    /// `true` for the infinite vertex.
    #[must_use]
    pub fn is_infinite_vertex(&self, vertex: VertexKey) -> bool {
        self.tds.is_infinite_vertex(vertex)
    }

    /// `true` if the cell contains the infinite vertex.
    #[must_use]
    pub fn is_infinite_cell(&self, cell: CellKey) -> bool {
        self.tds.is_infinite_cell(cell)
    }

    /// The vertex stored under `key`.
    #[must_use]
    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex<K::Scalar, U, D>> {
        self.tds.vertex(key)
    }

    /// The cell stored under `key`.
    #[must_use]
    pub fn cell(&self, key: CellKey) -> Option<&Cell<K::Scalar, U, V, D>> {
        self.tds.cell(key)
    }

    /// The point of a finite vertex.
    #[must_use]
    pub fn point(&self, key: VertexKey) -> Option<&Point<K::Scalar, D>> {
        if self.tds.is_infinite_vertex(key) {
            return None;
        }
        self.tds.vertex(key).map(Vertex::point)
    }

    /// The cell across the facet of `cell` opposite slot `i`.
    #[must_use]
    pub fn neighbor(&self, cell: CellKey, i: usize) -> Option<CellKey> {
        self.tds.neighbor(cell, i)
    }

    /// Slot of `cell` in its `i`-th neighbor.
    #[must_use]
    pub fn mirror_index(&self, cell: CellKey, i: usize) -> Option<usize> {
        self.tds.mirror_index(cell, i)
    }

    /// One cell containing `vertex`.
    #[must_use]
    pub fn incident_cell(&self, vertex: VertexKey) -> Option<CellKey> {
        self.tds.incident_cell(vertex)
    }

    /// All cells containing `vertex`.
    #[must_use]
    pub fn incident_cells(&self, vertex: VertexKey) -> Vec<CellKey> {
        self.tds.incident_cells(vertex)
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Locates `point`, starting from the cell touched by the last mutation.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError`] if the triangulation is empty or a predicate fails.
    pub fn locate(&self, point: &Point<K::Scalar, D>) -> Result<LocateResult, LocateError> {
        locate(self, point, self.last_cell)
    }

    /// Locates `point`, starting the walk at `hint`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Triangulation::locate`].
    pub fn locate_with_hint(
        &self,
        point: &Point<K::Scalar, D>,
        hint: Option<CellKey>,
    ) -> Result<LocateResult, LocateError> {
        locate(self, point, hint)
    }

    /// Inserts a vertex by star insertion, without restoring any empty-sphere
    /// property. Inserting a point that is already present returns the
    /// existing key.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError`] for invalid vertices or failed predicates.
    pub fn insert(&mut self, vertex: Vertex<K::Scalar, U, D>) -> Result<VertexKey, InsertionError> {
        match insert_vertex(self, vertex, InsertionStrategy::Star)? {
            InsertionOutcome::Inserted { vertex, .. } | InsertionOutcome::Existing(vertex) => {
                Ok(vertex)
            }
            InsertionOutcome::Hidden => Err(InsertionError::UnexpectedlyHidden),
        }
    }

    /// Geometrically checked bistellar flip of the facet of `cell` opposite slot `i`.
    ///
    /// # Errors
    ///
    /// Returns [`FlipError`] when the flip is not defined or not legal.
    pub fn flip(&mut self, cell: CellKey, i: usize) -> Result<CellKeyBuffer, FlipError> {
        flip(self, cell, i)
    }

    /// Runs Lawson flipping until every flippable facet is locally Delaunay.
    ///
    /// # Errors
    ///
    /// Returns [`FlipError`] if a predicate or a flip fails unexpectedly.
    pub fn make_delaunay_by_flips(&mut self) -> Result<FlipStatistics, FlipError> {
        make_delaunay_by_flips(self)
    }

    /// Structural validation plus positive orientation of every finite cell.
    ///
    /// # Errors
    ///
    /// Returns the first [`TriangulationValidationError`] found.
    pub fn is_valid(&self) -> Result<(), TriangulationValidationError> {
        self.tds.is_valid()?;
        if self.hull.dimension() != self.tds.dim() {
            return Err(TriangulationValidationError::DimensionMismatch {
                message: format!(
                    "affine hull has dimension {}, the triangulation {}",
                    self.hull.dimension(),
                    self.tds.dim()
                ),
            });
        }
        if self.tds.dim() < 1 {
            return Ok(());
        }
        for (_, cell) in self.tds.finite_cells() {
            let Some(points) = self.cell_points(cell) else {
                continue;
            };
            if self.orientation_of_points(&points)? != Orientation::POSITIVE {
                return Err(TriangulationValidationError::NegativeOrientation {
                    cell_id: cell.uuid(),
                });
            }
        }
        Ok(())
    }

    /// [`Triangulation::is_valid`], plus the global empty-circumsphere check
    /// when requested.
    ///
    /// # Errors
    ///
    /// Returns the first [`TriangulationValidationError`] found.
    pub fn validate(&self, options: ValidationOptions) -> Result<(), TriangulationValidationError> {
        self.is_valid()?;
        if options.check_delaunay {
            validate_delaunay(self)?;
        }
        Ok(())
    }
}

// =============================================================================
// GEOMETRY IN THE CURRENT FRAME
// =============================================================================

impl<K, U, V, const D: usize> Triangulation<K, U, V, D>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    /// `true` if the dimension is the ambient one.
    fn is_full_dimensional(&self) -> bool {
        usize::try_from(self.tds.dim()).is_ok_and(|k| k == D)
    }

    /// Points of a finite cell; `None` for infinite cells.
    pub(crate) fn cell_points(
        &self,
        cell: &Cell<K::Scalar, U, V, D>,
    ) -> Option<SimplexPoints<K::Scalar, D>> {
        cell.vertices().iter().map(|&v| self.point(v).copied()).collect()
    }

    /// Weighted point of a finite vertex, with the weight dropped for
    /// [`SpherePredicate::InSphere`].
    pub(crate) fn weighted_point(
        &self,
        vertex: VertexKey,
        predicate: SpherePredicate,
    ) -> Option<WeightedPoint<K::Scalar, D>> {
        if self.tds.is_infinite_vertex(vertex) {
            return None;
        }
        self.tds.vertex(vertex).map(|v| match predicate {
            SpherePredicate::InSphere => WeightedPoint::unweighted(*v.point()),
            SpherePredicate::Power => v.weighted_point(),
        })
    }

    /// `true` if `point` lies in the affine hull of the finite vertices.
    pub(crate) fn contains_in_hull(
        &self,
        point: &Point<K::Scalar, D>,
    ) -> Result<bool, CoordinateConversionError> {
        Ok(self.hull.contains(&point_to_f64(point)?))
    }

    fn lift_all(
        &self,
        points: &[Point<K::Scalar, D>],
    ) -> Result<SmallBuffer<LiftedPoint, MAX_PRACTICAL_DIMENSION_SIZE>, CoordinateConversionError>
    {
        points
            .iter()
            .map(|p| self.kernel.construct_lifted_point(&self.hull, p))
            .collect()
    }

    /// Orientation of `k + 1` points in the current frame.
    pub(crate) fn orientation_of_points(
        &self,
        points: &[Point<K::Scalar, D>],
    ) -> Result<Orientation, CoordinateConversionError> {
        if self.is_full_dimensional() {
            return self.kernel.orientation(points);
        }
        let lifted = self.lift_all(points)?;
        let rows: SmallBuffer<&[f64], MAX_PRACTICAL_DIMENSION_SIZE> =
            lifted.iter().map(LiftedPoint::as_slice).collect();
        Ok(self.kernel.orientation_in_frame(&rows))
    }

    /// Orientation of `cell` with the vertex in `slot` replaced by `point`.
    ///
    /// `None` if the substituted simplex still contains the infinite vertex.
    pub(crate) fn substituted_orientation(
        &self,
        cell: &Cell<K::Scalar, U, V, D>,
        slot: usize,
        point: &Point<K::Scalar, D>,
    ) -> Result<Option<Orientation>, CoordinateConversionError> {
        let points: Option<SimplexPoints<K::Scalar, D>> = cell
            .vertices()
            .iter()
            .enumerate()
            .map(|(i, &v)| if i == slot { Some(*point) } else { self.point(v).copied() })
            .collect();
        points
            .map(|points| self.orientation_of_points(&points))
            .transpose()
    }

    /// Side of `query` relative to the (power) sphere of `cell`.
    ///
    /// For an infinite cell the "sphere" is the half-space beyond its hull
    /// facet: [`InSphere::INSIDE`] when the query sees the facet,
    /// [`InSphere::OUTSIDE`] when it is behind it, and for a query on the
    /// facet's hyperplane the sphere test of the facet within its own span.
    pub(crate) fn side_of_cell_sphere(
        &self,
        cell: &Cell<K::Scalar, U, V, D>,
        query: &WeightedPoint<K::Scalar, D>,
        predicate: SpherePredicate,
    ) -> Result<InSphere, CoordinateConversionError> {
        let infinite = self.tds.infinite_vertex();
        if let Some(slot) = cell.index_of(infinite) {
            return match self.substituted_orientation(cell, slot, query.point())? {
                Some(Orientation::POSITIVE) => Ok(InSphere::INSIDE),
                Some(Orientation::NEGATIVE) | None => Ok(InSphere::OUTSIDE),
                Some(Orientation::DEGENERATE) => {
                    let facet: Option<SmallBuffer<WeightedPoint<K::Scalar, D>, MAX_PRACTICAL_DIMENSION_SIZE>> = cell
                        .vertices()
                        .iter()
                        .filter(|&&v| v != infinite)
                        .map(|&v| self.weighted_point(v, predicate))
                        .collect();
                    facet.map_or(Ok(InSphere::OUTSIDE), |facet| {
                        self.kernel.side_of_power_sphere_in_span(&facet, query)
                    })
                }
            };
        }

        let simplex: Option<SmallBuffer<WeightedPoint<K::Scalar, D>, MAX_PRACTICAL_DIMENSION_SIZE>> =
            cell.vertices()
                .iter()
                .map(|&v| self.weighted_point(v, predicate))
                .collect();
        let Some(simplex) = simplex else {
            return Ok(InSphere::OUTSIDE);
        };

        if self.is_full_dimensional() {
            return match predicate {
                SpherePredicate::InSphere => {
                    let points: SimplexPoints<K::Scalar, D> =
                        simplex.iter().map(|wp| *wp.point()).collect();
                    self.kernel.in_sphere(&points, query.point())
                }
                SpherePredicate::Power => self.kernel.power_test(&simplex, query),
            };
        }

        let points: SimplexPoints<K::Scalar, D> = simplex.iter().map(|wp| *wp.point()).collect();
        let lifted = self.lift_all(&points)?;
        let rows: SmallBuffer<&[f64], MAX_PRACTICAL_DIMENSION_SIZE> =
            lifted.iter().map(LiftedPoint::as_slice).collect();
        let weights: SmallBuffer<f64, MAX_PRACTICAL_DIMENSION_SIZE> = simplex
            .iter()
            .map(|wp| safe_scalar_to_f64(wp.weight()))
            .collect::<Result<_, _>>()?;
        let test = self.kernel.construct_lifted_point(&self.hull, query.point())?;
        Ok(self.kernel.power_side_in_frame(
            &rows,
            &weights,
            &test,
            safe_scalar_to_f64(query.weight())?,
        ))
    }

    // -------------------------------------------------------------------------
    // Dimension changes
    // -------------------------------------------------------------------------

    /// Inserts a vertex outside the current affine hull.
    pub(crate) fn insert_increasing_dimension(
        &mut self,
        vertex: Vertex<K::Scalar, U, D>,
    ) -> Result<VertexKey, InsertionError> {
        let coords = point_to_f64(vertex.point())?;
        let key = self.tds.insert_increase_dimension(vertex)?;
        self.hull.extend(&coords);
        self.fix_orientation()?;
        self.last_cell = self.tds.incident_cell(key);
        debug!(dimension = self.tds.dim(), "triangulation dimension raised");
        Ok(key)
    }

    /// Reverses every cell if the finite cells are negatively oriented in the current frame.
    pub(crate) fn fix_orientation(&mut self) -> Result<(), CoordinateConversionError> {
        if self.tds.dim() < 1 {
            return Ok(());
        }
        let orientation = match self
            .tds
            .finite_cells()
            .find_map(|(_, cell)| self.cell_points(cell))
        {
            Some(points) => self.orientation_of_points(&points)?,
            None => return Ok(()),
        };
        if orientation == Orientation::NEGATIVE {
            self.tds.reorient();
        }
        Ok(())
    }
}

/// Exact weight equality, as used for points at the same position.
pub(crate) fn weights_equal<T: CoordinateScalar>(a: T, b: T) -> bool {
    a.partial_cmp(&b) == Some(std::cmp::Ordering::Equal)
}
