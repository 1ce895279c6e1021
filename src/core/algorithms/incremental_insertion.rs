//! Incremental insertion using the cavity-based algorithm.
//!
//! Following CGAL's approach:
//! 1. Points outside the affine hull raise the dimension
//! 2. Locate the point (visibility walk)
//! 3. Compute the hole: the star of the located face, or the conflict region
//!    (BFS with in-sphere / power tests)
//! 4. Replace the hole by the star of the new vertex over its boundary
//!    ([`Tds::insert_in_hole`](crate::core::triangulation_data_structure::Tds::insert_in_hole))

use std::cmp::Ordering;

use tracing::{debug, trace, warn};

use crate::core::algorithms::locate::{
    ConflictError, LocateError, LocateResult, find_conflict_region, locate,
};
use crate::core::collections::{CellKeyBuffer, CellKeySet};
use crate::core::traits::data_type::DataType;
use crate::core::triangulation::{SpherePredicate, Triangulation, weights_equal};
use crate::core::triangulation_data_structure::{CellKey, TdsError, VertexKey};
use crate::core::vertex::{Vertex, VertexValidationError};
use crate::geometry::affine_hull::AffineHull;
use crate::geometry::kernel::Kernel;
use crate::geometry::point::Point;
use crate::geometry::predicates::Orientation;
use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};
use crate::geometry::weighted_point::WeightedPoint;

/// Error during incremental insertion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertionError {
    /// The vertex failed validation (non-finite coordinates or weight).
    #[error("Invalid vertex: {0}")]
    InvalidVertex(#[from] VertexValidationError),

    /// Point location failed.
    #[error("Location error: {0}")]
    Location(#[from] LocateError),

    /// Conflict region computation failed.
    #[error("Conflict region error: {0}")]
    Conflict(#[from] ConflictError),

    /// Geometric predicate failed.
    #[error("Predicate error: {0}")]
    Predicate(#[from] CoordinateConversionError),

    /// The data structure rejected the mutation.
    #[error("Data structure error: {0}")]
    Tds(#[from] TdsError),

    /// A strategy that never hides points reported a hidden point.
    #[error("Point was hidden by an insertion strategy that does not hide points")]
    UnexpectedlyHidden,

    /// The point differs from an existing vertex but every orientation test
    /// places it on that vertex.
    #[error("Point is distinct from vertex {existing:?} but numerically indistinguishable from it")]
    NearDuplicate {
        /// The vertex the point was located on.
        existing: VertexKey,
    },
}

/// How the hole around a new point is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionStrategy {
    /// Split the located cell, face star or visible hull facets; no
    /// empty-sphere property is restored.
    Star,
    /// Replace the cells whose circumsphere strictly contains the point.
    Delaunay,
    /// Replace the cells whose power sphere strictly contains the weighted
    /// point; dominated points are hidden.
    Regular,
}

impl InsertionStrategy {
    const fn sphere_predicate(self) -> SpherePredicate {
        match self {
            Self::Regular => SpherePredicate::Power,
            Self::Star | Self::Delaunay => SpherePredicate::InSphere,
        }
    }
}

/// What an insertion did.
#[derive(Clone, Debug)]
pub enum InsertionOutcome<T, U, const D: usize>
where
    T: CoordinateScalar,
    U: DataType,
{
    /// A new vertex was created; `hidden` holds the vertices it made redundant.
    Inserted {
        /// The new vertex.
        vertex: VertexKey,
        /// Vertices removed because the new point dominates them.
        hidden: Vec<Vertex<T, U, D>>,
    },
    /// A vertex with the same position already exists and was kept.
    Existing(VertexKey),
    /// The weighted point is dominated and was not inserted.
    Hidden,
}

/// Inserts `vertex` into `tri` following `strategy`.
///
/// # Errors
///
/// Returns [`InsertionError`] if the vertex is invalid, location or a
/// predicate fails, or the data structure rejects the hole. The triangulation
/// is unchanged on error.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::algorithms::incremental_insertion::{
///     insert_vertex, InsertionOutcome, InsertionStrategy,
/// };
/// use simplicial::prelude::*;
///
/// let mut tri: Triangulation<FastKernel<f64>, (), (), 2> = Triangulation::default();
/// for p in [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]] {
///     insert_vertex(&mut tri, vertex!(p), InsertionStrategy::Delaunay).unwrap();
/// }
/// let outcome = insert_vertex(&mut tri, vertex!([2.0, 0.0]), InsertionStrategy::Delaunay).unwrap();
/// assert!(matches!(outcome, InsertionOutcome::Existing(_)));
/// assert_eq!(tri.number_of_vertices(), 3);
/// ```
pub fn insert_vertex<K, U, V, const D: usize>(
    tri: &mut Triangulation<K, U, V, D>,
    vertex: Vertex<K::Scalar, U, D>,
    strategy: InsertionStrategy,
) -> Result<InsertionOutcome<K::Scalar, U, D>, InsertionError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    vertex.is_valid()?;

    if tri.dim() < 0 || !tri.contains_in_hull(vertex.point())? {
        let key = tri.insert_increasing_dimension(vertex)?;
        return Ok(InsertionOutcome::Inserted {
            vertex: key,
            hidden: Vec::new(),
        });
    }

    let location = locate(tri, vertex.point(), tri.last_cell)?;
    trace!(?location, "point located");

    if let LocateResult::OnVertex { vertex: existing, .. } = location {
        return insert_on_vertex(tri, vertex, existing, strategy);
    }

    let hole = match strategy {
        InsertionStrategy::Star => star_hole(tri, vertex.point(), &location)?,
        InsertionStrategy::Delaunay | InsertionStrategy::Regular => {
            let query = match strategy {
                InsertionStrategy::Regular => vertex.weighted_point(),
                _ => WeightedPoint::unweighted(*vertex.point()),
            };
            let seeds = located_cells(tri, &location);
            let region =
                find_conflict_region(tri, &query, strategy.sphere_predicate(), &seeds)?;
            if region.is_empty() {
                if strategy == InsertionStrategy::Regular {
                    debug!("weighted point is hidden by its location");
                    return Ok(InsertionOutcome::Hidden);
                }
                warn!("empty conflict region for an unweighted point; splitting the located cells");
                star_hole(tri, vertex.point(), &location)?
            } else {
                region
            }
        }
    };

    fill_hole(tri, &hole, vertex)
}

/// Handles a point located on vertex `existing`. Only an exactly equal
/// position counts as the same point.
fn insert_on_vertex<K, U, V, const D: usize>(
    tri: &mut Triangulation<K, U, V, D>,
    vertex: Vertex<K::Scalar, U, D>,
    existing: VertexKey,
    strategy: InsertionStrategy,
) -> Result<InsertionOutcome<K::Scalar, U, D>, InsertionError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let current = tri
        .vertex(existing)
        .ok_or(TdsError::VertexNotFound { key: existing })?;
    if tri
        .kernel
        .compare_lexicographically(current.point(), vertex.point())
        != Ordering::Equal
    {
        warn!(?existing, "point located on a vertex it does not coincide with");
        return Err(InsertionError::NearDuplicate { existing });
    }
    let current_weight = current.weight();
    if strategy != InsertionStrategy::Regular || weights_equal(vertex.weight(), current_weight) {
        return Ok(InsertionOutcome::Existing(existing));
    }
    if vertex.weight() < current_weight {
        debug!("weighted point is hidden by an existing vertex");
        return Ok(InsertionOutcome::Hidden);
    }

    // The heavier point replaces the existing vertex.
    if tri.dim() == 0 {
        let replaced = tri.tds.remove_decrease_dimension(existing)?;
        tri.hull = AffineHull::new();
        let key = tri.insert_increasing_dimension(vertex)?;
        debug!(hidden = 1, "vertex hidden by a heavier point");
        return Ok(InsertionOutcome::Inserted {
            vertex: key,
            hidden: vec![replaced],
        });
    }
    let seeds = tri.incident_cells(existing);
    let region = find_conflict_region(tri, &vertex.weighted_point(), SpherePredicate::Power, &seeds)?;
    fill_hole(tri, &region, vertex)
}

/// Replaces `hole` with the star of `vertex`.
fn fill_hole<K, U, V, const D: usize>(
    tri: &mut Triangulation<K, U, V, D>,
    hole: &[CellKey],
    vertex: Vertex<K::Scalar, U, D>,
) -> Result<InsertionOutcome<K::Scalar, U, D>, InsertionError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let boundary = tri.tds.hole_boundary(hole)?;
    let fill = tri.tds.insert_in_hole(hole, &boundary, vertex)?;
    tri.last_cell = fill.new_cells.first().copied();
    trace!(
        removed = hole.len(),
        created = fill.new_cells.len(),
        "hole retriangulated"
    );
    if !fill.removed_vertices.is_empty() {
        debug!(hidden = fill.removed_vertices.len(), "vertices hidden by insertion");
    }
    Ok(InsertionOutcome::Inserted {
        vertex: fill.vertex,
        hidden: fill.removed_vertices,
    })
}

/// Cells that contain the located point, used to seed the conflict search.
fn located_cells<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    location: &LocateResult,
) -> CellKeyBuffer
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    match location {
        LocateResult::InsideCell(cell) | LocateResult::OutsideConvexHull(cell) => {
            std::iter::once(*cell).collect()
        }
        LocateResult::OnFace { face, .. } => tri.tds.cells_containing_face(face).into_iter().collect(),
        LocateResult::OnVertex { vertex, .. } => tri.incident_cells(*vertex).into_iter().collect(),
        LocateResult::OutsideAffineHull => CellKeyBuffer::new(),
    }
}

/// Hole of a star insertion: the located cell, the star of the located face,
/// or the infinite cells whose hull facet is strictly visible.
fn star_hole<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    point: &Point<K::Scalar, D>,
    location: &LocateResult,
) -> Result<CellKeyBuffer, InsertionError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let LocateResult::OutsideConvexHull(start) = *location else {
        return Ok(located_cells(tri, location));
    };
    let infinite = tri.infinite_vertex();
    let mut hole = CellKeyBuffer::new();
    let mut visited = CellKeySet::default();
    let mut stack = vec![start];
    visited.insert(start);
    while let Some(key) = stack.pop() {
        let cell = tri
            .cell(key)
            .ok_or(LocateError::InvalidCell { cell_key: key })?;
        let Some(slot) = cell.index_of(infinite) else {
            continue;
        };
        if tri.substituted_orientation(cell, slot, point)? != Some(Orientation::POSITIVE) {
            continue;
        }
        hole.push(key);
        for (i, neighbor) in cell.neighbors().iter().enumerate() {
            if i == slot {
                continue;
            }
            if let Some(n) = *neighbor
                && visited.insert(n)
            {
                stack.push(n);
            }
        }
    }
    Ok(hole)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vertex::{vertex, weighted_vertex};
    use crate::geometry::kernel::FastKernel;

    type Tri<const D: usize> = Triangulation<FastKernel<f64>, (), (), D>;

    fn inserted(outcome: InsertionOutcome<f64, (), 2>) -> VertexKey {
        match outcome {
            InsertionOutcome::Inserted { vertex, .. } => vertex,
            other => panic!("expected a new vertex, got {other:?}"),
        }
    }

    #[test]
    fn test_delaunay_insertion_restores_empty_circles() {
        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [4.0, 0.0], [2.0, 3.0], [2.0, -0.5]] {
            insert_vertex(&mut tri, vertex!(p), InsertionStrategy::Delaunay).unwrap();
        }
        assert!(tri.is_valid().is_ok());
        assert!(
            crate::core::util::delaunay_validation::validate_delaunay(&tri).is_ok()
        );
    }

    #[test]
    fn test_star_insertion_keeps_old_edges() {
        let mut star = Tri::<2>::default();
        let mut delaunay = Tri::<2>::default();
        for p in [[0.0, 0.0], [4.0, 0.0], [2.0, 3.0], [2.0, -0.5]] {
            insert_vertex(&mut star, vertex!(p), InsertionStrategy::Star).unwrap();
            insert_vertex(&mut delaunay, vertex!(p), InsertionStrategy::Delaunay).unwrap();
        }
        // [2, -0.5] lies below the hull edge and inside the circumcircle:
        // star insertion keeps the edge, Delaunay insertion flips it away
        assert_eq!(star.number_of_finite_cells(), 2);
        assert_eq!(delaunay.number_of_finite_cells(), 2);
        assert!(crate::core::util::delaunay_validation::validate_delaunay(&star).is_err());
    }

    #[test]
    fn test_regular_point_dominated_by_neighbors_is_hidden() {
        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]] {
            insert_vertex(&mut tri, weighted_vertex!(p, 4.0), InsertionStrategy::Regular)
                .unwrap();
        }
        let outcome =
            insert_vertex(&mut tri, weighted_vertex!([1.0, 1.0], -10.0), InsertionStrategy::Regular)
                .unwrap();
        assert!(matches!(outcome, InsertionOutcome::Hidden));
        assert_eq!(tri.number_of_vertices(), 3);
    }

    #[test]
    fn test_regular_heavy_point_hides_vertex() {
        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0], [1.0, 1.0]] {
            insert_vertex(&mut tri, weighted_vertex!(p, 0.0), InsertionStrategy::Regular)
                .unwrap();
        }
        assert_eq!(tri.number_of_vertices(), 4);
        let outcome = insert_vertex(
            &mut tri,
            weighted_vertex!([1.2, 1.2], 20.0),
            InsertionStrategy::Regular,
        )
        .unwrap();
        match outcome {
            InsertionOutcome::Inserted { hidden, .. } => {
                assert_eq!(hidden.len(), 1);
                assert_eq!(hidden[0].point().coords(), &[1.0, 1.0]);
            }
            other => panic!("expected insertion, got {other:?}"),
        }
        assert_eq!(tri.number_of_vertices(), 4);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_regular_same_position_by_weight() {
        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]] {
            insert_vertex(&mut tri, weighted_vertex!(p, 1.0), InsertionStrategy::Regular)
                .unwrap();
        }
        let lighter =
            insert_vertex(&mut tri, weighted_vertex!([4.0, 0.0], 0.5), InsertionStrategy::Regular)
                .unwrap();
        assert!(matches!(lighter, InsertionOutcome::Hidden));
        let equal =
            insert_vertex(&mut tri, weighted_vertex!([4.0, 0.0], 1.0), InsertionStrategy::Regular)
                .unwrap();
        assert!(matches!(equal, InsertionOutcome::Existing(_)));
        let heavier = inserted(
            insert_vertex(&mut tri, weighted_vertex!([4.0, 0.0], 3.0), InsertionStrategy::Regular)
                .unwrap(),
        );
        assert!((tri.vertex(heavier).unwrap().weight() - 3.0).abs() < f64::EPSILON);
        assert_eq!(tri.number_of_vertices(), 3);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_regular_replacement_in_dimension_zero() {
        let mut tri = Tri::<2>::default();
        insert_vertex(&mut tri, weighted_vertex!([1.0, 1.0], 1.0), InsertionStrategy::Regular)
            .unwrap();
        let key = inserted(
            insert_vertex(&mut tri, weighted_vertex!([1.0, 1.0], 2.0), InsertionStrategy::Regular)
                .unwrap(),
        );
        assert_eq!(tri.dim(), 0);
        assert_eq!(tri.number_of_vertices(), 1);
        assert!((tri.vertex(key).unwrap().weight() - 2.0).abs() < f64::EPSILON);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_nearby_point_is_not_merged_in_dimension_zero() {
        let mut tri = Tri::<2>::default();
        let first = inserted(
            insert_vertex(&mut tri, vertex!([0.0, 0.0]), InsertionStrategy::Delaunay).unwrap(),
        );
        let second = inserted(
            insert_vertex(&mut tri, vertex!([1e-11, 0.0]), InsertionStrategy::Delaunay).unwrap(),
        );
        assert_ne!(first, second);
        assert_eq!(tri.number_of_vertices(), 2);
        assert_eq!(tri.dim(), 1);
        assert!(tri.is_valid().is_ok());

        let again =
            insert_vertex(&mut tri, vertex!([1e-11, 0.0]), InsertionStrategy::Delaunay).unwrap();
        assert!(matches!(again, InsertionOutcome::Existing(key) if key == second));
        assert_eq!(tri.number_of_vertices(), 2);
    }

    #[test]
    fn test_near_duplicate_is_rejected_without_changes() {
        let mut tri = Tri::<2>::default();
        let origin = inserted(
            insert_vertex(&mut tri, vertex!([0.0, 0.0]), InsertionStrategy::Delaunay).unwrap(),
        );
        for p in [[1.0, 0.0], [0.0, 1.0]] {
            insert_vertex(&mut tri, vertex!(p), InsertionStrategy::Delaunay).unwrap();
        }
        let cells = tri.number_of_cells();
        let result =
            insert_vertex(&mut tri, vertex!([1e-17, 1e-17]), InsertionStrategy::Delaunay);
        assert!(matches!(
            result,
            Err(InsertionError::NearDuplicate { existing }) if existing == origin
        ));
        assert_eq!(tri.number_of_vertices(), 3);
        assert_eq!(tri.number_of_cells(), cells);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_invalid_vertex_rejected() {
        let mut tri = Tri::<2>::default();
        let result = insert_vertex(
            &mut tri,
            weighted_vertex!([0.0, 0.0], f64::NAN),
            InsertionStrategy::Delaunay,
        );
        assert!(matches!(result, Err(InsertionError::InvalidVertex(_))));
        assert_eq!(tri.dim(), -1);
    }

    #[test]
    fn test_outside_hull_in_3d() {
        let mut tri = Tri::<3>::default();
        for p in [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [2.0, 2.0, 2.0],
            [-1.0, 0.5, 0.5],
        ] {
            insert_vertex(&mut tri, vertex!(p), InsertionStrategy::Delaunay).unwrap();
        }
        assert_eq!(tri.dim(), 3);
        assert_eq!(tri.number_of_vertices(), 6);
        assert!(tri.is_valid().is_ok());
        assert!(crate::core::util::delaunay_validation::validate_delaunay(&tri).is_ok());
    }
}
