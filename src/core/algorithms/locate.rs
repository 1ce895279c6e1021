//! Point location for triangulations.
//!
//! Implements the remembering stochastic visibility walk: starting from a hint
//! cell, repeatedly cross a facet that separates the current cell from the
//! query point. Facets are scanned from a random offset so that the walk
//! cannot cycle on degenerate configurations, and the facet just crossed is
//! never tested again.
//!
//! # Classification
//!
//! When no facet separates the cell from the query, the number of facets
//! whose substituted orientation is degenerate tells where the point lies:
//! none means inside the cell, `k` means on a vertex, anything in between
//! means on the face spanned by the remaining vertices.
//!
//! # References
//!
//! - O. Devillers, S. Pion, and M. Teillaud, "Walking in a Triangulation",
//!   International Journal of Foundations of Computer Science, 2001.
//! - CGAL Triangulation documentation

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::core::collections::{CellKeyBuffer, CellKeySet, FastHasher, VertexKeyBuffer};
use crate::core::traits::data_type::DataType;
use crate::core::triangulation::{SpherePredicate, Triangulation};
use crate::core::triangulation_data_structure::{CellKey, VertexKey};
use crate::geometry::kernel::Kernel;
use crate::geometry::point::Point;
use crate::geometry::predicates::{InSphere, Orientation};
use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};
use crate::geometry::weighted_point::WeightedPoint;

/// Result of a point location query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateResult {
    /// The point is strictly inside a finite cell.
    InsideCell(CellKey),
    /// The point lies in the relative interior of a face of `cell`.
    /// The face has dimension `face.len() - 1`.
    OnFace {
        /// A finite cell containing the face.
        cell: CellKey,
        /// Vertices of the face.
        face: VertexKeyBuffer,
    },
    /// The point coincides with a vertex.
    OnVertex {
        /// A finite cell containing the vertex.
        cell: CellKey,
        /// The vertex.
        vertex: VertexKey,
    },
    /// The point is outside the convex hull; the infinite cell's hull facet is
    /// visible from it.
    OutsideConvexHull(CellKey),
    /// The triangulation is not full-dimensional and the point leaves its
    /// affine hull.
    OutsideAffineHull,
}

/// Error during point location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    /// Triangulation has no vertices.
    #[error("Cannot locate in empty triangulation")]
    EmptyTriangulation,

    /// A cell reached by the walk does not exist.
    #[error("Invalid cell reference: {cell_key:?}")]
    InvalidCell {
        /// The invalid cell key
        cell_key: CellKey,
    },

    /// Geometric predicate failed.
    #[error("Predicate error: {source}")]
    PredicateError {
        #[from]
        /// The underlying coordinate conversion error
        source: CoordinateConversionError,
    },

    /// Neither the walk nor the exhaustive scan classified the point.
    #[error("Point could not be located: no cell contains it and no hull facet is visible")]
    Unlocatable,
}

/// Error during conflict region computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    /// Starting cell is invalid
    #[error("Invalid starting cell: {cell_key:?}")]
    InvalidStartCell {
        /// The invalid cell key
        cell_key: CellKey,
    },

    /// Geometric predicate failed
    #[error("Predicate error: {source}")]
    PredicateError {
        #[from]
        /// The underlying coordinate conversion error
        source: CoordinateConversionError,
    },
}

/// Point location settings.
///
/// ```rust
/// use simplicial::core::algorithms::locate::LocateOptions;
///
/// let options = LocateOptions { seed: 7, ..LocateOptions::default() };
/// assert_eq!(options.step_limit_factor, LocateOptions::default().step_limit_factor);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocateOptions {
    /// Seed combined with a hash of the query coordinates to seed the walk.
    pub seed: u64,
    /// The walk gives up after `step_limit_factor × number_of_cells` steps
    /// and falls back to an exhaustive scan.
    pub step_limit_factor: usize,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            seed: 0x9e37_79b9_7f4a_7c15,
            step_limit_factor: 4,
        }
    }
}

/// Smallest step budget, whatever the number of cells.
const MIN_STEP_LIMIT: usize = 64;

/// Locates `point` in `tri` by a visibility walk starting at `hint`.
///
/// # Errors
///
/// Returns [`LocateError::EmptyTriangulation`] for an empty triangulation,
/// [`LocateError::PredicateError`] for non-finite coordinates and
/// [`LocateError::Unlocatable`] if even the exhaustive scan fails.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::algorithms::locate::{locate, LocateResult};
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 2> = DelaunayTriangulation::new();
/// for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]] {
///     dt.insert(vertex!(p)).unwrap();
/// }
/// assert!(matches!(
///     locate(&dt, &Point::new([1.0, 1.0]), None).unwrap(),
///     LocateResult::InsideCell(_)
/// ));
/// assert!(matches!(
///     locate(&dt, &Point::new([2.0, 0.0]), None).unwrap(),
///     LocateResult::OnFace { ref face, .. } if face.len() == 2
/// ));
/// assert!(matches!(
///     locate(&dt, &Point::new([5.0, 5.0]), None).unwrap(),
///     LocateResult::OutsideConvexHull(_)
/// ));
/// ```
pub fn locate<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    point: &Point<K::Scalar, D>,
    hint: Option<CellKey>,
) -> Result<LocateResult, LocateError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let dimension = tri.dim();
    if dimension < 0 {
        return Err(LocateError::EmptyTriangulation);
    }
    if !tri.contains_in_hull(point)? {
        return Ok(LocateResult::OutsideAffineHull);
    }
    if dimension == 0 {
        let (cell, vertex) = tri
            .finite_cells()
            .find_map(|(key, cell)| cell.vertex(0).map(|v| (key, v)))
            .ok_or(LocateError::Unlocatable)?;
        return Ok(LocateResult::OnVertex { cell, vertex });
    }

    let Some(mut current) = start_cell(tri, hint) else {
        return Err(LocateError::EmptyTriangulation);
    };
    let options = tri.locate_options();
    let mut rng = StdRng::seed_from_u64(options.seed ^ hash_point(point));
    let step_limit = options
        .step_limit_factor
        .saturating_mul(tri.number_of_cells())
        .max(MIN_STEP_LIMIT);
    let mut previous: Option<CellKey> = None;

    for step in 0..step_limit {
        let cell = tri
            .cell(current)
            .ok_or(LocateError::InvalidCell { cell_key: current })?;
        let facets = cell.number_of_vertices();
        let offset = rng.random_range(0..facets);
        let mut crossed = None;
        for t in 0..facets {
            let i = (offset + t) % facets;
            let neighbor = cell.neighbor(i);
            if neighbor.is_some() && neighbor == previous {
                continue;
            }
            if tri.substituted_orientation(cell, i, point)? == Some(Orientation::NEGATIVE) {
                crossed = Some(neighbor.ok_or(LocateError::InvalidCell { cell_key: current })?);
                break;
            }
        }
        match crossed {
            Some(next) if tri.is_infinite_cell(next) => {
                trace!(steps = step + 1, "walk left the convex hull");
                return Ok(LocateResult::OutsideConvexHull(next));
            }
            Some(next) => {
                previous = Some(current);
                current = next;
            }
            None => {
                trace!(steps = step + 1, "walk reached the query");
                return classify(tri, current, point)?.ok_or(LocateError::Unlocatable);
            }
        }
    }

    warn!(
        step_limit,
        "visibility walk exceeded its step limit; scanning all cells"
    );
    locate_exhaustively(tri, point)
}

/// Deterministic fallback: tests every finite cell in arena order, then every
/// infinite cell.
///
/// # Errors
///
/// Same conditions as [`locate`].
pub fn locate_exhaustively<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    point: &Point<K::Scalar, D>,
) -> Result<LocateResult, LocateError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    if tri.dim() < 1 {
        return locate(tri, point, None);
    }
    for (key, _) in tri.finite_cells() {
        if let Some(result) = classify(tri, key, point)? {
            return Ok(result);
        }
    }
    let infinite = tri.infinite_vertex();
    for (key, cell) in tri.cells() {
        if let Some(slot) = cell.index_of(infinite)
            && tri.substituted_orientation(cell, slot, point)? == Some(Orientation::POSITIVE)
        {
            return Ok(LocateResult::OutsideConvexHull(key));
        }
    }
    Err(LocateError::Unlocatable)
}

/// Cells whose (power) sphere strictly contains `query`.
///
/// Breadth-first search from the `seeds` that are themselves in conflict.
/// Points on a sphere are not in conflict, so co-spherical ties leave the
/// region star-shaped. Infinite cells conflict when `query` sees their hull
/// facet, or lies on its hyperplane inside the facet's sphere.
///
/// # Errors
///
/// Returns [`ConflictError::InvalidStartCell`] for a stale seed and
/// [`ConflictError::PredicateError`] if a predicate fails.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::algorithms::locate::{find_conflict_region, LocateResult};
/// use simplicial::core::triangulation::SpherePredicate;
/// use simplicial::geometry::weighted_point::WeightedPoint;
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 2> = DelaunayTriangulation::new();
/// for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
///     dt.insert(vertex!(p)).unwrap();
/// }
/// let query = Point::new([0.5, 0.5]);
/// let LocateResult::OnFace { cell, .. } = dt.locate(&query).unwrap() else {
///     panic!("the center lies on the diagonal");
/// };
/// let region = find_conflict_region(
///     &dt,
///     &WeightedPoint::unweighted(query),
///     SpherePredicate::InSphere,
///     &[cell],
/// )
/// .unwrap();
/// assert_eq!(region.len(), 2);
/// ```
pub fn find_conflict_region<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    query: &WeightedPoint<K::Scalar, D>,
    predicate: SpherePredicate,
    seeds: &[CellKey],
) -> Result<CellKeyBuffer, ConflictError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let mut region = CellKeyBuffer::new();
    let mut visited = CellKeySet::default();
    let mut queue: VecDeque<CellKey> = VecDeque::new();

    for &seed in seeds {
        let cell = tri
            .cell(seed)
            .ok_or(ConflictError::InvalidStartCell { cell_key: seed })?;
        if visited.insert(seed) && tri.side_of_cell_sphere(cell, query, predicate)? == InSphere::INSIDE
        {
            queue.push_back(seed);
        }
    }

    while let Some(cell_key) = queue.pop_front() {
        region.push(cell_key);
        let cell = tri
            .cell(cell_key)
            .ok_or(ConflictError::InvalidStartCell { cell_key })?;
        for &neighbor in cell.neighbors().iter().flatten() {
            if !visited.insert(neighbor) {
                continue;
            }
            let next = tri
                .cell(neighbor)
                .ok_or(ConflictError::InvalidStartCell { cell_key: neighbor })?;
            if tri.side_of_cell_sphere(next, query, predicate)? == InSphere::INSIDE {
                queue.push_back(neighbor);
            }
        }
    }

    trace!(cells = region.len(), "conflict region computed");
    Ok(region)
}

/// Finite cell to start from: the hint, or a finite neighbor of it, or any finite cell.
fn start_cell<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    hint: Option<CellKey>,
) -> Option<CellKey>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let infinite = tri.infinite_vertex();
    let from_hint = hint.and_then(|key| {
        let cell = tri.cell(key)?;
        match cell.index_of(infinite) {
            None => Some(key),
            Some(slot) => cell.neighbor(slot),
        }
    });
    from_hint.or_else(|| tri.finite_cells().next().map(|(key, _)| key))
}

/// Where `point` lies relative to the finite cell `cell_key`, if it is in it.
fn classify<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    cell_key: CellKey,
    point: &Point<K::Scalar, D>,
) -> Result<Option<LocateResult>, LocateError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let cell = tri
        .cell(cell_key)
        .ok_or(LocateError::InvalidCell { cell_key })?;
    let mut face = VertexKeyBuffer::new();
    for (i, &v) in cell.vertices().iter().enumerate() {
        match tri.substituted_orientation(cell, i, point)? {
            Some(Orientation::POSITIVE) => face.push(v),
            Some(Orientation::DEGENERATE) => {}
            Some(Orientation::NEGATIVE) | None => return Ok(None),
        }
    }
    Ok(match face.len() {
        0 => None,
        1 => Some(LocateResult::OnVertex {
            cell: cell_key,
            vertex: face[0],
        }),
        n if n == cell.number_of_vertices() => Some(LocateResult::InsideCell(cell_key)),
        _ => Some(LocateResult::OnFace {
            cell: cell_key,
            face,
        }),
    })
}

fn hash_point<T, const D: usize>(point: &Point<T, D>) -> u64
where
    T: CoordinateScalar,
    Point<T, D>: Hash,
{
    let mut hasher = FastHasher::default();
    point.hash(&mut hasher);
    hasher.finish()
}
