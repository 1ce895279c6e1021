//! Bistellar flips and Lawson flipping.
//!
//! A flip replaces the two finite cells `A = F + a` and `B = F + b` sharing
//! the facet `F` by the `k` cells spanned by the edge `ab` and the ridges of
//! `F` (the 2-2 edge flip in 2D, the 2-3 flip in 3D). It is geometrically
//! legal when `ab` crosses the interior of `F`, i.e. every new cell is
//! positively oriented.
//!
//! [`make_delaunay_by_flips`] flips non-locally-Delaunay facets until none is
//! left or the remaining ones cannot be flipped.
//!
//! # References
//!
//! - C. L. Lawson, "Software for C1 Surface Interpolation", 1977.
//! - H. Edelsbrunner and N. R. Shah, "Incremental Topological Flipping Works
//!   for Regular Triangulations", Algorithmica 15 (1996).

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::core::collections::{CellKeyBuffer, MAX_PRACTICAL_DIMENSION_SIZE, SmallBuffer};
use crate::core::traits::data_type::DataType;
use crate::core::triangulation::{SpherePredicate, Triangulation};
use crate::core::triangulation_data_structure::{CellKey, TdsError};
use crate::geometry::kernel::Kernel;
use crate::geometry::predicates::{InSphere, Orientation};
use crate::geometry::traits::coordinate::CoordinateConversionError;
use crate::geometry::weighted_point::WeightedPoint;

/// Error during a bistellar flip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlipError {
    /// Flips need a triangulation of dimension at least 2.
    #[error("Flips need dimension >= 2, the triangulation has dimension {dimension}")]
    DimensionTooLow {
        /// The current dimension.
        dimension: i32,
    },

    /// One of the two cells is infinite.
    #[error("Cell {cell:?} is infinite; hull facets cannot be flipped")]
    InfiniteCell {
        /// The infinite cell.
        cell: CellKey,
    },

    /// The flip is combinatorially or geometrically impossible.
    #[error("Facet {index} of cell {cell:?} is not flippable: {reason}")]
    NotFlippable {
        /// The cell.
        cell: CellKey,
        /// Slot opposite the facet.
        index: usize,
        /// Why the flip was refused.
        reason: String,
    },

    /// The cell does not exist or has no such facet.
    #[error("Cell {cell:?} has no facet {index}")]
    InvalidFacet {
        /// The cell.
        cell: CellKey,
        /// The requested slot.
        index: usize,
    },

    /// Geometric predicate failed.
    #[error("Predicate error: {0}")]
    Predicate(#[from] CoordinateConversionError),

    /// The data structure rejected the flip.
    #[error("Data structure error: {0}")]
    Tds(#[from] TdsError),
}

/// Counters reported by [`make_delaunay_by_flips`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlipStatistics {
    /// Number of flips performed.
    pub flips_performed: usize,
    /// Facets still violating the empty-sphere property that could not be flipped.
    pub non_flippable: usize,
}

/// Geometrically checked flip of the facet of `cell` opposite slot `i`.
///
/// Returns the new cells.
///
/// # Errors
///
/// Returns [`FlipError::DimensionTooLow`] below dimension 2,
/// [`FlipError::InfiniteCell`] for hull facets and
/// [`FlipError::NotFlippable`] when the union of the two cells is not convex
/// or the edge `ab` already exists.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::algorithms::flips::flip;
/// use simplicial::prelude::*;
///
/// let mut tri: Triangulation<FastKernel<f64>, (), (), 2> = Triangulation::default();
/// for p in [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.5, 2.5]] {
///     tri.insert(vertex!(p)).unwrap();
/// }
/// let (cell, slot) = tri
///     .finite_cells()
///     .find_map(|(key, c)| {
///         (0..3)
///             .find(|&i| c.neighbor(i).is_some_and(|n| !tri.is_infinite_cell(n)))
///             .map(|i| (key, i))
///     })
///     .unwrap();
/// let created = flip(&mut tri, cell, slot).unwrap();
/// assert_eq!(created.len(), 2);
/// assert!(tri.is_valid().is_ok());
/// ```
pub fn flip<K, U, V, const D: usize>(
    tri: &mut Triangulation<K, U, V, D>,
    cell: CellKey,
    i: usize,
) -> Result<CellKeyBuffer, FlipError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let dimension = tri.dim();
    if dimension < 2 {
        return Err(FlipError::DimensionTooLow { dimension });
    }
    let a_cell = tri
        .cell(cell)
        .filter(|c| i < c.number_of_vertices())
        .ok_or(FlipError::InvalidFacet { cell, index: i })?;
    let neighbor = a_cell
        .neighbor(i)
        .ok_or(FlipError::InvalidFacet { cell, index: i })?;
    for key in [cell, neighbor] {
        if tri.is_infinite_cell(key) {
            return Err(FlipError::InfiniteCell { cell: key });
        }
    }
    let b = tri
        .tds
        .mirror_vertex(cell, i)
        .and_then(|v| tri.point(v).copied())
        .ok_or(FlipError::InvalidFacet { cell, index: i })?;

    for p in (0..a_cell.number_of_vertices()).filter(|&p| p != i) {
        if tri.substituted_orientation(a_cell, p, &b)? != Some(Orientation::POSITIVE) {
            return Err(FlipError::NotFlippable {
                cell,
                index: i,
                reason: "the union of the two cells is not convex".to_string(),
            });
        }
    }

    let created = tri.tds.flip_facet(cell, i).map_err(|err| match err {
        TdsError::NonFlippableFacet {
            cell,
            index,
            message,
        } => FlipError::NotFlippable {
            cell,
            index,
            reason: message,
        },
        other => FlipError::Tds(other),
    })?;
    tri.last_cell = created.first().copied();
    Ok(created)
}

/// `true` unless both cells across the facet are finite and the opposite
/// vertex lies strictly inside the circumsphere of `cell`.
///
/// # Errors
///
/// Returns [`FlipError::InvalidFacet`] for a missing cell or slot and
/// [`FlipError::Predicate`] if the sphere test fails.
pub fn is_locally_delaunay<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    cell: CellKey,
    i: usize,
) -> Result<bool, FlipError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let c = tri
        .cell(cell)
        .filter(|c| i < c.number_of_vertices())
        .ok_or(FlipError::InvalidFacet { cell, index: i })?;
    let Some(neighbor) = c.neighbor(i) else {
        return Err(FlipError::InvalidFacet { cell, index: i });
    };
    if tri.is_infinite_cell(cell) || tri.is_infinite_cell(neighbor) {
        return Ok(true);
    }
    let Some(opposite) = tri.tds.mirror_vertex(cell, i).and_then(|v| tri.point(v)) else {
        return Err(FlipError::InvalidFacet { cell, index: i });
    };
    let query = WeightedPoint::unweighted(*opposite);
    Ok(tri.side_of_cell_sphere(c, &query, SpherePredicate::InSphere)? != InSphere::INSIDE)
}

/// Flips cap per initial cell; Lawson flipping terminates well before it.
const MAX_FLIPS_PER_CELL: usize = 64;

/// Lawson flipping: flips facets that are not locally Delaunay until none is
/// left.
///
/// In 2D the result is the Delaunay triangulation. In higher dimensions a
/// facet whose two cells have a non-convex union cannot be flipped by a 2-k
/// flip; such facets are skipped and counted in
/// [`FlipStatistics::non_flippable`].
///
/// # Errors
///
/// Returns [`FlipError::Predicate`] or [`FlipError::Tds`] if a predicate or
/// a flip fails unexpectedly.
pub fn make_delaunay_by_flips<K, U, V, const D: usize>(
    tri: &mut Triangulation<K, U, V, D>,
) -> Result<FlipStatistics, FlipError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let mut stats = FlipStatistics::default();
    if tri.dim() < 2 {
        return Ok(stats);
    }

    let mut queue: VecDeque<(CellKey, usize)> = tri
        .finite_cells()
        .flat_map(|(key, cell)| (0..cell.number_of_vertices()).map(move |i| (key, i)))
        .collect();
    let max_flips = MAX_FLIPS_PER_CELL.saturating_mul(tri.number_of_cells().max(1));

    while let Some((cell, i)) = queue.pop_front() {
        if stats.flips_performed >= max_flips {
            warn!(max_flips, "flip budget exhausted");
            break;
        }
        if !tri.tds.contains_cell(cell) || is_locally_delaunay(tri, cell, i)? {
            continue;
        }
        match flip(tri, cell, i) {
            Ok(created) => {
                stats.flips_performed += 1;
                for &key in &created {
                    let arity = tri.cell(key).map_or(0, |c| c.number_of_vertices());
                    queue.extend((0..arity).map(|slot| (key, slot)));
                }
            }
            Err(FlipError::NotFlippable { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    stats.non_flippable = count_non_locally_delaunay(tri)?;
    if stats.non_flippable > 0 {
        warn!(
            non_flippable = stats.non_flippable,
            "non-locally-Delaunay facets remain after flipping"
        );
    }
    debug!(flips = stats.flips_performed, "Lawson flipping finished");
    Ok(stats)
}

/// Number of interior facets that are not locally Delaunay, each counted once.
fn count_non_locally_delaunay<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
) -> Result<usize, FlipError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let mut count = 0;
    for (key, cell) in tri.finite_cells() {
        let slots: SmallBuffer<usize, MAX_PRACTICAL_DIMENSION_SIZE> = (0..cell.number_of_vertices())
            .filter(|&i| cell.neighbor(i).is_some_and(|n| key < n))
            .collect();
        for i in slots {
            if !is_locally_delaunay(tri, key, i)? {
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triangulation_data_structure::VertexKey;
    use crate::core::util::delaunay_validation::validate_delaunay;
    use crate::core::vertex::vertex;
    use crate::geometry::kernel::FastKernel;
    use crate::geometry::util::generate_random_points_seeded;

    type Tri<const D: usize> = Triangulation<FastKernel<f64>, (), (), D>;

    fn key_of<const D: usize>(tri: &Tri<D>, coords: [f64; D]) -> VertexKey {
        tri.finite_vertices()
            .find(|(_, v)| v.point().coords() == &coords)
            .map(|(k, _)| k)
            .unwrap()
    }

    /// The finite cell containing all `vertices`, and the slot of `opposite` in it.
    fn facet_of<const D: usize>(
        tri: &Tri<D>,
        vertices: &[VertexKey],
        opposite: VertexKey,
    ) -> (CellKey, usize) {
        let mut face = vertices.to_vec();
        face.push(opposite);
        let cell = tri.tds().cells_containing_face(&face)[0];
        (cell, tri.cell(cell).unwrap().index_of(opposite).unwrap())
    }

    #[test]
    fn test_edge_flip_in_2d() {
        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [4.0, 0.0], [2.0, 3.0], [2.0, -0.5]] {
            tri.insert(vertex!(p)).unwrap();
        }
        let (a, b, top) = (
            key_of(&tri, [0.0, 0.0]),
            key_of(&tri, [4.0, 0.0]),
            key_of(&tri, [2.0, 3.0]),
        );
        let (cell, i) = facet_of(&tri, &[a, b], top);
        assert!(!is_locally_delaunay(&tri, cell, i).unwrap());
        let created = flip(&mut tri, cell, i).unwrap();
        assert_eq!(created.len(), 2);
        assert!(tri.is_valid().is_ok());
        assert!(validate_delaunay(&tri).is_ok());
        assert!(tri.tds().cells_containing_face(&[a, b]).iter().all(|&c| tri.is_infinite_cell(c)));
    }

    #[test]
    fn test_non_convex_quadrilateral_is_not_flippable() {
        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [3.0, -0.5]] {
            tri.insert(vertex!(p)).unwrap();
        }
        let (o, x, y) = (
            key_of(&tri, [0.0, 0.0]),
            key_of(&tri, [2.0, 0.0]),
            key_of(&tri, [0.0, 2.0]),
        );
        let (cell, i) = facet_of(&tri, &[x, y], o);
        let cells_before = tri.number_of_cells();
        assert!(matches!(
            flip(&mut tri, cell, i),
            Err(FlipError::NotFlippable { .. })
        ));
        assert_eq!(tri.number_of_cells(), cells_before);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_flip_preconditions() {
        let mut line = Tri::<2>::default();
        for p in [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]] {
            line.insert(vertex!(p)).unwrap();
        }
        let (cell, _) = line.finite_cells().next().unwrap();
        assert_eq!(
            flip(&mut line, cell, 0),
            Err(FlipError::DimensionTooLow { dimension: 1 })
        );

        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]] {
            tri.insert(vertex!(p)).unwrap();
        }
        let (cell, _) = tri.finite_cells().next().unwrap();
        assert!(matches!(flip(&mut tri, cell, 0), Err(FlipError::InfiniteCell { .. })));
        assert!(matches!(flip(&mut tri, cell, 7), Err(FlipError::InvalidFacet { .. })));
    }

    #[test]
    fn test_two_three_flip_in_3d() {
        let mut tri = Tri::<3>::default();
        for p in [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.3, 0.3, 1.0],
            [0.3, 0.3, -1.0],
        ] {
            tri.insert(vertex!(p)).unwrap();
        }
        assert_eq!(tri.number_of_finite_cells(), 2);
        let top = key_of(&tri, [0.3, 0.3, 1.0]);
        let base = [
            key_of(&tri, [0.0, 0.0, 0.0]),
            key_of(&tri, [1.0, 0.0, 0.0]),
            key_of(&tri, [0.0, 1.0, 0.0]),
        ];
        let (cell, i) = facet_of(&tri, &base, top);
        let created = flip(&mut tri, cell, i).unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(tri.number_of_finite_cells(), 3);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_lawson_flipping_yields_delaunay_in_2d() {
        let points = generate_random_points_seeded::<f64, 2>(40, (-10.0, 10.0), 1234).unwrap();
        let mut plain = Tri::<2>::default();
        for p in &points {
            plain.insert(vertex!(*p.coords())).unwrap();
        }
        let stats = make_delaunay_by_flips(&mut plain).unwrap();
        assert!(stats.flips_performed > 0);
        assert_eq!(stats.non_flippable, 0);
        assert!(plain.is_valid().is_ok());
        assert!(validate_delaunay(&plain).is_ok());
    }

    #[test]
    fn test_lawson_flipping_on_delaunay_input_is_noop() {
        let mut tri = Tri::<2>::default();
        for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]] {
            tri.insert(vertex!(p)).unwrap();
        }
        assert_eq!(make_delaunay_by_flips(&mut tri).unwrap(), FlipStatistics::default());
    }
}
