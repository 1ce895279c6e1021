//! Vertex removal.
//!
//! Removing a vertex `v` of a `k`-dimensional triangulation takes one of two
//! routes:
//!
//! - **Dimension drop.** If the remaining points span only a `(k-1)`-flat,
//!   every finite cell contains `v`; dropping `v` from every cell yields the
//!   triangulation of the remaining points
//!   ([`Tds::remove_decrease_dimension`](crate::core::triangulation_data_structure::Tds::remove_decrease_dimension)).
//! - **Star re-triangulation.** Otherwise the finite link vertices of `v` are
//!   triangulated on their own with the same kernel and sphere predicate.
//!   The auxiliary cells filling the cavity are collected by a flood fill
//!   bounded by the link facets, starting across a finite link facet on the
//!   side of `v`. When the link vertices only span a `(k-1)`-flat, `v` was on
//!   the hull and the cavity is filled by the cone from the infinite vertex
//!   over the auxiliary cells.
//!
//! Either way the data structure is left untouched if anything fails.

use std::collections::VecDeque;

use tracing::debug;

use crate::core::algorithms::incremental_insertion::{
    InsertionOutcome, InsertionStrategy, insert_vertex,
};
use crate::core::collections::{
    CellKeySet, CellVertexBuffer, FastHashSet, KeyBasedVertexMap, VertexKeyBuffer,
};
use crate::core::traits::data_type::DataType;
use crate::core::triangulation::{SimplexPoints, SpherePredicate, Triangulation};
use crate::core::triangulation_data_structure::{CellKey, TdsError, VertexKey};
use crate::core::util::permutation::sorted_vertex_keys;
use crate::core::vertex::Vertex;
use crate::geometry::affine_hull::AffineHull;
use crate::geometry::kernel::Kernel;
use crate::geometry::predicates::Orientation;
use crate::geometry::traits::coordinate::CoordinateConversionError;
use crate::geometry::util::point_to_f64;

/// Error during vertex removal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemovalError {
    /// The infinite vertex is part of every triangulation.
    #[error("The infinite vertex cannot be removed")]
    InfiniteVertex,

    /// The vertex does not exist.
    #[error("Vertex not found: {key:?}")]
    VertexNotFound {
        /// The missing key.
        key: VertexKey,
    },

    /// Geometric predicate failed.
    #[error("Predicate error: {0}")]
    Predicate(#[from] CoordinateConversionError),

    /// The cavity could not be re-triangulated consistently.
    #[error("Star re-triangulation failed: {message}")]
    Retriangulation {
        /// What went wrong.
        message: String,
    },

    /// The data structure rejected the mutation.
    #[error("Data structure error: {0}")]
    Tds(#[from] TdsError),
}

/// Removes `vertex` from `tri`, keeping the empty-sphere property of
/// `predicate`.
///
/// Returns a cell near the removed point, usable as a locate hint, or `None`
/// once the triangulation is empty.
///
/// # Errors
///
/// Returns [`RemovalError::InfiniteVertex`] and
/// [`RemovalError::VertexNotFound`] for bad keys, and
/// [`RemovalError::Retriangulation`] if the cavity cannot be filled; the
/// triangulation is unchanged on error.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::algorithms::removal::remove_vertex;
/// use simplicial::core::triangulation::SpherePredicate;
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 2> = DelaunayTriangulation::new();
/// let mut keys = Vec::new();
/// for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0], [1.0, 1.0]] {
///     keys.push(dt.insert(vertex!(p)).unwrap());
/// }
/// assert_eq!(dt.number_of_finite_cells(), 3);
/// dt.remove(keys[3]).unwrap();
/// assert_eq!(dt.number_of_finite_cells(), 1);
/// ```
pub fn remove_vertex<K, U, V, const D: usize>(
    tri: &mut Triangulation<K, U, V, D>,
    vertex: VertexKey,
    predicate: SpherePredicate,
) -> Result<Option<CellKey>, RemovalError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    if tri.is_infinite_vertex(vertex) {
        return Err(RemovalError::InfiniteVertex);
    }
    if tri.vertex(vertex).is_none() {
        return Err(RemovalError::VertexNotFound { key: vertex });
    }

    let dimension = tri.dim();
    if dimension == 0 {
        tri.tds.remove_decrease_dimension(vertex)?;
        tri.hull = AffineHull::new();
        tri.last_cell = None;
        debug!("last vertex removed");
        return Ok(None);
    }

    let remaining = remaining_hull(tri, vertex)?;
    if remaining.dimension() < dimension {
        tri.tds.remove_decrease_dimension(vertex)?;
        tri.hull = remaining;
        tri.fix_orientation()?;
        let first = tri.finite_cells().next().map(|(key, _)| key);
        tri.last_cell = first;
        debug!(dimension = tri.dim(), "vertex removal lowered the dimension");
        return Ok(tri.last_cell);
    }

    let cells = retriangulate_star(tri, vertex, predicate)?;
    let created = tri
        .tds
        .replace_vertex_star(vertex, &cells)
        .map_err(|err| match err {
            TdsError::InvalidHole { message } => RemovalError::Retriangulation { message },
            other => RemovalError::Tds(other),
        })?;
    tri.last_cell = created.first().copied();
    debug!(created = created.len(), "vertex star re-triangulated");
    Ok(tri.last_cell)
}

/// Affine hull of the finite vertices other than `vertex`.
fn remaining_hull<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    vertex: VertexKey,
) -> Result<AffineHull<D>, CoordinateConversionError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let coords: Vec<[f64; D]> = tri
        .finite_vertices()
        .filter(|&(key, _)| key != vertex)
        .map(|(_, v)| point_to_f64(v.point()))
        .collect::<Result<_, _>>()?;
    Ok(AffineHull::from_points(coords.iter()))
}

fn retriangulation_error(message: impl Into<String>) -> RemovalError {
    RemovalError::Retriangulation {
        message: message.into(),
    }
}

/// Cells, in keys of `tri`, that fill the cavity left by `vertex`.
fn retriangulate_star<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    vertex: VertexKey,
    predicate: SpherePredicate,
) -> Result<Vec<CellVertexBuffer>, RemovalError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let infinite = tri.infinite_vertex();
    let mut link_facets: Vec<VertexKeyBuffer> = Vec::new();
    for cell_key in tri.incident_cells(vertex) {
        let cell = tri
            .cell(cell_key)
            .ok_or(TdsError::CellNotFound { key: cell_key })?;
        let slot = cell
            .index_of(vertex)
            .ok_or(RemovalError::VertexNotFound { key: vertex })?;
        link_facets.push(cell.facet_vertices(slot));
    }

    // Auxiliary triangulation of the finite link vertices.
    let strategy = match predicate {
        SpherePredicate::InSphere => InsertionStrategy::Delaunay,
        SpherePredicate::Power => InsertionStrategy::Regular,
    };
    let mut aux: Triangulation<K, U, V, D> =
        Triangulation::new(tri.kernel.clone()).with_locate_options(*tri.locate_options());
    let mut to_main: KeyBasedVertexMap<VertexKey> = KeyBasedVertexMap::default();
    let mut to_aux: KeyBasedVertexMap<VertexKey> = KeyBasedVertexMap::default();
    to_main.insert(aux.infinite_vertex(), infinite);
    to_aux.insert(infinite, aux.infinite_vertex());
    let mut link: Vec<(VertexKey, &Vertex<K::Scalar, U, D>)> = tri
        .tds
        .adjacent_vertices(vertex)
        .into_iter()
        .filter(|&w| w != infinite)
        .map(|w| {
            tri.vertex(w)
                .map(|v| (w, v))
                .ok_or(RemovalError::VertexNotFound { key: w })
        })
        .collect::<Result<_, _>>()?;
    // insertion order independent of arena order
    link.sort_by(|a, b| tri.kernel.compare_lexicographically(a.1.point(), b.1.point()));
    for (w, source) in link {
        let copy = Vertex::with_weight(*source.point(), source.weight(), None);
        match insert_vertex(&mut aux, copy, strategy)
            .map_err(|err| retriangulation_error(err.to_string()))?
        {
            InsertionOutcome::Inserted { vertex: a, hidden } if hidden.is_empty() => {
                to_main.insert(a, w);
                to_aux.insert(w, a);
            }
            _ => {
                return Err(retriangulation_error(
                    "a link vertex was merged or hidden in the auxiliary triangulation",
                ));
            }
        }
    }

    let translate = |keys: &[VertexKey], map: &KeyBasedVertexMap<VertexKey>| {
        keys.iter()
            .map(|k| map.get(k).copied())
            .collect::<Option<CellVertexBuffer>>()
            .ok_or_else(|| retriangulation_error("link vertex missing from the vertex map"))
    };

    let dimension = tri.dim();
    if aux.dim() == dimension - 1 {
        // cone from the infinite vertex over the flat link
        return aux
            .finite_cells()
            .map(|(_, cell)| {
                let mut cone = translate(cell.vertices(), &to_main)?;
                cone.insert(0, infinite);
                Ok(cone)
            })
            .collect();
    }
    if aux.dim() != dimension {
        return Err(retriangulation_error(format!(
            "link vertices span dimension {}, expected {} or {}",
            aux.dim(),
            dimension,
            dimension - 1
        )));
    }

    let link_in_aux: FastHashSet<VertexKeyBuffer> = link_facets
        .iter()
        .map(|facet| translate(facet, &to_aux).map(sorted_vertex_keys))
        .collect::<Result<_, _>>()?;

    let seed = seed_cell(tri, &aux, vertex, &link_facets, &to_aux, &to_main)?;

    let mut visited = CellKeySet::default();
    let mut queue = VecDeque::from([seed]);
    visited.insert(seed);
    let mut filled = Vec::new();
    while let Some(key) = queue.pop_front() {
        let cell = aux
            .cell(key)
            .ok_or(TdsError::CellNotFound { key })?;
        for i in 0..cell.number_of_vertices() {
            if link_in_aux.contains(&sorted_vertex_keys(cell.facet_vertices(i))) {
                continue;
            }
            if let Some(n) = cell.neighbor(i)
                && visited.insert(n)
            {
                queue.push_back(n);
            }
        }
        filled.push(translate(cell.vertices(), &to_main)?);
    }
    Ok(filled)
}

/// The auxiliary cell on the side of `vertex` of a finite link facet.
fn seed_cell<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    aux: &Triangulation<K, U, V, D>,
    vertex: VertexKey,
    link_facets: &[VertexKeyBuffer],
    to_aux: &KeyBasedVertexMap<VertexKey>,
    to_main: &KeyBasedVertexMap<VertexKey>,
) -> Result<CellKey, RemovalError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let infinite = tri.infinite_vertex();
    let facet = link_facets
        .iter()
        .find(|f| !f.contains(&infinite))
        .map(|f| sorted_vertex_keys(f.iter().copied()))
        .ok_or_else(|| retriangulation_error("the star has no finite link facet"))?;

    let side_of = |apex: VertexKey| -> Result<Orientation, RemovalError> {
        let points: Option<SimplexPoints<K::Scalar, D>> = facet
            .iter()
            .chain(std::iter::once(&apex))
            .map(|&w| tri.point(w).copied())
            .collect();
        let points = points.ok_or_else(|| retriangulation_error("link facet lost a point"))?;
        Ok(tri.orientation_of_points(&points)?)
    };
    let vertex_side = side_of(vertex)?;

    let aux_facet: VertexKeyBuffer = facet
        .iter()
        .map(|k| to_aux.get(k).copied())
        .collect::<Option<_>>()
        .ok_or_else(|| retriangulation_error("link vertex missing from the vertex map"))?;
    let candidates = aux.tds().cells_containing_face(&aux_facet);
    if candidates.len() != 2 {
        return Err(retriangulation_error(format!(
            "link facet bounds {} auxiliary cells",
            candidates.len()
        )));
    }

    let mut infinite_candidate = None;
    for &candidate in &candidates {
        let cell = aux
            .cell(candidate)
            .ok_or(TdsError::CellNotFound { key: candidate })?;
        let Some(apex) = cell.vertices().iter().find(|v| !aux_facet.contains(v)) else {
            continue;
        };
        if aux.is_infinite_vertex(*apex) {
            infinite_candidate = Some(candidate);
            continue;
        }
        let main_apex = to_main
            .get(apex)
            .copied()
            .ok_or_else(|| retriangulation_error("auxiliary vertex missing from the vertex map"))?;
        if side_of(main_apex)? == vertex_side {
            return Ok(candidate);
        }
    }
    infinite_candidate
        .ok_or_else(|| retriangulation_error("no auxiliary cell lies on the side of the vertex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::util::delaunay_validation::validate_delaunay;
    use crate::core::vertex::vertex;
    use crate::geometry::kernel::FastKernel;
    use crate::geometry::util::generate_random_points_seeded;

    type Tri<const D: usize> = Triangulation<FastKernel<f64>, (), (), D>;

    fn build<const D: usize>(points: &[[f64; D]]) -> (Tri<D>, Vec<VertexKey>) {
        let mut tri = Tri::<D>::default();
        let keys = points
            .iter()
            .map(|&p| {
                match insert_vertex(&mut tri, vertex!(p), InsertionStrategy::Delaunay).unwrap() {
                    InsertionOutcome::Inserted { vertex, .. } => vertex,
                    other => panic!("unexpected {other:?}"),
                }
            })
            .collect();
        (tri, keys)
    }

    /// Finite cells as sorted lists of coordinate bit patterns.
    fn signature<const D: usize>(tri: &Tri<D>) -> Vec<Vec<Vec<u64>>> {
        let mut cells: Vec<Vec<Vec<u64>>> = tri
            .finite_cells()
            .map(|(_, cell)| {
                let mut pts: Vec<Vec<u64>> = cell
                    .vertices()
                    .iter()
                    .map(|&v| tri.point(v).unwrap().coords().iter().map(|c| c.to_bits()).collect())
                    .collect();
                pts.sort();
                pts
            })
            .collect();
        cells.sort();
        cells
    }

    fn remove<const D: usize>(tri: &mut Tri<D>, key: VertexKey) -> Option<CellKey> {
        remove_vertex(tri, key, SpherePredicate::InSphere).unwrap()
    }

    #[test]
    fn test_remove_last_vertex() {
        let (mut tri, keys) = build(&[[1.0, 2.0]]);
        assert_eq!(remove(&mut tri, keys[0]), None);
        assert_eq!(tri.dim(), -1);
        assert_eq!(tri.number_of_cells(), 0);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_remove_interior_vertex() {
        let (mut tri, keys) = build(&[[0.0, 0.0], [4.0, 0.0], [0.0, 4.0], [1.0, 1.0]]);
        let hint = remove(&mut tri, keys[3]);
        assert!(hint.is_some());
        assert_eq!(tri.number_of_vertices(), 3);
        assert_eq!(tri.number_of_finite_cells(), 1);
        assert_eq!(tri.number_of_cells(), 4);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_remove_with_dimension_drop() {
        let (mut tri, keys) = build(&[[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]);
        remove(&mut tri, keys[2]);
        assert_eq!(tri.dim(), 1);
        assert_eq!(tri.number_of_finite_cells(), 1);
        assert!(tri.is_valid().is_ok());
        remove(&mut tri, keys[0]);
        assert_eq!(tri.dim(), 0);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_remove_hull_vertex_keeps_dimension() {
        let (mut tri, keys) = build(&[[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 3.0]]);
        remove(&mut tri, keys[4]);
        assert_eq!(tri.dim(), 2);
        assert_eq!(tri.number_of_vertices(), 4);
        assert_eq!(tri.number_of_finite_cells(), 2);
        assert!(tri.is_valid().is_ok());
        assert!(validate_delaunay(&tri).is_ok());
    }

    #[test]
    fn test_remove_in_one_dimension() {
        let (mut tri, keys) = build(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]);
        assert_eq!(tri.dim(), 1);
        remove(&mut tri, keys[1]);
        assert_eq!(tri.number_of_finite_cells(), 2);
        assert!(tri.is_valid().is_ok());
        remove(&mut tri, keys[3]);
        assert_eq!(tri.number_of_finite_cells(), 1);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_remove_matches_rebuild_3d() {
        let points: Vec<[f64; 3]> = generate_random_points_seeded::<f64, 3>(10, (-5.0, 5.0), 7)
            .unwrap()
            .iter()
            .map(|p| *p.coords())
            .collect();
        for victim in 0..points.len() {
            let (mut tri, keys) = build(&points);
            remove(&mut tri, keys[victim]);
            assert!(tri.is_valid().is_ok());
            let rest: Vec<[f64; 3]> = points
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != victim)
                .map(|(_, p)| *p)
                .collect();
            let (rebuilt, _) = build(&rest);
            assert_eq!(signature(&tri), signature(&rebuilt), "removing point {victim}");
        }
    }

    #[test]
    fn test_remove_rejects_bad_keys() {
        let (mut tri, keys) = build(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let inf = tri.infinite_vertex();
        assert_eq!(
            remove_vertex(&mut tri, inf, SpherePredicate::InSphere),
            Err(RemovalError::InfiniteVertex)
        );
        remove(&mut tri, keys[0]);
        assert_eq!(
            remove_vertex(&mut tri, keys[0], SpherePredicate::InSphere),
            Err(RemovalError::VertexNotFound { key: keys[0] })
        );
    }
}
