//! Empty-sphere property validation.
//!
//! - [`validate_delaunay`]: no finite vertex lies strictly inside the
//!   circumsphere of a finite cell (global, `O(cells × vertices)`).
//! - [`validate_locally_delaunay`]: the same test restricted to the vertex
//!   across each interior facet.
//! - [`validate_regular`]: no finite vertex lies strictly inside the power
//!   sphere of a finite cell.
//!
//! Points on a sphere are allowed, so co-spherical inputs validate.

use crate::core::facet::FacetView;
use crate::core::traits::data_type::DataType;
use crate::core::triangulation::{SpherePredicate, Triangulation};
use crate::core::triangulation_data_structure::{CellKey, TriangulationValidationError};
use crate::geometry::kernel::Kernel;
use crate::geometry::predicates::InSphere;

/// Internal helper: the first finite vertex strictly inside the sphere of
/// `cell_key`, as a formatted message.
fn sphere_violation<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    cell_key: CellKey,
    predicate: SpherePredicate,
) -> Result<Option<String>, TriangulationValidationError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let Some(cell) = tri.cell(cell_key) else {
        return Ok(None);
    };
    for (vertex_key, _) in tri.finite_vertices() {
        if cell.contains_vertex(vertex_key) {
            continue;
        }
        let Some(query) = tri.weighted_point(vertex_key, predicate) else {
            continue;
        };
        if tri.side_of_cell_sphere(cell, &query, predicate)? == InSphere::INSIDE {
            return Ok(Some(format!(
                "vertex {:?} at {:?} lies inside the sphere of cell {}",
                vertex_key,
                query.point().coords(),
                cell.uuid()
            )));
        }
    }
    Ok(None)
}

/// Find cells that violate the empty-circumsphere property.
///
/// `cells_to_check` restricts the search; missing cells are skipped.
///
/// # Errors
///
/// Returns [`TriangulationValidationError::Predicate`] if a sphere test fails.
///
/// # Examples
///
/// ```
/// use simplicial::core::util::find_delaunay_violations;
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 3> = DelaunayTriangulation::new();
/// for p in [
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
///     [1.0, 1.0, 1.0],
/// ] {
///     dt.insert(vertex!(p)).unwrap();
/// }
/// assert!(find_delaunay_violations(&dt, None).unwrap().is_empty());
/// ```
pub fn find_delaunay_violations<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
    cells_to_check: Option<&[CellKey]>,
) -> Result<Vec<CellKey>, TriangulationValidationError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    let candidates: Vec<CellKey> = cells_to_check.map_or_else(
        || tri.finite_cells().map(|(key, _)| key).collect(),
        |keys| {
            keys.iter()
                .copied()
                .filter(|&k| tri.tds().contains_cell(k) && !tri.is_infinite_cell(k))
                .collect()
        },
    );
    let mut violations = Vec::new();
    for key in candidates {
        if sphere_violation(tri, key, SpherePredicate::InSphere)?.is_some() {
            violations.push(key);
        }
    }
    Ok(violations)
}

/// Checks the global empty-circumsphere property.
///
/// # Errors
///
/// Returns [`TriangulationValidationError::DelaunayViolation`] naming the
/// first offending vertex and cell.
pub fn validate_delaunay<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
) -> Result<(), TriangulationValidationError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    for (key, _) in tri.finite_cells() {
        if let Some(message) = sphere_violation(tri, key, SpherePredicate::InSphere)? {
            return Err(TriangulationValidationError::DelaunayViolation { message });
        }
    }
    Ok(())
}

/// Checks the empty-circumsphere property across every interior facet.
///
/// For a triangulation this is equivalent to the global property, at a
/// fraction of the cost.
///
/// # Errors
///
/// Returns [`TriangulationValidationError::DelaunayViolation`] for the first
/// facet that is not locally Delaunay.
pub fn validate_locally_delaunay<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
) -> Result<(), TriangulationValidationError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    for (key, cell) in tri.finite_cells() {
        for i in 0..cell.number_of_vertices() {
            let Ok(facet) = FacetView::new(tri.tds(), key, i) else {
                continue;
            };
            let Some((across, mirror)) = facet.mirror() else {
                continue;
            };
            if tri.is_infinite_cell(across) {
                continue;
            }
            let Some(opposite) = tri.cell(across).and_then(|c| c.vertex(mirror)) else {
                continue;
            };
            let Some(query) = tri.weighted_point(opposite, SpherePredicate::InSphere) else {
                continue;
            };
            if tri.side_of_cell_sphere(cell, &query, SpherePredicate::InSphere)?
                == InSphere::INSIDE
            {
                return Err(TriangulationValidationError::DelaunayViolation {
                    message: format!(
                        "facet {i} of cell {} is not locally Delaunay",
                        cell.uuid()
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Checks that no finite vertex conflicts with the power sphere of a finite cell.
///
/// # Errors
///
/// Returns [`TriangulationValidationError::RegularityViolation`] naming the
/// first offending vertex and cell.
pub fn validate_regular<K, U, V, const D: usize>(
    tri: &Triangulation<K, U, V, D>,
) -> Result<(), TriangulationValidationError>
where
    K: Kernel<D>,
    U: DataType,
    V: DataType,
{
    for (key, _) in tri.finite_cells() {
        if let Some(message) = sphere_violation(tri, key, SpherePredicate::Power)? {
            return Err(TriangulationValidationError::RegularityViolation { message });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithms::incremental_insertion::{InsertionStrategy, insert_vertex};
    use crate::core::vertex::{vertex, weighted_vertex};
    use crate::geometry::kernel::FastKernel;

    type Tri = Triangulation<FastKernel<f64>, (), (), 2>;

    fn star_triangulation() -> Tri {
        let mut tri = Tri::default();
        for p in [[0.0, 0.0], [4.0, 0.0], [2.0, 3.0], [2.0, -0.5]] {
            tri.insert(vertex!(p)).unwrap();
        }
        tri
    }

    #[test]
    fn test_star_triangulation_violates_empty_circle() {
        let tri = star_triangulation();
        assert!(matches!(
            validate_delaunay(&tri),
            Err(TriangulationValidationError::DelaunayViolation { .. })
        ));
        assert!(validate_locally_delaunay(&tri).is_err());
        assert_eq!(find_delaunay_violations(&tri, None).unwrap().len(), 2);
    }

    #[test]
    fn test_subset_skips_missing_and_infinite_cells() {
        let tri = star_triangulation();
        let infinite: Vec<CellKey> = tri
            .cells()
            .filter(|(k, _)| tri.is_infinite_cell(*k))
            .map(|(k, _)| k)
            .collect();
        assert!(find_delaunay_violations(&tri, Some(&infinite)).unwrap().is_empty());
    }

    #[test]
    fn test_cocircular_points_validate() {
        let mut tri = Tri::default();
        for p in [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]] {
            insert_vertex(&mut tri, vertex!(p), InsertionStrategy::Delaunay).unwrap();
        }
        assert!(validate_delaunay(&tri).is_ok());
        assert!(validate_locally_delaunay(&tri).is_ok());
    }

    #[test]
    fn test_regularity_uses_weights() {
        let mut tri = Tri::default();
        for (p, w) in [([0.0, 0.0], 0.0), ([4.0, 0.0], 0.0), ([2.0, 3.0], 0.0), ([2.0, -0.5], 0.0)] {
            insert_vertex(&mut tri, weighted_vertex!(p, w), InsertionStrategy::Regular).unwrap();
        }
        assert!(validate_regular(&tri).is_ok());
        // with zero weights regular and Delaunay coincide
        assert!(validate_delaunay(&tri).is_ok());
    }
}
