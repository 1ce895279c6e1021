//! Integration tests for point location, conflict regions, and flips on
//! triangulations built through the public API.

use simplicial::core::algorithms::locate::{find_conflict_region, locate_exhaustively};
use simplicial::core::util::{find_delaunay_violations, validate_delaunay};
use simplicial::prelude::*;

type Tri<const D: usize> = Triangulation<FastKernel<f64>, (), (), D>;

fn star_triangulation<const D: usize>(n: usize, seed: u64) -> Tri<D> {
    let mut tri = Tri::<D>::default();
    for p in generate_random_points_seeded::<f64, D>(n, (-10.0, 10.0), seed).unwrap() {
        tri.insert(vertex!(p.to_array())).unwrap();
    }
    tri
}

/// Cells as sorted vertex-key lists, for comparing combinatorics.
fn cell_signature<const D: usize>(tri: &Tri<D>) -> Vec<Vec<VertexKey>> {
    let mut cells: Vec<Vec<VertexKey>> = tri
        .cells()
        .map(|(_, c)| {
            let mut v = c.vertices().to_vec();
            v.sort_unstable();
            v
        })
        .collect();
    cells.sort();
    cells
}

// =============================================================================
// LOCATION
// =============================================================================

#[test]
fn test_locate_every_vertex() {
    let tri = star_triangulation::<3>(30, 1);
    for (key, vertex) in tri.finite_vertices() {
        match tri.locate(vertex.point()).unwrap() {
            LocateResult::OnVertex { vertex, .. } => assert_eq!(vertex, key),
            other => panic!("vertex located as {other:?}"),
        }
    }
}

#[test]
fn test_locate_with_any_hint() {
    let tri = star_triangulation::<2>(40, 2);
    let queries = generate_random_points_seeded::<f64, 2>(20, (-12.0, 12.0), 3).unwrap();
    for query in &queries {
        let expected = std::mem::discriminant(&locate_exhaustively(&tri, query).unwrap());
        for (hint, _) in tri.cells() {
            let found = tri.locate_with_hint(query, Some(hint)).unwrap();
            assert_eq!(std::mem::discriminant(&found), expected);
        }
    }
}

#[test]
fn test_locate_options_round_trip_through_json() {
    let options = LocateOptions {
        seed: 42,
        step_limit_factor: 8,
    };
    let json = serde_json::to_string(&options).unwrap();
    let parsed: LocateOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, options);

    let tri = star_triangulation::<2>(25, 4).with_locate_options(parsed);
    assert_eq!(tri.locate_options(), &options);
    let query = Point::new([0.25, -0.5]);
    assert_eq!(
        std::mem::discriminant(&tri.locate(&query).unwrap()),
        std::mem::discriminant(&locate_exhaustively(&tri, &query).unwrap())
    );
}

#[test]
fn test_conflict_region_is_connected_and_nonempty() {
    let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 3> = DelaunayTriangulation::new();
    for p in generate_random_points_seeded::<f64, 3>(30, (-5.0, 5.0), 6).unwrap() {
        dt.insert(vertex!(p.to_array())).unwrap();
    }
    let query = Point::new([0.1, 0.2, 0.3]);
    let LocateResult::InsideCell(cell) = dt.locate(&query).unwrap() else {
        panic!("query should be interior");
    };
    let region = find_conflict_region(
        &dt,
        &WeightedPoint::unweighted(query),
        SpherePredicate::InSphere,
        &[cell],
    )
    .unwrap();
    assert!(region.contains(&cell));

    // every cell other than the seed touches another cell of the region
    for &c in &region {
        if c == cell {
            continue;
        }
        assert!(
            (0..4).any(|i| dt.neighbor(c, i).is_some_and(|n| region.contains(&n))),
            "conflict region is not connected"
        );
    }
}

// =============================================================================
// FLIPS
// =============================================================================

#[test]
fn test_flip_and_flip_back() {
    let mut tri = Tri::<2>::default();
    for p in [[0.0, 0.0], [3.0, 0.0], [0.0, 2.0], [3.5, 2.5]] {
        tri.insert(vertex!(p)).unwrap();
    }
    let before = cell_signature(&tri);

    let interior = |tri: &Tri<2>| {
        tri.finite_cells().find_map(|(key, c)| {
            (0..3)
                .find(|&i| c.neighbor(i).is_some_and(|n| !tri.is_infinite_cell(n)))
                .map(|i| (key, i))
        })
    };

    let (cell, slot) = interior(&tri).unwrap();
    tri.flip(cell, slot).unwrap();
    assert!(tri.is_valid().is_ok());
    assert_ne!(cell_signature(&tri), before);

    let (cell, slot) = interior(&tri).unwrap();
    tri.flip(cell, slot).unwrap();
    assert!(tri.is_valid().is_ok());
    assert_eq!(cell_signature(&tri), before);
}

#[test]
fn test_hull_facets_cannot_be_flipped() {
    let mut tri = star_triangulation::<2>(10, 7);
    let (cell, slot) = tri
        .finite_cells()
        .find_map(|(key, c)| {
            (0..3)
                .find(|&i| c.neighbor(i).is_some_and(|n| tri.is_infinite_cell(n)))
                .map(|i| (key, i))
        })
        .unwrap();
    let before = cell_signature(&tri);
    assert!(matches!(
        tri.flip(cell, slot),
        Err(FlipError::InfiniteCell { .. })
    ));
    assert_eq!(cell_signature(&tri), before);
}

#[test]
fn test_lawson_flips_repair_star_triangulation_2d() {
    let mut tri = star_triangulation::<2>(60, 8);
    assert!(!find_delaunay_violations(&tri, None).unwrap().is_empty());

    let stats = tri.make_delaunay_by_flips().unwrap();
    assert!(stats.flips_performed > 0);
    assert_eq!(stats.non_flippable, 0);
    assert!(tri.is_valid().is_ok());
    assert!(validate_delaunay(&tri).is_ok());
}

#[test]
fn test_lawson_flips_keep_3d_valid() {
    let mut tri = star_triangulation::<3>(30, 9);
    let stats = tri.make_delaunay_by_flips().unwrap();
    assert!(tri.is_valid().is_ok());
    // facets that remain non-locally-Delaunay must be reported
    if validate_delaunay(&tri).is_err() {
        assert!(stats.non_flippable > 0);
    }
}
