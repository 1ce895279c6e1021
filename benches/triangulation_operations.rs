//! Benchmarks for the core triangulation operations.
//!
//! 1. Incremental Delaunay construction (2D-5D)
//! 2. Point location with and without a good hint
//! 3. Vertex removal
//! 4. Regular triangulation construction with random weights
//!
//! Point sets are generated from fixed seeds so runs are comparable.
//! Set `SIMPLICIAL_BENCH_LOG=1` to print a summary of each input triangulation.

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use simplicial::core::algorithms::locate::locate_exhaustively;
use simplicial::prelude::*;
use std::hint::black_box;
use tracing::info;

const COUNTS: &[usize] = &[25, 100, 400];

fn bench_logging_enabled() -> bool {
    std::env::var("SIMPLICIAL_BENCH_LOG")
        .map(|value| value != "0")
        .unwrap_or(false)
}

fn random_vertices<const D: usize>(count: usize, seed: u64) -> Vec<Vertex<f64, (), D>> {
    generate_random_points_seeded::<f64, D>(count, (-100.0, 100.0), seed)
        .expect("bounds are valid")
        .iter()
        .map(|p| vertex!(p.to_array()))
        .collect()
}

macro_rules! benchmark_construction_dimension {
    ($dim:literal, $func_name:ident, $seed:literal, $samples:literal) => {
        /// Benchmark incremental construction for D-dimensional triangulations
        fn $func_name(c: &mut Criterion) {
            let mut group = c.benchmark_group(concat!("construction_", stringify!($dim), "d"));
            group.sample_size($samples);
            for &count in COUNTS {
                let vertices = random_vertices::<$dim>(count, $seed + count as u64);
                group.throughput(Throughput::Elements(count as u64));
                group.bench_with_input(BenchmarkId::new("insert", count), &vertices, |b, vertices| {
                    b.iter(|| {
                        let dt = DelaunayTriangulation::<FastKernel<f64>, (), (), $dim>::from_vertices(
                            black_box(vertices),
                        )
                        .expect("construction failed");
                        black_box(dt.number_of_cells())
                    });
                });
            }
            group.finish();
        }
    };
}

benchmark_construction_dimension!(2, bench_construction_2d, 101, 50);
benchmark_construction_dimension!(3, bench_construction_3d, 202, 20);
benchmark_construction_dimension!(4, bench_construction_4d, 303, 10);
benchmark_construction_dimension!(5, bench_construction_5d, 404, 10);

fn bench_locate(c: &mut Criterion) {
    let dt = DelaunayTriangulation::<FastKernel<f64>, (), (), 3>::from_vertices(
        &random_vertices::<3>(1000, 7),
    )
    .expect("construction failed");
    if bench_logging_enabled() {
        info!(
            vertices = dt.number_of_vertices(),
            cells = dt.number_of_cells(),
            "locate benchmark input"
        );
    }
    let queries = generate_random_points_seeded::<f64, 3>(256, (-90.0, 90.0), 8)
        .expect("bounds are valid");

    let mut group = c.benchmark_group("locate_3d");
    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("walk_from_last_cell", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(dt.locate(black_box(q)).expect("locate failed"));
            }
        });
    });
    group.bench_function("walk_without_hint", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(dt.locate_with_hint(black_box(q), None).expect("locate failed"));
            }
        });
    });
    group.sample_size(10);
    group.bench_function("exhaustive_scan", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(locate_exhaustively(dt.triangulation(), black_box(q)).expect("locate failed"));
            }
        });
    });
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_3d");
    group.sample_size(20);
    for &count in COUNTS {
        let dt = DelaunayTriangulation::<FastKernel<f64>, (), (), 3>::from_vertices(
            &random_vertices::<3>(count, 900 + count as u64),
        )
        .expect("construction failed");
        let victims: Vec<VertexKey> = dt.finite_vertices().map(|(k, _)| k).take(10).collect();
        group.bench_with_input(BenchmarkId::new("remove_10", count), &dt, |b, dt| {
            b.iter_batched(
                || dt.clone(),
                |mut dt| {
                    for &v in &victims {
                        dt.remove(v).expect("removal failed");
                    }
                    black_box(dt.number_of_vertices())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_regular(c: &mut Criterion) {
    let mut group = c.benchmark_group("regular_construction_3d");
    group.sample_size(20);
    for &count in COUNTS {
        let points = generate_random_points_seeded::<f64, 3>(count, (-100.0, 100.0), 77)
            .expect("bounds are valid");
        let weights = generate_random_points_seeded::<f64, 1>(count, (0.0, 50.0), 78)
            .expect("bounds are valid");
        let vertices: Vec<Vertex<f64, (), 3>> = points
            .iter()
            .zip(&weights)
            .map(|(p, w)| weighted_vertex!(p.to_array(), w.coords()[0]))
            .collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("insert", count), &vertices, |b, vertices| {
            b.iter(|| {
                let rt = RegularTriangulation::<FastKernel<f64>, (), (), 3>::from_vertices(
                    black_box(vertices),
                )
                .expect("construction failed");
                black_box(rt.number_of_vertices())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_construction_2d,
    bench_construction_3d,
    bench_construction_4d,
    bench_construction_5d,
    bench_locate,
    bench_remove,
    bench_regular,
);
criterion_main!(benches);
