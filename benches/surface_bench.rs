//! Benchmarks for surface graph construction and solving
//!
//! Measures:
//! - Graph construction throughput on random cost volumes
//! - Full build + solve latency at several volume sizes
//! - Tiled vs single-tile solving

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mincost_surface::{solve_tiled, SurfaceGraphBuilder, SurfaceSpec, TilingConfig};
use ndarray::Array3;
use rand::prelude::*;

/// Random cost volume with values in [0, 1)
fn random_volume(dims: (usize, usize, usize), seed: u64) -> Array3<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn(dims, |_| rng.gen_range(0.0..1.0))
}

fn bench_graph_construction(c: &mut Criterion) {
    let volume = random_volume((24, 24, 12), 7);
    c.bench_function("build_graph_24x24x12", |b| {
        b.iter(|| {
            let mut builder = SurfaceGraphBuilder::for_surfaces();
            builder
                .add_surface(black_box(volume.view()), 2, 1.0)
                .unwrap();
            black_box(builder.stats())
        })
    });
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_solve");
    for size in [8usize, 16, 24] {
        let volume = random_volume((size, size, 8), 11);
        group.bench_with_input(BenchmarkId::from_parameter(size), &volume, |b, volume| {
            b.iter(|| {
                let mut builder = SurfaceGraphBuilder::for_surfaces();
                builder.add_surface(volume.view(), 2, 1.0).unwrap();
                black_box(builder.solve().unwrap().max_flow())
            })
        });
    }
    group.finish();
}

fn bench_tiled(c: &mut Criterion) {
    let volume = random_volume((16, 32, 8), 13);
    let mut group = c.benchmark_group("tiled_solve_16x32x8");
    for tiles in [1usize, 4] {
        let config = TilingConfig {
            tile_count: tiles,
            surfaces: vec![SurfaceSpec {
                max_delta: 2,
                weight_factor: 1.0,
            }],
            separations: Vec::new(),
        };
        group.bench_with_input(BenchmarkId::from_parameter(tiles), &config, |b, config| {
            b.iter(|| black_box(solve_tiled(volume.view().into_dyn(), config).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_graph_construction, bench_solve, bench_tiled);
criterion_main!(benches);
