//! Benchmarks for watershed kernels and segment networks

use burnflow_algorithms::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Create a DEM with a basin shape: higher edges sloping toward the center
fn create_basin_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    let center = size as f64 / 2.0;
    for row in 0..size {
        for col in 0..size {
            let dx = col as f64 - center;
            let dy = row as f64 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            // Bowl shape plus small noise to avoid flats
            let noise = ((row * 7 + col * 13) % 17) as f64 * 0.01;
            dem.set(row, col, dist + noise).unwrap();
        }
    }
    dem
}

/// Flow directions and a stream mask of pixels draining at least `threshold` pixels
fn stream_inputs(size: usize, threshold: f64) -> (Raster<u8>, Raster<bool>) {
    let dem = condition(&create_basin_dem(size), ConditionParams::default()).unwrap();
    let flow = flow_direction(&dem).unwrap();
    let acc = flow_accumulation(&flow, None, None).unwrap();
    let mask = acc.map(None, |a| a >= threshold);
    (flow, mask)
}

fn bench_condition(c: &mut Criterion) {
    let mut group = c.benchmark_group("watershed/condition");
    for size in [128, 256, 512] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| condition(black_box(&dem), ConditionParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_flow_direction(c: &mut Criterion) {
    let mut group = c.benchmark_group("watershed/flow_direction");
    for size in [256, 512, 1024] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| flow_direction(black_box(&dem)).unwrap())
        });
    }
    group.finish();
}

fn bench_flow_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("watershed/flow_accumulation");
    for size in [256, 512, 1024] {
        let dem = create_basin_dem(size);
        let flow = flow_direction(&dem).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| flow_accumulation(black_box(&flow), None, None).unwrap())
        });
    }
    group.finish();
}

fn bench_segments(c: &mut Criterion) {
    let mut group = c.benchmark_group("segments/new");
    for size in [128, 256, 512] {
        let (flow, mask) = stream_inputs(size, 50.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| Segments::new(black_box(&flow), black_box(&mask), None).unwrap())
        });
    }
    group.finish();
}

fn bench_basins(c: &mut Criterion) {
    let mut group = c.benchmark_group("segments/locate_basins");
    for size in [128, 256] {
        let (flow, mask) = stream_inputs(size, 50.0);
        let segments = Segments::new(&flow, &mask, None).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut s = segments.clone();
                s.locate_basins(true).unwrap().len()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_condition,
    bench_flow_direction,
    bench_flow_accumulation,
    bench_segments,
    bench_basins,
);
criterion_main!(benches);
