//! Benchmarks for speed field ingestion and interpolation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::LineString;
use speedfield_algorithms::field::{Directions, FieldParams, SpatialField};

const LAT: f64 = 45.0;

/// Square street grid of `size x size` blocks, ~150 m per block
fn street_grid(size: usize) -> Vec<LineString<f64>> {
    let block = 0.0019;
    let mut streets = Vec::with_capacity(2 * size * size);
    for i in 0..size {
        for j in 0..size {
            let (x, y) = (5.0 + j as f64 * block, LAT + i as f64 * block * 0.7);
            streets.push(LineString::from(vec![(x, y), (x + block, y)]));
            streets.push(LineString::from(vec![(x, y), (x, y + block * 0.7)]));
        }
    }
    streets
}

fn build_field(streets: &[LineString<f64>]) -> SpatialField {
    let mut field = SpatialField::new(FieldParams::centered_at(LAT, 50.0)).unwrap();
    for (i, s) in streets.iter().enumerate() {
        // sparse measurements on every third street
        if i % 3 == 0 {
            let speed = 5.0 + (i % 7) as f64 * 2.0;
            field.add_path(s, speed, Directions::from_code(Some((i % 3) as i64 - 1)));
        }
    }
    field
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("field/ingest");
    for size in [16, 32, 64] {
        let streets = street_grid(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| build_field(black_box(&streets)))
        });
    }
    group.finish();
}

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("field/estimate_many");
    for size in [16, 32, 64] {
        let streets = street_grid(size);
        let field = build_field(&streets);
        let queries: Vec<(&LineString<f64>, f64)> = streets.iter().map(|s| (s, 13.9)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| field.estimate_many(black_box(&queries)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ingest, bench_estimate);
criterion_main!(benches);
