//! Benchmark for chunk generation throughput.
//!
//! Run with: cargo bench --package meridian_procedural --bench generation_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use meridian_procedural::{AssemblageRegistry, ChunkCoord, ChunkGenerator, WorldSeed};

fn generator() -> ChunkGenerator {
    let registry = Arc::new(AssemblageRegistry::builtin().expect("builtin registry"));
    ChunkGenerator::new(WorldSeed::new(42), registry)
}

fn benchmark_single_chunk(c: &mut Criterion) {
    let gen = generator();

    let mut group = c.benchmark_group("single_chunk");
    for env in ["station_interior", "surface_rocky", "cave_tunnels"] {
        group.bench_function(env, |b| {
            let mut coord = 0i32;
            b.iter(|| {
                coord = coord.wrapping_add(1);
                black_box(gen.generate_at(ChunkCoord::new(coord, coord / 2), env, 0))
            });
        });
    }
    group.finish();
}

fn benchmark_neighborhood(c: &mut Criterion) {
    let gen = generator();

    // A render radius of 3 around the observer: 7x7 chunks
    let mut group = c.benchmark_group("neighborhood");
    group.throughput(Throughput::Elements(49));
    group.bench_function("7x7_surface_rocky", |b| {
        b.iter(|| {
            for coord in ChunkCoord::new(0, 0).neighborhood(3) {
                black_box(gen.generate_at(coord, "surface_rocky", 0));
            }
        });
    });
    group.finish();
}

fn benchmark_state_encode(c: &mut Criterion) {
    let gen = generator();
    let state = gen.generate_at(ChunkCoord::new(4, 4), "station_interior", 0);

    c.bench_function("chunk_state_to_json", |b| {
        b.iter(|| black_box(state.to_json()));
    });
}

criterion_group!(
    benches,
    benchmark_single_chunk,
    benchmark_neighborhood,
    benchmark_state_encode
);
criterion_main!(benches);
