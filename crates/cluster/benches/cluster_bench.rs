use cluster::{
    cluster_embeddings, ClusterConfig, ClusteringStrategy, HdbscanParams, LinearReduction,
    NeighborhoodReduction, ReductionStrategy,
};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

/// Embedding-like batch: `size` vectors scattered around eight centres.
fn batch(size: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut rng = fastrand::Rng::with_seed(42);
    (0..size)
        .map(|i| {
            let centre = (i % 8) as f32;
            (0..dim)
                .map(|j| {
                    let base = if j % 8 == i % 8 { centre } else { 0.0 };
                    base + rng.f32() * 0.1
                })
                .collect()
        })
        .collect()
}

fn bench_fixed_radius(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixed_radius");
    let dim = 384; // all-MiniLM-L6-v2 dimension

    for size in [50, 200, 500].iter() {
        let data = batch(*size, dim);
        let config = ClusterConfig::default();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("dbscan_{}", size), |b| {
            b.iter(|| cluster_embeddings(black_box(&data), &config));
        });
    }

    group.finish();
}

fn bench_variable_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("variable_density");
    let dim = 384;

    for size in [50, 200, 500].iter() {
        let data = batch(*size, dim);
        let config = ClusterConfig::default()
            .with_clustering(ClusteringStrategy::VariableDensity(HdbscanParams::default()));
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("hdbscan_{}", size), |b| {
            b.iter(|| cluster_embeddings(black_box(&data), &config));
        });
    }

    group.finish();
}

fn bench_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduction");
    group.sample_size(10);
    let data = batch(200, 384);

    let linear = ClusterConfig::default()
        .with_reduction(ReductionStrategy::Linear(LinearReduction::default()));
    group.bench_function("pca_200", |b| {
        b.iter(|| cluster_embeddings(black_box(&data), &linear));
    });

    let neighborhood = ClusterConfig::default()
        .with_reduction(ReductionStrategy::Neighborhood(NeighborhoodReduction::default()));
    group.bench_function("umap_200", |b| {
        b.iter(|| cluster_embeddings(black_box(&data), &neighborhood));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_fixed_radius,
    bench_variable_density,
    bench_reduction
);
criterion_main!(benches);
