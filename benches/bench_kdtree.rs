use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use partscan_core::{Point3, PointCloud};
use partscan_spatial::KdTree;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_cloud(n: usize, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100.0)).collect();
    let y: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100.0)).collect();
    let z: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100.0)).collect();
    PointCloud::from_xyz(x, y, z)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_build");
    for size in [10_000, 100_000] {
        let cloud = random_cloud(size, 42);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| KdTree::build(&cloud))
        });
    }
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_nearest");
    for size in [10_000, 100_000] {
        let cloud = random_cloud(size, 42);
        let tree = KdTree::build(&cloud).expect("finite cloud");
        let query = Point3::new(50.0, 50.0, 50.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| tree.nearest(&query))
        });
    }
    group.finish();
}

fn bench_radius_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_radius_search");
    for size in [10_000, 100_000] {
        let cloud = random_cloud(size, 42);
        let tree = KdTree::build(&cloud).expect("finite cloud");
        let query = Point3::new(50.0, 50.0, 50.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| tree.radius_search(&query, 2.5))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_nearest, bench_radius_search);
criterion_main!(benches);
