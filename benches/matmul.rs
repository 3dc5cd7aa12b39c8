//! Kernel comparison across matrix sizes.
//!
//! # Usage:
//! ```bash
//! # Every kernel at every size
//! cargo bench --bench matmul
//!
//! # One size group
//! cargo bench --bench matmul -- matmul_256
//!
//! # Divide-and-conquer threshold sweep
//! cargo bench --bench matmul -- dac_threshold
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;
use rand::prelude::*;

use matmul_kernels::dac::matmul_dac_with_threshold;
use matmul_kernels::kernels;
use matmul_kernels::utils::{fill_random, AlignedVec};

fn random_square(n: usize, rng: &mut StdRng) -> AlignedVec {
    let mut m = AlignedVec::square(n).expect("allocation failed");
    fill_random(&mut m, rng);
    m
}

/// One group per size; every kernel that accepts the size, plus ndarray.
fn bench_kernels_by_size(c: &mut Criterion) {
    for n in [64usize, 128, 256, 512] {
        let mut group = c.benchmark_group(format!("matmul_{}", n));
        group.sample_size(10);
        group.throughput(Throughput::Elements((2 * n * n * n) as u64));

        let mut rng = StdRng::seed_from_u64(42);
        let p = random_square(n, &mut rng);
        let q = random_square(n, &mut rng);
        let mut r = AlignedVec::square(n).expect("allocation failed");

        for kernel in kernels::all().iter().filter(|k| k.check(n).is_ok()) {
            group.bench_function(BenchmarkId::new(kernel.name, n), |bench| {
                bench.iter(|| {
                    kernel.run(black_box(&p[..]), black_box(&q[..]), black_box(&mut r[..]), n);
                    black_box(&r);
                });
            });
        }

        let a = Array2::from_shape_vec((n, n), p.to_vec()).expect("shape");
        let b = Array2::from_shape_vec((n, n), q.to_vec()).expect("shape");
        group.bench_function(BenchmarkId::new("ndarray", n), |bench| {
            bench.iter(|| black_box(black_box(&a).dot(black_box(&b))));
        });

        group.finish();
    }
}

fn bench_dac_threshold(c: &mut Criterion) {
    let n = 512;
    let mut group = c.benchmark_group("dac_threshold");
    group.sample_size(10);

    let mut rng = StdRng::seed_from_u64(7);
    let p = random_square(n, &mut rng);
    let q = random_square(n, &mut rng);
    let mut r = AlignedVec::square(n).expect("allocation failed");

    for threshold in [16usize, 32, 64, 128, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(threshold), &threshold, |bench, &t| {
            bench.iter(|| {
                matmul_dac_with_threshold(black_box(&p[..]), black_box(&q[..]), black_box(&mut r[..]), n, t);
                black_box(&r);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kernels_by_size, bench_dac_threshold);
criterion_main!(benches);
