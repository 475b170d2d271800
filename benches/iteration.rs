use cdm_array::{Array, DataType, Section};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_array(size: usize, seed: u64) -> Array {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..size * size).map(|_| rng.gen_range(-1.0..1.0)).collect();
    match Array::from_vec(&[size, size], data) {
        Ok(a) => a,
        Err(err) => panic!("from_vec failed: {err}"),
    }
}

fn sum_doubles(a: &Array, fast: bool) -> f64 {
    let mut it = if fast {
        a.index_iterator_fast()
    } else {
        a.index_iterator()
    };
    let mut acc = 0.0;
    while it.has_next() {
        acc += it.get_double_next().unwrap_or(0.0);
    }
    acc
}

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate_sum");
    for size in [64usize, 256, 512] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let a = random_array(size, 1);
        let t = match a.transpose(0, 1) {
            Ok(t) => t,
            Err(err) => panic!("transpose failed: {err}"),
        };

        group.bench_with_input(BenchmarkId::new("canonical", size), &size, |b, _| {
            b.iter(|| sum_doubles(black_box(&a), false))
        });
        group.bench_with_input(BenchmarkId::new("transposed_general", size), &size, |b, _| {
            b.iter(|| sum_doubles(black_box(&t), false))
        });
        group.bench_with_input(BenchmarkId::new("transposed_fast", size), &size, |b, _| {
            b.iter(|| sum_doubles(black_box(&t), true))
        });
    }
    group.finish();
}

fn bench_copy_permuted(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_permuted");
    for size in [64usize, 256, 512] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let a = random_array(size, 2);
        let p = match a.permute(&[1, 0]) {
            Ok(p) => p,
            Err(err) => panic!("permute failed: {err}"),
        };
        let half = Section::from_origin_shape_stride(&[0, 0], &[size / 2, size / 2], &[2, 2]);
        let strided = match half.and_then(|s| a.section(&s)) {
            Ok(s) => s,
            Err(err) => panic!("section failed: {err}"),
        };

        group.bench_with_input(BenchmarkId::new("canonical", size), &size, |b, _| {
            b.iter(|| black_box(&a).copy())
        });
        group.bench_with_input(BenchmarkId::new("permuted", size), &size, |b, _| {
            b.iter(|| black_box(&p).copy())
        });
        group.bench_with_input(BenchmarkId::new("strided_section", size), &size, |b, _| {
            b.iter(|| black_box(&strided).copy())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_iteration, bench_copy_permuted);
criterion_main!(benches);
