// -------------------------------------------------------------------------
// Touschek Loss Core -- Bessel and Quadrature Benchmark
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use std::hint::black_box;
use touschek_math::bessel::i0e;
use touschek_math::interp::geomspace;
use touschek_math::quadrature::{cumulative_trapezoid, trapezoid};

fn bench_i0e_sweep(c: &mut Criterion) {
    // Arguments spanning both polynomial branches, as seen by the density model.
    let xs = geomspace(1e-3, 1e7, 1000).unwrap();

    c.bench_function("i0e_1000_points", |b| {
        b.iter(|| black_box(xs.mapv(i0e).sum()))
    });
}

fn bench_trapezoid(c: &mut Criterion) {
    let x = Array1::linspace(0.0, 1.0, 3000);
    let y = x.mapv(|v: f64| (4.0 / v.cos() + 1.0) * v.sin());

    let mut group = c.benchmark_group("trapezoid_3000");
    group.bench_function("total", |b| {
        b.iter(|| black_box(trapezoid(y.view(), x.view())))
    });
    group.bench_function("cumulative", |b| {
        b.iter(|| black_box(cumulative_trapezoid(y.view(), x.view())))
    });
    group.finish();
}

criterion_group!(benches, bench_i0e_sweep, bench_trapezoid);
criterion_main!(benches);
