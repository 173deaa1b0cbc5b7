// -------------------------------------------------------------------------
// Touschek Loss Core -- Density and Sweep Benchmark
// Density kernel at several grid sizes, then full analytic and Monte Carlo
// sweeps over the demo ring.
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use std::f64::consts::FRAC_PI_2;
use std::hint::black_box;
use touschek_core::density::{loss_density_sweep, loss_rate_density};
use touschek_core::histogram::loss_histograms;
use touschek_core::model::TabulatedModel;
use touschek_types::config::{BeamParams, DensityScaling, TouschekConfig};

fn demo_model() -> TabulatedModel {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/demo_ring.json");
    TabulatedModel::from_file(path).expect("demo ring loads")
}

fn bench_density_kernel(c: &mut Criterion) {
    let beta = BeamParams::default().beta();
    let kappa_min = (beta * 0.03).atan();

    let mut group = c.benchmark_group("loss_rate_density");
    for &points in &[200usize, 1000, 5000] {
        let kappa = Array1::linspace(kappa_min, FRAC_PI_2, points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &kappa, |b, kappa| {
            b.iter(|| {
                black_box(loss_rate_density(
                    kappa.view(),
                    kappa_min,
                    600.0,
                    500.0,
                    beta,
                    DensityScaling::PositionComparable,
                ))
            })
        });
    }
    group.finish();
}

fn bench_sweeps(c: &mut Criterion) {
    let model = demo_model();
    let mut config = TouschekConfig::default();
    config.monte_carlo.particles = 2_000;
    let requested: Vec<f64> = (0..8).map(|k| k as f64 * 1.75).collect();

    let mut group = c.benchmark_group("demo_ring");
    group.sample_size(10);
    group.bench_function("density_sweep_8", |b| {
        b.iter(|| black_box(loss_density_sweep(&model, &requested, &config)))
    });
    group.bench_function("histograms_8x2000", |b| {
        b.iter(|| black_box(loss_histograms(&model, &requested, &config)))
    });
    group.finish();
}

criterion_group!(benches, bench_density_kernel, bench_sweeps);
criterion_main!(benches);
