use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dng_pipeline_rs::image_pipeline::{
    demosaic_only, AccelerationStrategy, CfaPattern, InterpolationMethod, RawImageData, RunTimer,
};

fn generate_mosaic(width: usize, height: usize) -> RawImageData {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 131 + y * 71) % 4096) as u16 * 16;
            data.push(value);
        }
    }
    RawImageData::new(width, height, data, 16)
}

fn benchmark_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("demosaic_methods");
    let raw = generate_mosaic(512, 512);
    let pattern = CfaPattern::rggb();

    for method in InterpolationMethod::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(method.id()), &raw, |b, raw| {
            b.iter(|| {
                let mut timer = RunTimer::new();
                let _ = demosaic_only(black_box(raw), &pattern, method, AccelerationStrategy::Multithreading, &mut timer);
            });
        });
    }

    group.finish();
}

fn benchmark_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("rcd_strategies");
    let raw = generate_mosaic(1024, 1024);
    let pattern = CfaPattern::rggb();

    for strategy in AccelerationStrategy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(strategy.id()), &raw, |b, raw| {
            b.iter(|| {
                let mut timer = RunTimer::new();
                let _ = demosaic_only(black_box(raw), &pattern, InterpolationMethod::Rcd, strategy, &mut timer);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_methods, benchmark_strategies);
criterion_main!(benches);
