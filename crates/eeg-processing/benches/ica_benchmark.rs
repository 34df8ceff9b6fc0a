//! Decomposition and reconstruction benchmarks on simulated recordings

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eeg_core::SuppressionMode;
use eeg_processing::{compose, decompose, AutoCleaner, CleaningConfig, DecomposerConfig, SuppressionPolicy};
use eeg_simulation::{EEGSimulator, SimulationConfig};

fn simulated(duration: f64) -> eeg_core::Record {
    let config = SimulationConfig { seed: Some(1), ..SimulationConfig::default() };
    EEGSimulator::new(config)
        .and_then(|mut simulator| simulator.generate(duration))
        .map(|simulation| simulation.record)
        .expect("simulation")
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompose");
    group.sample_size(10);

    let config = DecomposerConfig { max_iterations: 1000, ..DecomposerConfig::default() };
    for duration in [4.0, 16.0, 64.0] {
        let record = simulated(duration);
        group.bench_with_input(
            BenchmarkId::new("six_leads", format!("{}s", duration)),
            &record,
            |b, record| b.iter(|| decompose(black_box(record), None, &config)),
        );
    }

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");

    let record = simulated(16.0);
    let components = decompose(&record, None, &DecomposerConfig::default()).expect("decomposition");

    group.bench_function("unmodified", |b| {
        b.iter(|| compose(black_box(&components), SuppressionPolicy::MatrixAndComponents))
    });

    let mut filtered = components.clone();
    filtered.set_suppression(0, SuppressionMode::HighPassFiltered).expect("component 0");
    group.bench_function("high_pass_filtered", |b| {
        b.iter(|| compose(black_box(&filtered), SuppressionPolicy::MatrixAndComponents))
    });

    group.finish();
}

fn bench_auto_clean(c: &mut Criterion) {
    let record = simulated(16.0);
    let cleaner = AutoCleaner::new(CleaningConfig::quick()).expect("valid preset");

    c.bench_function("auto_clean_quick_16s", |b| b.iter(|| cleaner.clean(black_box(&record))));
}

criterion_group!(benches, bench_decompose, bench_compose, bench_auto_clean);
criterion_main!(benches);
