//! Metric and cycle-detection throughput
//!
//! Run with: cargo bench --bench cycle_detection

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ouroboros_analysis::config::AnalysisConfig;
use ouroboros_analysis::cycles::{find_peaks, gaussian_filter1d, CycleDetector, PeakOptions};
use ouroboros_analysis::metrics::{MetricCalculator, StrategyKind};
use ouroboros_analysis::synthetic::{ModelProfile, SyntheticGenerator, DEFAULT_SEED};

const SHORT_SESSION: usize = 20;
const LONG_SERIES: usize = 10_000;

fn responses(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            format!(
                "Turn {i}: building on sequential ideas, then questioning them. \
                 Recombining into novel structured forms that feel emergent and unified."
            )
        })
        .collect()
}

/// Per-turn metrics for each coherence strategy
fn bench_measure(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let data = responses(SHORT_SESSION);
    let mut group = c.benchmark_group("measure_session");

    for kind in StrategyKind::ALL {
        let calculator = MetricCalculator::new(&config, kind.build(&config.error_markers));
        group.bench_with_input(BenchmarkId::new(kind.as_str(), SHORT_SESSION), &data, |b, data| {
            b.iter(|| calculator.measure_all(black_box(data)));
        });
    }
    group.finish();
}

/// Cycle detection on a synthetic session
fn bench_detect(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let session = SyntheticGenerator::new(DEFAULT_SEED, &config).generate_session(
        &ModelProfile::gemini(),
        "0",
        SHORT_SESSION,
    );
    let detector = CycleDetector::new(&config);

    c.bench_function("detect_session", |b| {
        b.iter(|| detector.detect(black_box(session.metrics())));
    });
}

/// Peak search and smoothing on a long signal
fn bench_signal(c: &mut Criterion) {
    let signal: Vec<f64> = (0..LONG_SERIES)
        .map(|i| (i as f64 * 0.37).sin() + (i as f64 * 0.05).cos())
        .collect();
    let mut group = c.benchmark_group("signal");

    group.bench_with_input(BenchmarkId::new("find_peaks", LONG_SERIES), &signal, |b, s| {
        b.iter(|| find_peaks(black_box(s), &PeakOptions::default().with_distance(5)));
    });
    group.bench_with_input(BenchmarkId::new("gaussian_filter1d", LONG_SERIES), &signal, |b, s| {
        b.iter(|| gaussian_filter1d(black_box(s), 2.0));
    });
    group.finish();
}

criterion_group!(benches, bench_measure, bench_detect, bench_signal);
criterion_main!(benches);
