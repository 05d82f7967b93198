//! Property-Based Tests
//!
//! Local numeric contracts of the metric and cycle code:
//! - Run with ProptestConfig::with_cases(100)
//! - Coherence stays in [0, 1] for every strategy
//! - Monotonic input has no extrema
//! - Synthetic generation is deterministic per seed

use ouroboros_analysis::config::AnalysisConfig;
use ouroboros_analysis::cycles::{find_peaks, find_troughs, gaussian_filter1d, PeakOptions};
use ouroboros_analysis::metrics::StrategyKind;
use ouroboros_analysis::phase::PhaseClassifier;
use ouroboros_analysis::synthetic::{ModelProfile, SyntheticGenerator};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Coherence Properties
    // ========================================================================

    /// Property: every strategy scores a non-error response in [0, 1]
    #[test]
    fn prop_coherence_in_unit_interval(
        text in "[a-zA-Z .,]{1,200}",
        history in prop::collection::vec("[a-z .]{0,80}", 0..8),
    ) {
        let config = AnalysisConfig::default();
        prop_assume!(!config.is_error_response(&text));
        for kind in StrategyKind::ALL {
            let score = kind.build(&config.error_markers).score(&text, &history);
            prop_assert!((0.0..=1.0).contains(&score), "{} scored {}", kind, score);
        }
    }

    /// Property: error-marked responses always score 0
    #[test]
    fn prop_error_responses_score_zero(prefix in "[a-z ]{0,40}", suffix in "[a-z ]{0,40}") {
        let config = AnalysisConfig::default();
        let text = format!("{prefix} Error 429 {suffix}");
        for kind in StrategyKind::ALL {
            let score = kind.build(&config.error_markers).score(&text, &[]);
            prop_assert!(score.abs() < f64::EPSILON);
        }
    }

    /// Property: phase scores are fractions of the keyword list
    #[test]
    fn prop_phase_scores_bounded(text in "[a-z ]{0,300}") {
        let config = AnalysisConfig::default();
        let scores = PhaseClassifier::new(&config.phases).classify(&text);
        for (_, score) in scores.iter() {
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }

    // ========================================================================
    // Peak Detection Properties
    // ========================================================================

    /// Property: strictly increasing sequences have no peaks or troughs
    #[test]
    fn prop_monotonic_has_no_extrema(
        start in -10.0f64..10.0,
        steps in prop::collection::vec(0.001f64..1.0, 4..40),
    ) {
        let mut values = vec![start];
        for step in steps {
            let last = values[values.len() - 1];
            values.push(last + step);
        }
        let options = PeakOptions::default().with_distance(2);
        prop_assert!(find_peaks(&values, &options).is_empty());
        prop_assert!(find_troughs(&values, &options).is_empty());

        values.reverse();
        prop_assert!(find_peaks(&values, &options).is_empty());
        prop_assert!(find_troughs(&values, &options).is_empty());
    }

    /// Property: kept peaks respect the distance and are local maxima
    #[test]
    fn prop_peaks_respect_distance(
        values in prop::collection::vec(0.0f64..1.0, 3..60),
        distance in 1usize..6,
    ) {
        let peaks = find_peaks(&values, &PeakOptions::default().with_distance(distance));
        for pair in peaks.windows(2) {
            prop_assert!(pair[1] - pair[0] >= distance);
        }
        for &p in &peaks {
            prop_assert!(p > 0 && p < values.len() - 1);
            prop_assert!(values[p] > values[p - 1]);
        }
    }

    /// Property: Gaussian smoothing preserves length and stays within range
    #[test]
    fn prop_smoothing_bounded(
        values in prop::collection::vec(0.0f64..1.0, 1..50),
        sigma in 0.5f64..3.0,
    ) {
        let smoothed = gaussian_filter1d(&values, sigma);
        prop_assert_eq!(smoothed.len(), values.len());
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for v in smoothed {
            prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
        }
    }

    // ========================================================================
    // Synthetic Data Properties
    // ========================================================================

    /// Property: the same seed reproduces bit-identical coherence
    #[test]
    fn prop_synthetic_deterministic(seed in any::<u64>(), length in 1usize..30) {
        let config = AnalysisConfig::default();
        let profile = ModelProfile::claude();
        let a = SyntheticGenerator::new(seed, &config).generate_session(&profile, "0", length);
        let b = SyntheticGenerator::new(seed, &config).generate_session(&profile, "0", length);

        let bits = |values: Vec<f64>| values.into_iter().map(f64::to_bits).collect::<Vec<_>>();
        prop_assert_eq!(bits(a.coherence_series()), bits(b.coherence_series()));
        prop_assert!(a.coherence_series().iter().all(|c| (0.0..=1.0).contains(c)));
    }
}
