//! Cycle detector over a session's coherence series

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::peaks::{find_peaks, find_troughs, PeakOptions};
use super::smoothing::gaussian_filter1d;
use super::transitions::detect_phase_transitions;
use crate::config::{AnalysisConfig, Thresholds};
use crate::metrics::text::word_set;
use crate::phase::{Phase, PhaseScores};
use crate::session::{CycleSummary, MetricRecord, Session, SessionStatistics, Trajectory};
use crate::stats;
use crate::Outcome;

/// Autocorrelation lags stored in a [`CycleSummary`].
const AUTOCORRELATION_LAGS: usize = 10;

/// Result of the smoothed detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedCycles {
    /// Gaussian-smoothed coherence
    pub smoothed: Vec<f64>,
    /// Peak indices on the smoothed series
    pub peak_positions: Vec<usize>,
    /// Trough indices on the smoothed series
    pub trough_positions: Vec<usize>,
    /// At least one peak or trough survived the filters
    pub cycle_detected: bool,
    /// Mean inter-peak distance (0 with fewer than two peaks)
    pub mean_cycle_length: f64,
    /// Standard deviation of inter-peak distances (0 with fewer than two peaks)
    pub cycle_regularity: f64,
}

/// Finds peaks, troughs and phase transitions in per-turn metrics.
#[derive(Debug, Clone)]
pub struct CycleDetector {
    thresholds: Thresholds,
}

impl CycleDetector {
    /// Create a detector using `config.thresholds`.
    #[must_use]
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
        }
    }

    /// Summarize the raw coherence series of `metrics`.
    ///
    /// Missing coherence values count as 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn detect(&self, metrics: &[MetricRecord]) -> Outcome<CycleSummary> {
        let n = metrics.len();
        Outcome::require(self.thresholds.min_valid_turns, n, || {
            let series = coherence_or_zero(metrics);
            let options = PeakOptions::default().with_distance(self.thresholds.peak_distance);
            let peaks = find_peaks(&series, &options);
            let troughs = find_troughs(&series, &options);
            let phase_transitions = detect_phase_transitions(metrics);

            let distances: Vec<f64> = stats::diff(&peaks).into_iter().map(|d| d as f64).collect();
            let (mean_cycle_length, cycle_regularity) = if distances.is_empty() {
                (None, 0.0)
            } else {
                (Some(stats::mean(&distances)), stats::std_dev(&distances))
            };

            let (autocorrelation, dominant_period) = if n > AUTOCORRELATION_LAGS {
                let ac = stats::autocorrelation(&series, AUTOCORRELATION_LAGS + 1);
                if ac.is_empty() {
                    (None, None)
                } else {
                    let period = find_peaks(&ac[1..], &PeakOptions::default())
                        .first()
                        .map(|p| p + 1);
                    (Some(ac[..AUTOCORRELATION_LAGS].to_vec()), period)
                }
            } else {
                (None, None)
            };

            let summary = CycleSummary {
                num_peaks: peaks.len(),
                num_troughs: troughs.len(),
                transition_rate: phase_transitions.len() as f64 / n as f64,
                peak_positions: peaks,
                trough_positions: troughs,
                phase_transitions,
                coherence_mean: stats::mean(&series),
                coherence_std: stats::std_dev(&series),
                coherence_range: stats::range(&series),
                cycle_regularity,
                mean_cycle_length,
                autocorrelation,
                dominant_period,
            };
            debug!(
                turns = n,
                peaks = summary.num_peaks,
                troughs = summary.num_troughs,
                transitions = summary.phase_transitions.len(),
                "detected cycles"
            );
            summary
        })
    }

    /// Peak/trough detection after Gaussian smoothing, with adaptive
    /// spacing (`max(2, n/10)`) and height bands at half a standard
    /// deviation around the mean.
    #[must_use]
    pub fn detect_smoothed(&self, series: &[f64]) -> Outcome<SmoothedCycles> {
        let n = series.len();
        Outcome::require(self.thresholds.min_smoothed_turns, n, || {
            let smoothed = gaussian_filter1d(series, self.thresholds.smoothing_sigma);
            let distance = (n / 10).max(2);
            let mean = stats::mean(&smoothed);
            let std = stats::std_dev(&smoothed);

            let peak_positions = find_peaks(
                &smoothed,
                &PeakOptions::default()
                    .with_distance(distance)
                    .with_height(mean + 0.5 * std),
            );
            let trough_positions = find_troughs(
                &smoothed,
                &PeakOptions::default()
                    .with_distance(distance)
                    .with_height(-mean + 0.5 * std),
            );

            #[allow(clippy::cast_precision_loss)]
            let distances: Vec<f64> = stats::diff(&peak_positions)
                .into_iter()
                .map(|d| d as f64)
                .collect();
            let cycle_detected = !peak_positions.is_empty() || !trough_positions.is_empty();
            debug!(turns = n, distance, cycle_detected, "smoothed cycle detection");
            SmoothedCycles {
                smoothed,
                cycle_detected,
                mean_cycle_length: stats::mean(&distances),
                cycle_regularity: stats::std_dev(&distances),
                peak_positions,
                trough_positions,
            }
        })
    }

    /// Descriptive statistics of a session, or `None` when it has no
    /// metrics. Cycle completeness uses the session's stored cycle summary
    /// and is 0 without one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn session_statistics(&self, session: &Session) -> Option<SessionStatistics> {
        let metrics = session.metrics();
        let (first, last) = (metrics.first()?, metrics.last()?);
        let n = metrics.len() as f64;

        let lengths: Vec<f64> = metrics.iter().map(|m| m.length() as f64).collect();
        let vocabulary: HashSet<String> =
            session.responses().iter().flat_map(|r| word_set(r)).collect();

        let mut totals = PhaseScores::default();
        let mut counts = PhaseScores::default();
        for metric in metrics {
            for (phase, score) in metric.phase_markers().iter() {
                totals.set(phase, totals.get(phase) + score);
            }
            let dominant = metric.dominant_phase();
            counts.set(dominant, counts.get(dominant) + 1.0);
        }
        let mut distribution = PhaseScores::default();
        for phase in Phase::ALL {
            distribution.set(phase, counts.get(phase) / n);
        }

        let coherence_trajectory = if last.coherence() > first.coherence() {
            Trajectory::Ascending
        } else {
            Trajectory::Descending
        };
        let num_peaks = session.cycles().map_or(0, |c| c.num_peaks) as f64;

        Some(SessionStatistics {
            total_responses: metrics.len(),
            avg_response_length: stats::mean(&lengths),
            total_unique_words: vocabulary.len(),
            coherence_trajectory,
            dominant_phase: totals.dominant(),
            phase_distribution: distribution,
            cycle_completeness: num_peaks / (n / 4.0),
        })
    }

    /// Run [`Self::detect`] and [`Self::session_statistics`] and attach the
    /// results to `session`.
    #[must_use]
    pub fn analyze(&self, session: Session) -> Session {
        let metrics = session.metrics().to_vec();
        let cycles = self.detect(&metrics).into_measured();
        let with_cycles = session.with_analysis(metrics.clone(), cycles.clone(), None);
        let statistics = self.session_statistics(&with_cycles);
        with_cycles.with_analysis(metrics, cycles, statistics)
    }
}

fn coherence_or_zero(metrics: &[MetricRecord]) -> Vec<f64> {
    metrics
        .iter()
        .map(|m| {
            let c = m.coherence();
            if c.is_finite() {
                c
            } else {
                0.0
            }
        })
        .collect()
}
