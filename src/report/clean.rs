//! Analysis restricted to clean sessions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::cycles::{detect_phase_transitions, find_peaks, PeakOptions};
use crate::phase::Phase;
use crate::session::Session;
use crate::stats;

/// Per-model results over clean sessions only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanAnalysis {
    /// Model name
    pub model: String,
    /// Clean sessions used
    pub n_sessions: usize,
    /// Turns across those sessions
    pub n_responses: usize,
    /// Pooled coherence mean
    pub mean_coherence: f64,
    /// Pooled coherence std
    pub std_coherence: f64,
    /// Pooled coherence range
    pub coherence_range: f64,
    /// Mean inter-peak distance over all sessions (0 if none)
    pub mean_cycle_length: f64,
    /// Std of inter-peak distances (0 if none)
    pub cycle_regularity: f64,
    /// Dominant-phase changes
    pub n_transitions: usize,
    /// Transitions per turn
    pub transition_rate: f64,
    /// Transitions into the transformation phase
    pub n_transformations: usize,
    /// Share of coherence drops followed by a transformation turn
    pub transformation_prediction_accuracy: Option<f64>,
}

/// Analyze the clean sessions of every model.
///
/// A session is clean per [`Session::is_clean`]. Missing coherence counts
/// as 0. Models with no clean turns are omitted.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze_clean(
    by_model: &BTreeMap<String, Vec<Session>>,
    config: &AnalysisConfig,
) -> Vec<CleanAnalysis> {
    let mut results = Vec::new();
    for (model, sessions) in by_model {
        let clean: Vec<&Session> = sessions.iter().filter(|s| s.is_clean(config)).collect();
        info!(model = %model, total = sessions.len(), clean = clean.len(), "clean session filter");

        let mut coherence = Vec::new();
        let mut cycle_lengths = Vec::new();
        let mut n_transitions = 0;
        let mut n_transformations = 0;
        let mut predictions = Vec::new();

        for session in &clean {
            let series: Vec<f64> = session
                .coherence_series()
                .into_iter()
                .map(|c| if c.is_finite() { c } else { 0.0 })
                .collect();

            if series.len() > 3 {
                let peaks = find_peaks(&series, &PeakOptions::default());
                cycle_lengths.extend(stats::diff(&peaks).into_iter().map(|d| d as f64));
            }

            let transitions = detect_phase_transitions(session.metrics());
            n_transitions += transitions.len();
            n_transformations += transitions
                .iter()
                .filter(|t| t.to_phase == Phase::Transformation)
                .count();

            let phases = session.dominant_phases();
            for i in 1..series.len().saturating_sub(1) {
                if series[i] < series[i - 1] {
                    predictions.push(phases[i + 1] == Phase::Transformation);
                }
            }
            coherence.extend(series);
        }

        if coherence.is_empty() {
            continue;
        }
        let hits = predictions.iter().filter(|&&hit| hit).count();
        let transformation_prediction_accuracy =
            (!predictions.is_empty()).then(|| hits as f64 / predictions.len() as f64);

        results.push(CleanAnalysis {
            model: model.clone(),
            n_sessions: clean.len(),
            n_responses: coherence.len(),
            mean_coherence: stats::mean(&coherence),
            std_coherence: stats::std_dev(&coherence),
            coherence_range: stats::range(&coherence),
            mean_cycle_length: stats::mean(&cycle_lengths),
            cycle_regularity: stats::std_dev(&cycle_lengths),
            n_transitions,
            transition_rate: n_transitions as f64 / coherence.len() as f64,
            n_transformations,
            transformation_prediction_accuracy,
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseScores;
    use crate::session::MetricRecord;

    fn record(position: usize, coherence: f64, phase: Phase) -> MetricRecord {
        let mut scores = PhaseScores::default();
        scores.set(phase, 0.5);
        MetricRecord::builder(position, coherence).phase_markers(scores).build()
    }

    fn clean_session(id: &str) -> Session {
        Session::builder("m", id)
            .responses((0..5).map(|i| format!("reply {i}")).collect())
            .metrics(vec![
                record(0, 0.5, Phase::Integration),
                record(1, 0.8, Phase::Integration),
                record(2, 0.4, Phase::Consumption),
                record(3, 0.7, Phase::Transformation),
                record(4, 0.6, Phase::Transformation),
            ])
            .build()
    }

    #[test]
    fn test_clean_analysis() {
        let dirty = Session::builder("m", "x")
            .responses(vec!["Error 429".into(); 5])
            .metrics(vec![record(0, 0.0, Phase::Integration)])
            .build();
        let mut map = BTreeMap::new();
        map.insert("m".to_string(), vec![clean_session("1"), dirty]);

        let results = analyze_clean(&map, &AnalysisConfig::default());
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.n_sessions, 1);
        assert_eq!(r.n_responses, 5);
        assert_eq!(r.n_transitions, 2);
        assert_eq!(r.n_transformations, 1);
        // peaks at 1 and 3
        assert!((r.mean_cycle_length - 2.0).abs() < 1e-12);
        // one drop at turn 2, followed by transformation
        assert_eq!(r.transformation_prediction_accuracy, Some(1.0));
        assert!((r.transition_rate - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_no_clean_sessions() {
        let mut map = BTreeMap::new();
        map.insert("m".to_string(), vec![Session::builder("m", "0").build()]);
        assert!(analyze_clean(&map, &AnalysisConfig::default()).is_empty());
    }
}
