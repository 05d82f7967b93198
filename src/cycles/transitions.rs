//! Phase-transition extraction

use crate::session::{MetricRecord, PhaseTransition};

/// Adjacent-turn changes of dominant phase, in turn order.
///
/// `position` is the index into `metrics` of the turn that introduces the
/// new phase. A missing coherence value counts as 0 in `coherence_change`.
#[must_use]
pub fn detect_phase_transitions(metrics: &[MetricRecord]) -> Vec<PhaseTransition> {
    metrics
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let from_phase = pair[0].dominant_phase();
            let to_phase = pair[1].dominant_phase();
            (from_phase != to_phase).then(|| PhaseTransition {
                position: i + 1,
                from_phase,
                to_phase,
                coherence_change: finite_or_zero(pair[1].coherence())
                    - finite_or_zero(pair[0].coherence()),
            })
        })
        .collect()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
