//! Cycle Summary - derived, read-only aggregates over a session

use serde::{Deserialize, Deserializer, Serialize};

use crate::phase::{Phase, PhaseScores};

/// Adjacent-turn change of dominant phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    /// Turn at which the new phase appears
    pub position: usize,
    /// Dominant phase of the previous turn
    pub from_phase: Phase,
    /// Dominant phase of this turn
    pub to_phase: Phase,
    /// `coherence[position] - coherence[position - 1]`; `null` loads as 0
    #[serde(default, deserialize_with = "null_as_zero")]
    pub coherence_change: f64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl PhaseTransition {
    /// True when the transition follows the expected phase order.
    #[must_use]
    pub fn is_forward(&self) -> bool {
        self.from_phase.next() == self.to_phase
    }

    /// True for a direct jump between integration and generation.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        matches!(
            (self.from_phase, self.to_phase),
            (Phase::Integration, Phase::Generation) | (Phase::Generation, Phase::Integration)
        )
    }
}

/// Peak/trough and phase-transition summary of one session.
///
/// Older session files may lack the newer fields; those default to empty
/// or zero on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleSummary {
    /// Number of coherence peaks
    pub num_peaks: usize,
    /// Number of coherence troughs
    pub num_troughs: usize,
    /// Turn indices of the peaks
    pub peak_positions: Vec<usize>,
    /// Turn indices of the troughs
    pub trough_positions: Vec<usize>,
    /// Dominant-phase changes in turn order
    pub phase_transitions: Vec<PhaseTransition>,
    /// Transitions per turn
    pub transition_rate: f64,
    /// Mean coherence
    pub coherence_mean: f64,
    /// Population standard deviation of coherence
    pub coherence_std: f64,
    /// `max - min` coherence
    pub coherence_range: f64,
    /// Standard deviation of inter-peak distances (0 with fewer than two peaks)
    pub cycle_regularity: f64,
    /// Mean inter-peak distance, when at least two peaks exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_cycle_length: Option<f64>,
    /// Normalized autocorrelation for lags 0..10 (long sessions only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autocorrelation: Option<Vec<f64>>,
    /// Lag of the first autocorrelation peak
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_period: Option<usize>,
}

/// Direction of coherence from the first to the last turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    /// Last turn more coherent than the first
    Ascending,
    /// Last turn no more coherent than the first
    Descending,
}

/// Session-level descriptive statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    /// Number of metric records
    pub total_responses: usize,
    /// Mean response length in words
    pub avg_response_length: f64,
    /// Distinct lowercased words across all responses
    pub total_unique_words: usize,
    /// First-to-last coherence direction
    pub coherence_trajectory: Trajectory,
    /// Phase with the largest summed marker score
    pub dominant_phase: Phase,
    /// Share of turns per dominant phase
    pub phase_distribution: PhaseScores,
    /// `num_peaks / (turns / 4)`
    pub cycle_completeness: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_classification() {
        let forward = PhaseTransition {
            position: 1,
            from_phase: Phase::Transformation,
            to_phase: Phase::Generation,
            coherence_change: 0.1,
        };
        assert!(forward.is_forward());
        assert!(!forward.is_bypass());

        let bypass = PhaseTransition {
            from_phase: Phase::Generation,
            to_phase: Phase::Integration,
            ..forward
        };
        assert!(bypass.is_forward());
        assert!(bypass.is_bypass());
    }

    #[test]
    fn test_null_coherence_change_loads_as_zero() {
        let json = r#"{"position": 4, "from_phase": "consumption",
            "to_phase": "transformation", "coherence_change": null}"#;
        let transition: PhaseTransition = serde_json::from_str(json).unwrap();
        assert_eq!(transition.position, 4);
        assert!(transition.coherence_change.abs() < f64::EPSILON);
    }

    #[test]
    fn test_minimal_cycles_json_loads() {
        let json = r#"{"num_peaks": 2, "num_troughs": 1, "peak_positions": [2, 6],
            "trough_positions": [4], "phase_transitions": [
                {"position": 3, "from_phase": "integration", "to_phase": "consumption", "coherence_change": -0.2}
            ], "coherence_mean": 0.5, "coherence_std": 0.1, "coherence_range": 0.3,
            "cycle_regularity": 0.0, "dominant_period": null}"#;
        let cycles: CycleSummary = serde_json::from_str(json).unwrap();
        assert_eq!(cycles.num_peaks, 2);
        assert_eq!(cycles.phase_transitions[0].to_phase, Phase::Consumption);
        assert!(cycles.dominant_period.is_none());
        assert!((cycles.transition_rate).abs() < f64::EPSILON);
    }
}
