//! Pattern metrics that stay usable on short or gappy sessions
//!
//! These work from as few as three turns and fall back to other signals
//! when coherence is missing, so error-heavy collections still yield
//! something to compare.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Thresholds;
use crate::session::{MetricRecord, Session};
use crate::{stats, Outcome};

/// Direction-change points in a short metric sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroCycles {
    /// At least one direction change was found
    pub detected: bool,
    /// Number of direction changes
    pub num_micro_cycles: usize,
    /// Turn indices where the direction changes
    pub cycle_positions: Vec<usize>,
    /// `max - min` of the analyzed values
    pub amplitude: f64,
    /// `min(1, changes / turns)`
    pub confidence: f64,
}

/// Best available coherence-like value for a turn: coherence, then
/// `1 - entropy/10`, then `length/100`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn proxy_value(metric: &MetricRecord) -> f64 {
    if metric.coherence().is_finite() {
        metric.coherence()
    } else if metric.entropy().is_finite() {
        1.0 - metric.entropy() / 10.0
    } else {
        metric.length() as f64 / 100.0
    }
}

/// Sign of `v` with zero mapped to zero.
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Find turns where the first difference changes sign.
///
/// A flat step counts as its own sign, so `up, flat` is a change.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn detect_micro_cycles(metrics: &[MetricRecord], window: usize) -> Outcome<MicroCycles> {
    Outcome::require(window.max(3), metrics.len(), || {
        let values: Vec<f64> = metrics.iter().map(proxy_value).collect();
        let signs: Vec<i8> = stats::diff(&values).into_iter().map(sign).collect();
        let cycle_positions: Vec<usize> = signs
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| (pair[0] != pair[1]).then_some(i + 1))
            .collect();

        let detected = !cycle_positions.is_empty();
        let (amplitude, confidence) = if detected {
            (
                stats::range(&values),
                (cycle_positions.len() as f64 / values.len() as f64).min(1.0),
            )
        } else {
            (0.0, 0.0)
        };
        MicroCycles {
            detected,
            num_micro_cycles: cycle_positions.len(),
            cycle_positions,
            amplitude,
            confidence,
        }
    })
}

/// Net direction of phase movement through the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentumDirection {
    /// Mostly expected-successor transitions
    Forward,
    /// Mostly out-of-order transitions
    Backward,
    /// Balanced or no movement
    Stable,
}

impl fmt::Display for MomentumDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Stable => "stable",
        })
    }
}

/// How often, and in which direction, the dominant phase moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseMomentum {
    /// Transitions per step: `transitions / (turns - 1)`
    pub momentum: f64,
    /// Net direction
    pub direction: MomentumDirection,
    /// Number of dominant-phase changes
    pub transitions: usize,
    /// Raw direction score (+1 forward, 0 stay, -0.5 otherwise)
    pub direction_score: f64,
}

/// Phase transition momentum over a session.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn phase_momentum(metrics: &[MetricRecord], min_turns: usize) -> Outcome<PhaseMomentum> {
    Outcome::require(min_turns.max(2), metrics.len(), || {
        let phases: Vec<_> = metrics.iter().map(MetricRecord::dominant_phase).collect();
        let mut transitions = 0usize;
        let mut direction_score = 0.0;
        for pair in phases.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            if prev != curr {
                transitions += 1;
            }
            if curr == prev.next() {
                direction_score += 1.0;
            } else if curr != prev {
                direction_score -= 0.5;
            }
        }
        let direction = if direction_score > 0.0 {
            MomentumDirection::Forward
        } else if direction_score < 0.0 {
            MomentumDirection::Backward
        } else {
            MomentumDirection::Stable
        };
        PhaseMomentum {
            momentum: transitions as f64 / (phases.len() - 1) as f64,
            direction,
            transitions,
            direction_score,
        }
    })
}

/// Interior turns whose combined disruption exceeds `crisis_score`.
///
/// A turn accumulates its coherence drop and entropy spike (each only when
/// above its own threshold) plus `crisis_phase_disruption` when its phase
/// is not the expected successor of the previous one. Staying in the same
/// phase counts as a disruption. First and last turns are never flagged.
#[must_use]
pub fn detect_crisis_points(metrics: &[MetricRecord], thresholds: &Thresholds) -> Vec<usize> {
    if metrics.len() < 3 {
        return Vec::new();
    }
    let mut crises = Vec::new();
    for i in 1..metrics.len() - 1 {
        let (prev, curr) = (&metrics[i - 1], &metrics[i]);
        let mut score = 0.0;

        let drop = prev.coherence() - curr.coherence();
        if drop > thresholds.crisis_coherence_drop {
            score += drop;
        }
        let spike = curr.entropy() - prev.entropy();
        if spike > thresholds.crisis_entropy_spike {
            score += spike;
        }
        if curr.dominant_phase() != prev.dominant_phase().next() {
            score += thresholds.crisis_phase_disruption;
        }

        if score > thresholds.crisis_score {
            crises.push(i);
        }
    }
    debug!(turns = metrics.len(), crises = crises.len(), "crisis scan");
    crises
}

/// Recovery rate after coherence drops, averaged over sessions.
///
/// Within a session every interior drop (`c[i] < c[i-1]`) is a candidate
/// and a recovery is `c[i+1] > c[i]`. Missing coherence counts as 0.5.
/// Sessions shorter than `min_turns` or without drops are ignored; if none
/// remain the result is insufficient.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn resilience_score(sessions: &[Session], min_turns: usize) -> Outcome<f64> {
    let scores: Vec<f64> = sessions
        .iter()
        .filter(|s| s.metrics().len() >= min_turns)
        .filter_map(|s| {
            let c: Vec<f64> = s
                .metrics()
                .iter()
                .map(|m| {
                    if m.coherence().is_finite() {
                        m.coherence()
                    } else {
                        0.5
                    }
                })
                .collect();
            let mut drops = 0usize;
            let mut recoveries = 0usize;
            for i in 1..c.len().saturating_sub(1) {
                if c[i] < c[i - 1] {
                    drops += 1;
                    if c[i + 1] > c[i] {
                        recoveries += 1;
                    }
                }
            }
            (drops > 0).then(|| recoveries as f64 / drops as f64)
        })
        .collect();
    Outcome::require(1, scores.len(), || stats::mean(&scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{Phase, PhaseScores};

    fn record(position: usize, coherence: f64, entropy: f64, phase: Phase) -> MetricRecord {
        let mut scores = PhaseScores::default();
        scores.set(phase, 0.6);
        MetricRecord::builder(position, coherence)
            .entropy(entropy)
            .phase_markers(scores)
            .length(40)
            .build()
    }

    fn series(values: &[f64]) -> Vec<MetricRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| record(i, c, 2.0, Phase::Integration))
            .collect()
    }

    #[test]
    fn test_micro_cycles_zigzag() {
        let result = detect_micro_cycles(&series(&[0.2, 0.5, 0.3, 0.6]), 3)
            .into_measured()
            .unwrap();
        assert!(result.detected);
        assert_eq!(result.cycle_positions, vec![1, 2]);
        assert!((result.amplitude - 0.4).abs() < 1e-12);
        assert!((result.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_micro_cycles_insufficient_and_monotonic() {
        assert!(detect_micro_cycles(&series(&[0.1, 0.2]), 3).is_insufficient());
        let result = detect_micro_cycles(&series(&[0.1, 0.2, 0.3, 0.4]), 3)
            .into_measured()
            .unwrap();
        assert!(!result.detected);
        assert_eq!(result.num_micro_cycles, 0);
    }

    #[test]
    fn test_proxy_falls_back_to_entropy() {
        let metric: MetricRecord =
            serde_json::from_str(r#"{"position": 0, "entropy": 4.0, "length": 30}"#).unwrap();
        assert!((proxy_value(&metric) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_phase_momentum_forward() {
        let metrics = vec![
            record(0, 0.5, 2.0, Phase::Integration),
            record(1, 0.5, 2.0, Phase::Consumption),
            record(2, 0.5, 2.0, Phase::Transformation),
            record(3, 0.5, 2.0, Phase::Transformation),
        ];
        let momentum = phase_momentum(&metrics, 3).into_measured().unwrap();
        assert_eq!(momentum.transitions, 2);
        assert!((momentum.momentum - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(momentum.direction, MomentumDirection::Forward);
    }

    #[test]
    fn test_phase_momentum_backward_and_insufficient() {
        let metrics = vec![
            record(0, 0.5, 2.0, Phase::Generation),
            record(1, 0.5, 2.0, Phase::Transformation),
            record(2, 0.5, 2.0, Phase::Consumption),
        ];
        let momentum = phase_momentum(&metrics, 3).into_measured().unwrap();
        assert_eq!(momentum.direction, MomentumDirection::Backward);
        assert!(phase_momentum(&metrics[..2], 3).is_insufficient());
    }

    #[test]
    fn test_crisis_points() {
        let thresholds = Thresholds::default();
        let metrics = vec![
            record(0, 0.9, 2.0, Phase::Integration),
            record(1, 0.3, 2.5, Phase::Consumption),
            record(2, 0.4, 2.6, Phase::Transformation),
            record(3, 0.5, 2.0, Phase::Generation),
        ];
        // turn 1: drop 0.6 plus entropy spike 0.5 -> 1.1
        // turn 2: no drop, no spike, expected successor -> 0
        assert_eq!(detect_crisis_points(&metrics, &thresholds), vec![1]);
        assert!(detect_crisis_points(&metrics[..2], &thresholds).is_empty());
    }

    #[test]
    fn test_crisis_from_phase_stall_and_spike() {
        let thresholds = Thresholds::default();
        let metrics = vec![
            record(0, 0.5, 2.0, Phase::Integration),
            record(1, 0.5, 2.4, Phase::Integration),
            record(2, 0.5, 2.4, Phase::Consumption),
        ];
        // stall 0.5 + spike 0.4 = 0.9
        assert_eq!(detect_crisis_points(&metrics, &thresholds), vec![1]);
    }

    #[test]
    fn test_resilience_score() {
        let recovering = Session::builder("m", "1")
            .metrics(series(&[0.5, 0.3, 0.6, 0.4, 0.2]))
            .build();
        // drops at 1 (recovers) and 3 (does not) -> 0.5
        let outcome = resilience_score(std::slice::from_ref(&recovering), 3);
        assert!((outcome.into_measured().unwrap() - 0.5).abs() < 1e-12);

        let rising = Session::builder("m", "2").metrics(series(&[0.1, 0.2, 0.3])).build();
        assert!(resilience_score(&[rising], 3).is_insufficient());
        assert!(resilience_score(&[], 3).is_insufficient());
    }
}
