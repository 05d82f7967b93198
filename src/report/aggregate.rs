//! Cross-model aggregation and significance tests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::phase::{Phase, PhaseScores};
use crate::session::{CycleSummary, Session};
use crate::stats::{self, AnovaResult, ChiSquare};

/// Per-model summary of stored cycle summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model name
    pub model: String,
    /// Sessions with a cycle summary
    pub sessions_analyzed: usize,
    /// Mean peak count
    pub avg_cycles: f64,
    /// Population std of peak counts
    pub std_cycles: f64,
    /// Mean coherence range
    pub avg_cycle_amplitude: f64,
    /// Mean transitions per turn
    pub phase_transition_rate: f64,
    /// Mean coherence std (lower is more stable)
    pub coherence_stability: f64,
    /// Mean of session coherence means
    pub avg_coherence: f64,
    /// Share of turns in which each phase dominated
    pub phase_dominance: PhaseScores,
    /// Mean cycle regularity
    pub avg_cycle_regularity: f64,
}

impl ModelSummary {
    /// Phase with the largest dominance share (ties to canonical order).
    #[must_use]
    pub fn dominant_phase(&self) -> Phase {
        self.phase_dominance.dominant()
    }
}

fn with_cycles(sessions: &[Session]) -> Vec<(&Session, &CycleSummary)> {
    sessions
        .iter()
        .filter_map(|s| match s.cycles() {
            Some(c) => Some((s, c)),
            None => {
                debug!(
                    model = s.model(),
                    session_id = s.session_id(),
                    "session has no cycle summary"
                );
                None
            }
        })
        .collect()
}

fn mean_of<T>(items: &[T], f: impl Fn(&T) -> f64) -> f64 {
    let values: Vec<f64> = items.iter().map(f).collect();
    stats::mean(&values)
}

/// Compare models by their sessions' cycle summaries.
///
/// Sessions without a cycle summary are skipped; models left with none are
/// omitted.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compare_models(by_model: &BTreeMap<String, Vec<Session>>) -> Vec<ModelSummary> {
    let mut summaries = Vec::new();
    for (model, sessions) in by_model {
        let analyzed = with_cycles(sessions);
        if analyzed.is_empty() {
            continue;
        }
        let peaks: Vec<f64> = analyzed.iter().map(|(_, c)| c.num_peaks as f64).collect();

        let mut counts = PhaseScores::default();
        let mut turns = 0usize;
        for (session, _) in &analyzed {
            for phase in session.dominant_phases() {
                counts.set(phase, counts.get(phase) + 1.0);
                turns += 1;
            }
        }
        let mut phase_dominance = PhaseScores::default();
        if turns > 0 {
            for phase in Phase::ALL {
                phase_dominance.set(phase, counts.get(phase) / turns as f64);
            }
        }

        summaries.push(ModelSummary {
            model: model.clone(),
            sessions_analyzed: analyzed.len(),
            avg_cycles: stats::mean(&peaks),
            std_cycles: stats::std_dev(&peaks),
            avg_cycle_amplitude: mean_of(&analyzed, |(_, c)| c.coherence_range),
            phase_transition_rate: mean_of(&analyzed, |(_, c)| c.transition_rate),
            coherence_stability: mean_of(&analyzed, |(_, c)| c.coherence_std),
            avg_coherence: mean_of(&analyzed, |(_, c)| c.coherence_mean),
            phase_dominance,
            avg_cycle_regularity: mean_of(&analyzed, |(_, c)| c.cycle_regularity),
        });
    }
    summaries
}

/// ANOVA of peak counts across models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleAnova {
    /// Test result
    pub result: AnovaResult,
    /// `p < significance_level`
    pub significant: bool,
}

/// Position-vs-coherence correlation summary for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    /// Mean per-session Pearson r
    pub mean_correlation: f64,
    /// Population std of per-session r
    pub std_correlation: f64,
    /// Sessions with a defined correlation
    pub sessions: usize,
}

/// Autocorrelation period summary for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Periodicity {
    /// Mean dominant period
    pub mean_period: f64,
    /// Population std of dominant periods
    pub std_period: f64,
    /// Most common dominant period (smallest on ties)
    pub modal_period: usize,
}

/// Cross-model statistical tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalTests {
    /// Peak-count ANOVA, when at least two models have data and it is defined
    pub anova_cycles: Option<CycleAnova>,
    /// Per-model position/coherence correlation
    pub position_coherence_correlation: BTreeMap<String, CorrelationSummary>,
    /// Per-model autocorrelation periodicity
    pub periodicity: BTreeMap<String, Periodicity>,
}

/// Run the cross-model tests.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn run_statistical_tests(
    by_model: &BTreeMap<String, Vec<Session>>,
    config: &AnalysisConfig,
) -> StatisticalTests {
    let mut tests = StatisticalTests::default();

    let groups: Vec<Vec<f64>> = by_model
        .values()
        .map(|sessions| {
            with_cycles(sessions)
                .iter()
                .map(|(_, c)| c.num_peaks as f64)
                .collect::<Vec<f64>>()
        })
        .filter(|g| !g.is_empty())
        .collect();
    if groups.len() >= 2 {
        tests.anova_cycles = stats::one_way_anova(&groups).map(|result| CycleAnova {
            significant: result.p_value < config.thresholds.significance_level,
            result,
        });
    }

    for (model, sessions) in by_model {
        let correlations: Vec<f64> = sessions
            .iter()
            .filter(|s| s.metrics().len() > 1)
            .filter_map(|s| {
                let positions: Vec<f64> =
                    s.metrics().iter().map(|m| m.position() as f64).collect();
                // missing coherence counts as 0
                let coherence: Vec<f64> = s
                    .coherence_series()
                    .into_iter()
                    .map(|c| if c.is_finite() { c } else { 0.0 })
                    .collect();
                stats::pearson(&positions, &coherence).map(|c| c.r)
            })
            .collect();
        if !correlations.is_empty() {
            tests.position_coherence_correlation.insert(
                model.clone(),
                CorrelationSummary {
                    mean_correlation: stats::mean(&correlations),
                    std_correlation: stats::std_dev(&correlations),
                    sessions: correlations.len(),
                },
            );
        }

        let periods: Vec<usize> = sessions
            .iter()
            .filter_map(|s| s.cycles().and_then(|c| c.dominant_period))
            .filter(|&p| p > 0)
            .collect();
        if let Some(modal_period) = stats::mode(&periods) {
            let as_f64: Vec<f64> = periods.iter().map(|&p| p as f64).collect();
            tests.periodicity.insert(
                model.clone(),
                Periodicity {
                    mean_period: stats::mean(&as_f64),
                    std_period: stats::std_dev(&as_f64),
                    modal_period,
                },
            );
        }
    }
    debug!(
        models = by_model.len(),
        anova = tests.anova_cycles.is_some(),
        "statistical tests complete"
    );
    tests
}

/// Dominant-phase counts and a uniformity test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDistributionTest {
    /// Turns per dominant phase (every phase present)
    pub counts: BTreeMap<Phase, usize>,
    /// Chi-square against a uniform split, when defined
    pub chi_square: Option<ChiSquare>,
}

/// Count dominant phases across all turns and test against uniform.
#[must_use]
pub fn phase_distribution_test(sessions: &[Session]) -> PhaseDistributionTest {
    let mut counts: BTreeMap<Phase, usize> = Phase::ALL.iter().map(|&p| (p, 0)).collect();
    for session in sessions {
        for phase in session.dominant_phases() {
            *counts.entry(phase).or_insert(0) += 1;
        }
    }
    let observed: Vec<usize> = Phase::ALL.iter().map(|p| counts[p]).collect();
    PhaseDistributionTest {
        chi_square: stats::chi_square_uniform(&observed),
        counts,
    }
}
