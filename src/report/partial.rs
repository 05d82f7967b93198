//! Model signatures and evidence that survive partial data

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::cycles::{detect_crisis_points, detect_micro_cycles, phase_momentum, resilience_score};
use crate::phase::Phase;
use crate::session::Session;
use crate::{stats, Outcome};

/// Micro-cycle window used for evidence gathering.
pub const MICRO_CYCLE_WINDOW: usize = 3;

/// Maximum patterns kept per model.
pub const MAX_PATTERNS: usize = 3;

/// Response count above which a collection is worth a preliminary look.
pub const SUFFICIENT_RESPONSES: usize = 50;

/// Summary features of one model computed from whatever turns exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSignature {
    /// Model name
    pub model: String,
    /// Sessions contributing
    pub n_sessions: usize,
    /// Turns with metrics
    pub n_clean_responses: usize,
    /// Coefficient of variation of response lengths
    pub response_length_signature: f64,
    /// Population variance of coherence
    pub coherence_variance_signature: f64,
    /// Dominant DFT frequency of the pooled coherence (0 when too short)
    pub cycle_fingerprint: f64,
    /// Most frequent dominant phase, if any turn was scored
    pub phase_preference: Option<Phase>,
}

/// Compute a signature for every model with at least one session.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn signatures(by_model: &BTreeMap<String, Vec<Session>>) -> Vec<ModelSignature> {
    by_model
        .iter()
        .filter(|(_, sessions)| !sessions.is_empty())
        .map(|(model, sessions)| {
            let metrics: Vec<_> = sessions.iter().flat_map(Session::metrics).collect();
            let lengths: Vec<f64> = metrics.iter().map(|m| m.length() as f64).collect();
            let coherence: Vec<f64> = metrics
                .iter()
                .map(|m| m.coherence())
                .filter(|c| c.is_finite())
                .collect();

            let mut counts = [0usize; 4];
            for m in &metrics {
                counts[m.dominant_phase().index()] += 1;
            }
            let mut phase_preference = None;
            let mut best = 0;
            for phase in Phase::ALL {
                if counts[phase.index()] > best {
                    best = counts[phase.index()];
                    phase_preference = Some(phase);
                }
            }

            let cycle_fingerprint = if coherence.len() > 4 {
                stats::dominant_frequency(&coherence).unwrap_or(0.0)
            } else {
                0.0
            };

            ModelSignature {
                model: model.clone(),
                n_sessions: sessions.len(),
                n_clean_responses: metrics.len(),
                response_length_signature: stats::coefficient_of_variation(&lengths).unwrap_or(0.0),
                coherence_variance_signature: stats::variance(&coherence),
                cycle_fingerprint,
                phase_preference,
            }
        })
        .collect()
}

/// Patterns found for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPatterns {
    /// Model name
    pub model: String,
    /// Up to [`MAX_PATTERNS`] pattern descriptions, in discovery order
    pub patterns: Vec<String>,
}

/// Everything the partial-data metrics could establish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialEvidence {
    /// Turns with metrics across all models
    pub total_responses: usize,
    /// Models with at least one session
    pub models_with_data: Vec<String>,
    /// Per-model patterns (models without any are omitted)
    pub strongest_patterns: Vec<ModelPatterns>,
    /// Headline findings
    pub key_findings: Vec<String>,
    /// Per-model recovery rate after coherence drops
    pub resilience: BTreeMap<String, Outcome<f64>>,
}

fn session_patterns(session: &Session, config: &AnalysisConfig) -> Vec<String> {
    let metrics = session.metrics();
    let mut patterns = Vec::new();
    if let Some(micro) = detect_micro_cycles(metrics, MICRO_CYCLE_WINDOW).into_measured() {
        if micro.detected {
            patterns.push(format!("Micro-cycles detected (n={})", micro.num_micro_cycles));
        }
    }
    let crises = detect_crisis_points(metrics, &config.thresholds);
    if !crises.is_empty() {
        patterns.push(format!("Crisis points at positions: {crises:?}"));
    }
    let momentum = phase_momentum(metrics, config.thresholds.min_valid_turns);
    if let Some(momentum) = momentum.into_measured() {
        if momentum.momentum > config.thresholds.momentum_report {
            patterns.push(format!("High phase momentum: {:.2}", momentum.momentum));
        }
    }
    patterns
}

/// Gather micro-cycles, crisis points, momentum and resilience per model.
#[must_use]
pub fn aggregate_evidence(
    by_model: &BTreeMap<String, Vec<Session>>,
    config: &AnalysisConfig,
) -> PartialEvidence {
    let mut total_responses = 0;
    let mut models_with_data = Vec::new();
    let mut strongest_patterns = Vec::new();
    let mut resilience = BTreeMap::new();

    for (model, sessions) in by_model {
        if sessions.is_empty() {
            continue;
        }
        models_with_data.push(model.clone());
        total_responses += sessions.iter().map(|s| s.metrics().len()).sum::<usize>();

        let patterns: Vec<String> = sessions
            .iter()
            .flat_map(|s| session_patterns(s, config))
            .take(MAX_PATTERNS)
            .collect();
        if !patterns.is_empty() {
            strongest_patterns.push(ModelPatterns {
                model: model.clone(),
                patterns,
            });
        }
        resilience.insert(
            model.clone(),
            resilience_score(sessions, config.thresholds.min_valid_turns),
        );
    }

    let mut key_findings = Vec::new();
    if total_responses > SUFFICIENT_RESPONSES {
        key_findings.push(format!(
            "Sufficient data for preliminary analysis ({total_responses} responses)"
        ));
    }
    if models_with_data.len() >= 2 {
        key_findings.push(format!(
            "Comparative analysis possible across {} models",
            models_with_data.len()
        ));
    }
    if !strongest_patterns.is_empty() {
        key_findings.push("Ouroboros patterns detected despite partial data".to_string());
    }
    debug!(total_responses, models = models_with_data.len(), "partial evidence gathered");

    PartialEvidence {
        total_responses,
        models_with_data,
        strongest_patterns,
        key_findings,
        resilience,
    }
}
