//! Per-turn metric calculation

use tracing::debug;

use super::coherence::CoherenceStrategy;
use super::text::{
    is_error_marker, jaccard, lexical_diversity, semantic_drift, shannon_entropy,
    vocabulary_evolution,
};
use crate::config::AnalysisConfig;
use crate::phase::PhaseClassifier;
use crate::session::MetricRecord;

/// Derives a [`MetricRecord`] from a response and its history, using an
/// injected coherence strategy.
pub struct MetricCalculator {
    strategy: Box<dyn CoherenceStrategy>,
    classifier: PhaseClassifier,
    error_markers: Vec<String>,
}

impl std::fmt::Debug for MetricCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricCalculator")
            .field("strategy", &self.strategy.name())
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl MetricCalculator {
    /// Create a calculator for `config` scoring coherence with `strategy`.
    #[must_use]
    pub fn new(config: &AnalysisConfig, strategy: Box<dyn CoherenceStrategy>) -> Self {
        Self {
            strategy,
            classifier: PhaseClassifier::new(&config.phases),
            error_markers: config.error_markers.clone(),
        }
    }

    /// Name of the active coherence strategy.
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Measure one response given every response before it.
    #[must_use]
    pub fn measure(&self, response: &str, position: usize, history: &[String]) -> MetricRecord {
        let length = response.split_whitespace().count();
        let mut builder = MetricRecord::builder(position, self.strategy.score(response, history))
            .entropy(shannon_entropy(response))
            .phase_markers(self.classifier.classify(response))
            .length(length)
            .lexical_diversity(lexical_diversity(response));

        if let (Some(previous), Some(first)) = (history.last(), history.first()) {
            builder = builder
                .similarities(jaccard(response, previous), jaccard(response, first))
                .vocabulary_evolution(vocabulary_evolution(response, history))
                .semantic_drift(semantic_drift(response, history));
        }
        builder.build()
    }

    /// Measure a full response list in turn order.
    #[must_use]
    pub fn measure_all(&self, responses: &[String]) -> Vec<MetricRecord> {
        let metrics: Vec<MetricRecord> = responses
            .iter()
            .enumerate()
            .map(|(position, response)| self.measure(response, position, &responses[..position]))
            .collect();
        debug!(
            strategy = self.strategy.name(),
            turns = metrics.len(),
            "measured responses"
        );
        metrics
    }

    /// Coherence of each non-error response; error turns are skipped.
    ///
    /// History passed to the strategy still includes every earlier turn.
    #[must_use]
    pub fn valid_coherence(&self, responses: &[String]) -> Vec<f64> {
        responses
            .iter()
            .enumerate()
            .filter(|(_, r)| !is_error_marker(r, &self.error_markers))
            .map(|(i, r)| self.strategy.score(r, &responses[..i]))
            .collect()
    }
}
