//! Metric Record - per-turn measurements of one response

use serde::{Deserialize, Deserializer, Serialize};

use crate::metrics::text::VocabularyEvolution;
use crate::phase::{Phase, PhaseScores};

/// Metric Record holds the measurements taken for a single conversation turn.
///
/// Records are ordered by `position`, one per response. The required part
/// (`position`, `coherence`, `entropy`, `phase_markers`, `length`) matches
/// the persisted session schema; the remaining fields are written only when
/// the turn had prior context.
///
/// A record loaded without a usable coherence value carries `NaN`, which
/// the partial-data metrics treat as "fall back to another signal".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    position: usize,
    #[serde(default = "missing_coherence", deserialize_with = "nullable_f64")]
    coherence: f64,
    #[serde(default)]
    entropy: f64,
    #[serde(default)]
    phase_markers: PhaseScores,
    #[serde(default)]
    length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lexical_diversity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    similarity_to_previous: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    similarity_to_first: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vocabulary_evolution: Option<VocabularyEvolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    semantic_drift: Option<f64>,
}

const fn missing_coherence() -> f64 {
    f64::NAN
}

fn nullable_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl MetricRecord {
    /// Create a record with only the required fields set.
    #[must_use]
    pub fn new(
        position: usize,
        coherence: f64,
        entropy: f64,
        phase_markers: PhaseScores,
        length: usize,
    ) -> Self {
        Self::builder(position, coherence)
            .entropy(entropy)
            .phase_markers(phase_markers)
            .length(length)
            .build()
    }

    /// Create a builder for constructing a record with optional fields.
    #[must_use]
    pub fn builder(position: usize, coherence: f64) -> MetricRecordBuilder {
        MetricRecordBuilder::new(position, coherence)
    }

    /// Turn index within the session.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Coherence score; `NaN` if the stored record had none.
    #[must_use]
    pub const fn coherence(&self) -> f64 {
        self.coherence
    }

    /// Word-frequency entropy in bits.
    #[must_use]
    pub const fn entropy(&self) -> f64 {
        self.entropy
    }

    /// Per-phase keyword scores.
    #[must_use]
    pub const fn phase_markers(&self) -> &PhaseScores {
        &self.phase_markers
    }

    /// Response length in words.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Arg-max phase of this turn.
    #[must_use]
    pub fn dominant_phase(&self) -> Phase {
        self.phase_markers.dominant()
    }

    /// Type-token ratio, if measured.
    #[must_use]
    pub const fn lexical_diversity(&self) -> Option<f64> {
        self.lexical_diversity
    }

    /// Jaccard similarity to the previous response.
    #[must_use]
    pub const fn similarity_to_previous(&self) -> Option<f64> {
        self.similarity_to_previous
    }

    /// Jaccard similarity to the first response.
    #[must_use]
    pub const fn similarity_to_first(&self) -> Option<f64> {
        self.similarity_to_first
    }

    /// Vocabulary change relative to all earlier responses.
    #[must_use]
    pub const fn vocabulary_evolution(&self) -> Option<&VocabularyEvolution> {
        self.vocabulary_evolution.as_ref()
    }

    /// Distance from the first response.
    #[must_use]
    pub const fn semantic_drift(&self) -> Option<f64> {
        self.semantic_drift
    }
}

/// Builder for `MetricRecord`.
#[derive(Debug)]
pub struct MetricRecordBuilder {
    record: MetricRecord,
}

impl MetricRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(position: usize, coherence: f64) -> Self {
        Self {
            record: MetricRecord {
                position,
                coherence,
                entropy: 0.0,
                phase_markers: PhaseScores::default(),
                length: 0,
                lexical_diversity: None,
                similarity_to_previous: None,
                similarity_to_first: None,
                vocabulary_evolution: None,
                semantic_drift: None,
            },
        }
    }

    /// Set the entropy.
    #[must_use]
    pub const fn entropy(mut self, entropy: f64) -> Self {
        self.record.entropy = entropy;
        self
    }

    /// Set the phase-marker scores.
    #[must_use]
    pub const fn phase_markers(mut self, scores: PhaseScores) -> Self {
        self.record.phase_markers = scores;
        self
    }

    /// Set the response length in words.
    #[must_use]
    pub const fn length(mut self, length: usize) -> Self {
        self.record.length = length;
        self
    }

    /// Set the type-token ratio.
    #[must_use]
    pub const fn lexical_diversity(mut self, value: f64) -> Self {
        self.record.lexical_diversity = Some(value);
        self
    }

    /// Set the similarities to the previous and first responses.
    #[must_use]
    pub const fn similarities(mut self, to_previous: f64, to_first: f64) -> Self {
        self.record.similarity_to_previous = Some(to_previous);
        self.record.similarity_to_first = Some(to_first);
        self
    }

    /// Set the vocabulary evolution.
    #[must_use]
    pub const fn vocabulary_evolution(mut self, evolution: VocabularyEvolution) -> Self {
        self.record.vocabulary_evolution = Some(evolution);
        self
    }

    /// Set the semantic drift.
    #[must_use]
    pub const fn semantic_drift(mut self, drift: f64) -> Self {
        self.record.semantic_drift = Some(drift);
        self
    }

    /// Build the `MetricRecord`.
    #[must_use]
    pub fn build(self) -> MetricRecord {
        self.record
    }
}
