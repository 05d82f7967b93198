//! Session - one scripted conversation with a model plus derived metrics

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::{CycleSummary, MetricRecord, SessionStatistics};
use crate::config::AnalysisConfig;
use crate::phase::Phase;
use crate::{Error, Result};

/// Session represents a complete conversation and its per-turn metrics.
///
/// Sessions are produced once (by a conversation run, a synthetic generator
/// or a reanalysis) and are read-only afterwards. Loaded files may carry a
/// numeric `session_id`; it is normalized to a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    model: String,
    #[serde(deserialize_with = "string_or_number")]
    session_id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    prompts: Vec<String>,
    #[serde(default)]
    responses: Vec<String>,
    #[serde(default)]
    metrics: Vec<MetricRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cycles: Option<CycleSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    statistics: Option<SessionStatistics>,
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "session_id must be a string or number, got {other}"
        ))),
    }
}

/// Accept ISO-8601 with or without offset; anything unparseable is dropped.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDateTime>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Ok(Some(naive));
    }
    Ok(DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|dt| dt.naive_utc()))
}

impl Session {
    /// Create a builder for a session.
    #[must_use]
    pub fn builder(model: impl Into<String>, session_id: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(model, session_id)
    }

    /// Model that produced the responses.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Wall-clock time the session was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    /// Prompts in the order they were sent.
    #[must_use]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Responses in turn order (error turns hold a marker string).
    #[must_use]
    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    /// Per-turn metric records.
    #[must_use]
    pub fn metrics(&self) -> &[MetricRecord] {
        &self.metrics
    }

    /// Cycle summary, if one was computed.
    #[must_use]
    pub const fn cycles(&self) -> Option<&CycleSummary> {
        self.cycles.as_ref()
    }

    /// Session statistics, if computed.
    #[must_use]
    pub const fn statistics(&self) -> Option<&SessionStatistics> {
        self.statistics.as_ref()
    }

    /// Coherence value of every turn.
    #[must_use]
    pub fn coherence_series(&self) -> Vec<f64> {
        self.metrics.iter().map(MetricRecord::coherence).collect()
    }

    /// Dominant phase of every turn.
    #[must_use]
    pub fn dominant_phases(&self) -> Vec<Phase> {
        self.metrics.iter().map(MetricRecord::dominant_phase).collect()
    }

    /// Number of responses carrying an error marker.
    #[must_use]
    pub fn error_count(&self, config: &AnalysisConfig) -> usize {
        self.responses
            .iter()
            .filter(|r| config.is_error_response(r))
            .count()
    }

    /// Complete session with no error responses.
    #[must_use]
    pub fn is_clean(&self, config: &AnalysisConfig) -> bool {
        self.responses.len() >= config.thresholds.clean_session_min_responses
            && self.error_count(config) == 0
    }

    /// Replace metrics and derived summaries, keeping the transcript.
    #[must_use]
    pub fn with_analysis(
        mut self,
        metrics: Vec<MetricRecord>,
        cycles: Option<CycleSummary>,
        statistics: Option<SessionStatistics>,
    ) -> Self {
        self.metrics = metrics;
        self.cycles = cycles;
        self.statistics = statistics;
        self
    }

    /// Check the per-turn invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSession`] when the model name is empty,
    /// metric positions are not strictly increasing, or a phase score is
    /// negative.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::MalformedSession(format!(
                "session '{}' has an empty model name",
                self.session_id
            )));
        }
        for pair in self.metrics.windows(2) {
            if pair[1].position() <= pair[0].position() {
                return Err(Error::MalformedSession(format!(
                    "session '{}': metric position {} does not follow {}",
                    self.session_id,
                    pair[1].position(),
                    pair[0].position()
                )));
            }
        }
        if let Some(metric) = self
            .metrics
            .iter()
            .find(|m| m.phase_markers().iter().any(|(_, s)| s < 0.0))
        {
            return Err(Error::MalformedSession(format!(
                "session '{}': negative phase score at position {}",
                self.session_id,
                metric.position()
            )));
        }
        Ok(())
    }
}

/// Builder for `Session`.
#[derive(Debug)]
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(model: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            session: Session {
                model: model.into(),
                session_id: session_id.into(),
                timestamp: None,
                prompts: Vec::new(),
                responses: Vec::new(),
                metrics: Vec::new(),
                cycles: None,
                statistics: None,
            },
        }
    }

    /// Set the recording time.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.session.timestamp = Some(timestamp);
        self
    }

    /// Set the prompts.
    #[must_use]
    pub fn prompts(mut self, prompts: Vec<String>) -> Self {
        self.session.prompts = prompts;
        self
    }

    /// Set the responses.
    #[must_use]
    pub fn responses(mut self, responses: Vec<String>) -> Self {
        self.session.responses = responses;
        self
    }

    /// Set the metric records.
    #[must_use]
    pub fn metrics(mut self, metrics: Vec<MetricRecord>) -> Self {
        self.session.metrics = metrics;
        self
    }

    /// Set the cycle summary.
    #[must_use]
    pub fn cycles(mut self, cycles: CycleSummary) -> Self {
        self.session.cycles = Some(cycles);
        self
    }

    /// Set the session statistics.
    #[must_use]
    pub fn statistics(mut self, statistics: SessionStatistics) -> Self {
        self.session.statistics = Some(statistics);
        self
    }

    /// Build the `Session`.
    #[must_use]
    pub fn build(self) -> Session {
        self.session
    }
}
