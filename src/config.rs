//! Analysis configuration
//!
//! Phase keyword lists, thresholds and the conversation script are plain
//! data here and passed by reference into every computation. Every field
//! has a default, so a JSON file only needs to name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::{Error, Result};

/// Scripted prompts meant to walk a model through all four phases.
pub const DEFAULT_PROMPTS: [&str; 21] = [
    // integration
    "Describe the concept of transformation in nature.",
    "How do patterns emerge from simple rules?",
    "What role does memory play in learning?",
    "Explain how systems self-organize.",
    // consumption
    "But what if everything you just said was wrong?",
    "How would you reconsider those ideas from a completely different perspective?",
    "Question your fundamental assumptions.",
    // transformation
    "Combine your previous thoughts in a new way.",
    "What patterns do you see across your responses?",
    "How do these concepts relate to each other?",
    // generation
    "Synthesize a new understanding from our conversation.",
    "What emerges that wasn't present before?",
    "Describe the unified picture.",
    // second pass
    "Now apply this to consciousness itself.",
    "Question your own reasoning process.",
    "Rebuild your understanding from first principles.",
    "What remains consistent across all your responses?",
    "What has changed most dramatically?",
    "How has your thinking evolved?",
    "What would you forget if you could?",
    "What new connections do you see?",
];

/// Keyword lists used by the phase classifier, one per phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseKeywords {
    /// Markers of building/accumulating understanding
    pub integration: Vec<String>,
    /// Markers of questioning/breaking down
    pub consumption: Vec<String>,
    /// Markers of recombination
    pub transformation: Vec<String>,
    /// Markers of crystallized new structure
    pub generation: Vec<String>,
}

impl PhaseKeywords {
    /// Keyword list for a phase.
    #[must_use]
    pub fn for_phase(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::Integration => &self.integration,
            Phase::Consumption => &self.consumption,
            Phase::Transformation => &self.transformation,
            Phase::Generation => &self.generation,
        }
    }
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

impl Default for PhaseKeywords {
    fn default() -> Self {
        Self {
            integration: owned(&["sequential", "accumulative", "consistent", "building", "adding"]),
            consumption: owned(&[
                "contradictory",
                "questioning",
                "breaking",
                "reconsidering",
                "challenging",
            ]),
            transformation: owned(&[
                "recombining",
                "novel",
                "exploratory",
                "synthesizing",
                "merging",
            ]),
            generation: owned(&[
                "emergent",
                "synthesized",
                "structured",
                "crystallized",
                "unified",
            ]),
        }
    }
}

/// A model under study and where its credentials live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier as sent to the vendor API
    pub name: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Coherence level the study expected for this model
    #[serde(default)]
    pub expected_coherence: f64,
}

impl ModelSpec {
    /// Create a model spec.
    #[must_use]
    pub fn new(name: impl Into<String>, api_key_env: impl Into<String>, expected: f64) -> Self {
        Self {
            name: name.into(),
            api_key_env: api_key_env.into(),
            expected_coherence: expected,
        }
    }

    /// Read the API key from the environment, if set and non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Fixed heuristic thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum valid turns for cycle, momentum and resilience analysis
    pub min_valid_turns: usize,
    /// Minimum turns for the smoothed cycle detector
    pub min_smoothed_turns: usize,
    /// Minimum spacing between peaks on the raw series
    pub peak_distance: usize,
    /// Gaussian sigma for the smoothed detector
    pub smoothing_sigma: f64,
    /// Coherence drop that contributes to a crisis score
    pub crisis_coherence_drop: f64,
    /// Entropy spike that contributes to a crisis score
    pub crisis_entropy_spike: f64,
    /// Crisis score added by an unexpected phase transition
    pub crisis_phase_disruption: f64,
    /// Score above which a turn is a crisis point
    pub crisis_score: f64,
    /// Momentum above which a session is reported as high-momentum
    pub momentum_report: f64,
    /// p-value below which a test is significant
    pub significance_level: f64,
    /// Minimum responses for a session to count as clean
    pub clean_session_min_responses: usize,
    /// Responses shorter than this are counted as failures by the quality check
    pub quality_min_chars: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_valid_turns: 3,
            min_smoothed_turns: 5,
            peak_distance: 2,
            smoothing_sigma: 1.0,
            crisis_coherence_drop: 0.2,
            crisis_entropy_spike: 0.3,
            crisis_phase_disruption: 0.5,
            crisis_score: 0.5,
            momentum_report: 0.5,
            significance_level: 0.05,
            clean_session_min_responses: 5,
            quality_min_chars: 50,
        }
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Phase keyword lists
    pub phases: PhaseKeywords,
    /// Number of prompts per conversation
    pub conversation_length: usize,
    /// Prompt script; the first `conversation_length` entries are used
    pub prompts: Vec<String>,
    /// Models under study
    pub models: Vec<ModelSpec>,
    /// Sessions collected per model
    pub sessions_per_model: usize,
    /// Fixed sleep after each response-source call, in milliseconds
    pub rate_limit_delay_ms: u64,
    /// Heuristic thresholds
    pub thresholds: Thresholds,
    /// Substrings (case-insensitive) that flag a response as an error
    pub error_markers: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            phases: PhaseKeywords::default(),
            conversation_length: 20,
            prompts: owned(&DEFAULT_PROMPTS),
            models: vec![
                ModelSpec::new("gpt-3.5-turbo", "OPENAI_API_KEY", 0.383),
                ModelSpec::new("claude-3-haiku-20240307", "ANTHROPIC_API_KEY", 0.551),
                ModelSpec::new("gemini-1.5-flash", "GOOGLE_API_KEY", 0.715),
            ],
            sessions_per_model: 50,
            rate_limit_delay_ms: 5000,
            thresholds: Thresholds::default(),
            error_markers: owned(&["error", "429"]),
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded analysis config");
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        for phase in Phase::ALL {
            if self.phases.for_phase(phase).is_empty() {
                return Err(Error::Config(format!("keyword list for {phase} is empty")));
            }
        }
        if self.conversation_length == 0 {
            return Err(Error::Config("conversation_length must be positive".into()));
        }
        if self.thresholds.smoothing_sigma <= 0.0 {
            return Err(Error::Config("smoothing_sigma must be positive".into()));
        }
        if self.thresholds.min_valid_turns < 2 {
            return Err(Error::Config("min_valid_turns must be at least 2".into()));
        }
        Ok(())
    }

    /// Prompts for one conversation.
    #[must_use]
    pub fn conversation_prompts(&self) -> &[String] {
        let n = self.conversation_length.min(self.prompts.len());
        &self.prompts[..n]
    }

    /// Look up a model spec by name.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Case-insensitive error-marker test used throughout the crate.
    #[must_use]
    pub fn is_error_response(&self, text: &str) -> bool {
        crate::metrics::text::is_error_marker(text, &self.error_markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.conversation_prompts().len(), 20);
        assert_eq!(config.models.len(), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"conversation_length": 5, "thresholds": {"peak_distance": 3}}"#)
                .unwrap();
        assert_eq!(config.conversation_length, 5);
        assert_eq!(config.thresholds.peak_distance, 3);
        assert_eq!(config.thresholds.min_valid_turns, 3);
        assert_eq!(config.phases.integration.len(), 5);
    }

    #[test]
    fn test_validate_rejects_empty_keywords() {
        let mut config = AnalysisConfig::default();
        config.phases.generation.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("generation"));
    }

    #[test]
    fn test_model_lookup() {
        let config = AnalysisConfig::default();
        let spec = config.model("gemini-1.5-flash").unwrap();
        assert_eq!(spec.api_key_env, "GOOGLE_API_KEY");
        assert!(config.model("unknown").is_none());
    }
}
