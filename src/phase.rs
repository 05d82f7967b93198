//! Phases and keyword-based phase classification
//!
//! A turn's phase is the arg-max of its phase-marker scores. Scores are
//! keyword hit ratios and are not normalized across phases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PhaseKeywords;
use crate::Error;

/// One of the four ouroboros phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Building up consistent understanding
    Integration,
    /// Questioning and breaking down prior understanding
    Consumption,
    /// Recombining pieces into something new
    Transformation,
    /// Crystallizing a new structure
    Generation,
}

impl Phase {
    /// All phases in canonical order. Arg-max ties resolve to the earliest.
    pub const ALL: [Self; 4] = [
        Self::Integration,
        Self::Consumption,
        Self::Transformation,
        Self::Generation,
    ];

    /// Label used when no phase has a positive score.
    pub const DEFAULT: Self = Self::Integration;

    /// Position in the canonical order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Integration => 0,
            Self::Consumption => 1,
            Self::Transformation => 2,
            Self::Generation => 3,
        }
    }

    /// Expected successor in the cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Integration => Self::Consumption,
            Self::Consumption => Self::Transformation,
            Self::Transformation => Self::Generation,
            Self::Generation => Self::Integration,
        }
    }

    /// Lowercase label as stored in session files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integration => "integration",
            Self::Consumption => "consumption",
            Self::Transformation => "transformation",
            Self::Generation => "generation",
        }
    }

    /// Three-letter abbreviation for matrix output.
    #[must_use]
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::Integration => "int",
            Self::Consumption => "con",
            Self::Transformation => "tra",
            Self::Generation => "gen",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("unknown phase label: {s}")))
    }
}

/// Per-phase marker scores for one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseScores {
    /// Integration score
    pub integration: f64,
    /// Consumption score
    pub consumption: f64,
    /// Transformation score
    pub transformation: f64,
    /// Generation score
    pub generation: f64,
}

impl PhaseScores {
    /// Score for one phase.
    #[must_use]
    pub const fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Integration => self.integration,
            Phase::Consumption => self.consumption,
            Phase::Transformation => self.transformation,
            Phase::Generation => self.generation,
        }
    }

    /// Set the score for one phase.
    pub fn set(&mut self, phase: Phase, score: f64) {
        match phase {
            Phase::Integration => self.integration = score,
            Phase::Consumption => self.consumption = score,
            Phase::Transformation => self.transformation = score,
            Phase::Generation => self.generation = score,
        }
    }

    /// Iterate `(phase, score)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, f64)> + '_ {
        Phase::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    /// Sum of all scores.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, s)| s).sum()
    }

    /// True when no phase has a positive score.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, s)| s <= 0.0)
    }

    /// Arg-max phase. Ties go to the earliest phase in canonical order, so
    /// all-zero scores yield [`Phase::DEFAULT`].
    #[must_use]
    pub fn dominant(&self) -> Phase {
        let mut best = Phase::DEFAULT;
        let mut best_score = self.get(best);
        for (phase, score) in self.iter().skip(1) {
            if score > best_score {
                best = phase;
                best_score = score;
            }
        }
        best
    }
}

/// Keyword-counting phase classifier.
#[derive(Debug, Clone)]
pub struct PhaseClassifier {
    keywords: [Vec<String>; 4],
}

impl PhaseClassifier {
    /// Build a classifier from configured keyword lists.
    #[must_use]
    pub fn new(keywords: &PhaseKeywords) -> Self {
        let lower = |phase: Phase| {
            keywords
                .for_phase(phase)
                .iter()
                .map(|k| k.to_lowercase())
                .collect::<Vec<_>>()
        };
        Self {
            keywords: Phase::ALL.map(lower),
        }
    }

    /// Score `text`: for each phase, the fraction of its keywords that occur
    /// as substrings of the lowercased text.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn classify(&self, text: &str) -> PhaseScores {
        let lowered = text.to_lowercase();
        let mut scores = PhaseScores::default();
        for phase in Phase::ALL {
            let markers = &self.keywords[phase.index()];
            if markers.is_empty() {
                continue;
            }
            let hits = markers.iter().filter(|m| lowered.contains(m.as_str())).count();
            scores.set(phase, hits as f64 / markers.len() as f64);
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PhaseClassifier {
        PhaseClassifier::new(&PhaseKeywords::default())
    }

    #[test]
    fn test_no_keywords_yields_zero_scores_and_default() {
        let scores = classifier().classify("The weather is pleasant today.");
        assert!(scores.is_empty());
        assert!((scores.total()).abs() < f64::EPSILON);
        assert_eq!(scores.dominant(), Phase::Integration);
    }

    #[test]
    fn test_classify_counts_keyword_ratio() {
        let scores =
            classifier().classify("A Novel and EXPLORATORY merging of ideas, building slowly.");
        assert!((scores.transformation - 0.6).abs() < 1e-12);
        assert!((scores.integration - 0.2).abs() < 1e-12);
        assert_eq!(scores.dominant(), Phase::Transformation);
    }

    #[test]
    fn test_dominant_tie_prefers_canonical_order() {
        let scores = PhaseScores {
            integration: 0.0,
            consumption: 0.4,
            transformation: 0.0,
            generation: 0.4,
        };
        assert_eq!(scores.dominant(), Phase::Consumption);
    }

    #[test]
    fn test_cycle_successor_wraps() {
        assert_eq!(Phase::Generation.next(), Phase::Integration);
        assert_eq!(Phase::Integration.next(), Phase::Consumption);
    }

    #[test]
    fn test_phase_scores_json_shape() {
        let json = r#"{"integration": 0.8, "generation": 0.1}"#;
        let scores: PhaseScores = serde_json::from_str(json).unwrap();
        assert!((scores.consumption).abs() < f64::EPSILON);
        assert_eq!(scores.dominant(), Phase::Integration);
        assert_eq!("Transformation".parse::<Phase>().unwrap(), Phase::Transformation);
    }
}
