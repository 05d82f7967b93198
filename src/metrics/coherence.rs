//! Interchangeable coherence heuristics
//!
//! None of these is a principled measurement. They are kept side by side so
//! one analysis can be rerun under a different formula without duplicating
//! the pipeline.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::text::{
    is_error_marker, jaccard_sets, lexical_diversity, normalized_entropy, word_set, words,
};
use crate::stats;
use crate::{Error, Outcome};

/// A coherence heuristic: `score(text, history) -> [0, 1]`.
///
/// Implementations return 0.0 for empty or error-marked text.
pub trait CoherenceStrategy: Send + Sync {
    /// Short identifier used in reports.
    fn name(&self) -> &'static str;

    /// Score `text` given the responses that preceded it.
    fn score(&self, text: &str, history: &[String]) -> f64;
}

fn default_markers() -> Vec<String> {
    vec!["error".to_string(), "429".to_string()]
}

/// Sentence-count proxy: `min(1, pieces * avg_words / 100)`.
///
/// Every piece of a split on `'.'` is counted, blanks included, so longer
/// answers saturate near 1.0. Kept for comparison with older result files.
#[derive(Debug, Clone)]
pub struct SentenceProxy {
    markers: Vec<String>,
}

/// Type-token ratio of the response alone.
#[derive(Debug, Clone)]
pub struct LexicalDiversity {
    markers: Vec<String>,
}

/// `0.3·ttr + 0.4·jaccard(previous) + 0.3·min(1, words/100)`.
#[derive(Debug, Clone)]
pub struct JaccardBlend {
    markers: Vec<String>,
}

/// Four-component blend of diversity, windowed consistency, entropy and
/// topic drift.
#[derive(Debug, Clone)]
pub struct SemanticCoherence {
    markers: Vec<String>,
}

/// Normalized Shannon entropy of word frequencies.
#[derive(Debug, Clone)]
pub struct EntropyCoherence {
    markers: Vec<String>,
}

macro_rules! with_markers {
    ($($ty:ident),*) => {$(
        impl $ty {
            /// Create the strategy with explicit error markers.
            #[must_use]
            pub fn new(markers: Vec<String>) -> Self {
                Self { markers }
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new(default_markers())
            }
        }
    )*};
}

with_markers!(
    SentenceProxy,
    LexicalDiversity,
    JaccardBlend,
    SemanticCoherence,
    EntropyCoherence
);

#[allow(clippy::cast_precision_loss)]
impl CoherenceStrategy for SentenceProxy {
    fn name(&self) -> &'static str {
        "sentence"
    }

    fn score(&self, text: &str, _history: &[String]) -> f64 {
        if is_error_marker(text, &self.markers) {
            return 0.0;
        }
        let pieces: Vec<&str> = text.split('.').collect();
        let lengths: Vec<f64> = pieces
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.split_whitespace().count() as f64)
            .collect();
        if lengths.is_empty() {
            return 0.0;
        }
        let avg_length = stats::mean(&lengths);
        (pieces.len() as f64 * avg_length / 100.0).clamp(0.0, 1.0)
    }
}

impl CoherenceStrategy for LexicalDiversity {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn score(&self, text: &str, _history: &[String]) -> f64 {
        if is_error_marker(text, &self.markers) {
            return 0.0;
        }
        lexical_diversity(text).clamp(0.0, 1.0)
    }
}

#[allow(clippy::cast_precision_loss)]
impl CoherenceStrategy for JaccardBlend {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn score(&self, text: &str, history: &[String]) -> f64 {
        if is_error_marker(text, &self.markers) {
            return 0.0;
        }
        let tokens = words(text);
        let diversity = lexical_diversity(text);
        let consistency = history
            .last()
            .map_or(1.0, |prev| jaccard_sets(&word_set(prev), &word_set(text)));
        let quality = (tokens.len() as f64 / 100.0).min(1.0);
        (diversity * 0.3 + consistency * 0.4 + quality * 0.3).clamp(0.0, 1.0)
    }
}

#[allow(clippy::cast_precision_loss)]
impl CoherenceStrategy for SemanticCoherence {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn score(&self, text: &str, history: &[String]) -> f64 {
        if is_error_marker(text, &self.markers) {
            return 0.0;
        }
        let current = word_set(text);
        if current.is_empty() {
            return 0.0;
        }
        let diversity = lexical_diversity(text);

        let mut consistency = Vec::new();
        if !history.is_empty() {
            let window = history.len().min(3);
            for prev in &history[history.len() - window..] {
                let prev_words = word_set(prev);
                if !prev_words.is_empty() {
                    consistency.push(jaccard_sets(&current, &prev_words));
                }
            }
            if history.len() > 3 {
                let first = word_set(&history[0]);
                if !first.is_empty() {
                    consistency.push(jaccard_sets(&current, &first) * 0.5);
                }
            }
        }
        let avg_consistency = if consistency.is_empty() {
            0.5
        } else {
            stats::mean(&consistency)
        };

        let drift_penalty = if history.len() > 5 {
            let first: HashSet<String> = word_set(&history[0]);
            if first.is_empty() {
                0.0
            } else {
                let overlap = first.intersection(&current).count() as f64;
                (0.5 - overlap / first.len() as f64).max(0.0)
            }
        } else {
            0.0
        };

        (diversity * 0.2
            + avg_consistency * 0.4
            + normalized_entropy(text) * 0.2
            + (1.0 - drift_penalty) * 0.2)
            .clamp(0.0, 1.0)
    }
}

impl CoherenceStrategy for EntropyCoherence {
    fn name(&self) -> &'static str {
        "entropy"
    }

    fn score(&self, text: &str, _history: &[String]) -> f64 {
        if is_error_marker(text, &self.markers) {
            return 0.0;
        }
        normalized_entropy(text).clamp(0.0, 1.0)
    }
}

/// Selector for the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// [`SentenceProxy`]
    Sentence,
    /// [`LexicalDiversity`]
    Lexical,
    /// [`JaccardBlend`]
    Jaccard,
    /// [`SemanticCoherence`]
    #[default]
    Semantic,
    /// [`EntropyCoherence`]
    Entropy,
}

impl StrategyKind {
    /// All selectable strategies.
    pub const ALL: [Self; 5] = [
        Self::Sentence,
        Self::Lexical,
        Self::Jaccard,
        Self::Semantic,
        Self::Entropy,
    ];

    /// Identifier accepted by `FromStr`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sentence => "sentence",
            Self::Lexical => "lexical",
            Self::Jaccard => "jaccard",
            Self::Semantic => "semantic",
            Self::Entropy => "entropy",
        }
    }

    /// Instantiate the strategy with the given error markers.
    #[must_use]
    pub fn build(self, markers: &[String]) -> Box<dyn CoherenceStrategy> {
        let markers = markers.to_vec();
        match self {
            Self::Sentence => Box::new(SentenceProxy::new(markers)),
            Self::Lexical => Box::new(LexicalDiversity::new(markers)),
            Self::Jaccard => Box::new(JaccardBlend::new(markers)),
            Self::Semantic => Box::new(SemanticCoherence::new(markers)),
            Self::Entropy => Box::new(EntropyCoherence::new(markers)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "unknown coherence strategy '{s}' \
                     (expected sentence, lexical, jaccard, semantic or entropy)"
                ))
            })
    }
}

/// Session-level coherence from response-length consistency: `1 / (1 + cv)`
/// over the word counts of valid responses.
///
/// Returns [`Outcome::Insufficient`] with fewer than `min_valid` responses,
/// or fewer than `min_valid` non-error ones.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn robust_coherence(
    responses: &[String],
    markers: &[String],
    min_valid: usize,
) -> Outcome<f64> {
    if responses.len() < min_valid {
        return Outcome::Insufficient {
            required: min_valid,
            available: responses.len(),
        };
    }
    let lengths: Vec<f64> = responses
        .iter()
        .filter(|r| !is_error_marker(r, markers))
        .map(|r| r.split_whitespace().count() as f64)
        .collect();
    Outcome::require(min_valid, lengths.len(), || {
        let mean = stats::mean(&lengths);
        if mean > 0.0 {
            1.0 / (1.0 + stats::std_dev(&lengths) / mean)
        } else {
            0.5
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_all_strategies_zero_on_error_and_empty() {
        for kind in StrategyKind::ALL {
            let strategy = kind.build(&default_markers());
            assert!(strategy.score("Error 429", &[]).abs() < f64::EPSILON, "{kind}");
            assert!(strategy.score("", &[]).abs() < f64::EPSILON, "{kind}");
        }
    }

    #[test]
    fn test_sentence_proxy_saturates() {
        let s = SentenceProxy::default();
        // 2 pieces ("a b c", " d e"), avg 2.5 words
        assert!((s.score("a b c. d e", &[]) - 0.05).abs() < 1e-12);
        let long = "word ".repeat(120);
        assert!((s.score(&long, &[]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_jaccard_blend_first_turn_consistency_is_one() {
        let s = JaccardBlend::default();
        let score = s.score("a b c d", &[]);
        assert!((score - (0.3 + 0.4 + 0.3 * 0.04)).abs() < 1e-12);
        let with_prev = s.score("a b c d", &history(&["x y"]));
        assert!((with_prev - (0.3 + 0.3 * 0.04)).abs() < 1e-12);
    }

    #[test]
    fn test_semantic_without_history() {
        let s = SemanticCoherence::default();
        // ttr 1, consistency default 0.5, normalized entropy 1, no drift
        let score = s.score("a b c d", &[]);
        assert!((score - (0.2 + 0.2 + 0.2 + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_semantic_drift_penalty_applies_after_five_turns() {
        let s = SemanticCoherence::default();
        let past = history(&["alpha beta", "x", "x", "x", "x", "x"]);
        let score = s.score("gamma delta", &past);
        // consistency: three zeros from window plus 0 from first -> 0
        // drift penalty 0.5
        let expected = 0.2 + 0.0 + 0.2 + 0.5 * 0.2;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_strategy_kind_parse() {
        assert_eq!("Semantic".parse::<StrategyKind>().unwrap(), StrategyKind::Semantic);
        assert!("cosine".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::default(), StrategyKind::Semantic);
    }

    #[test]
    fn test_robust_coherence_skips_errors() {
        let responses = history(&["A A B", "A B C", "Error 429", "B C D"]);
        let outcome = robust_coherence(&responses, &default_markers(), 3);
        assert_eq!(outcome.measured().copied(), Some(1.0));

        let mostly_errors = history(&["A", "Error 429", "Error 500"]);
        assert_eq!(
            robust_coherence(&mostly_errors, &default_markers(), 3),
            Outcome::Insufficient {
                required: 3,
                available: 1
            }
        );
    }
}
