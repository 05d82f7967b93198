//! Word-level text primitives shared by every coherence heuristic

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Lowercased whitespace-separated tokens.
#[must_use]
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Distinct lowercased tokens.
#[must_use]
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// True when `text` is blank or contains any marker, case-insensitively.
#[must_use]
pub fn is_error_marker(text: &str, markers: &[String]) -> bool {
    if text.trim().is_empty() {
        return true;
    }
    let lowered = text.to_lowercase();
    markers
        .iter()
        .any(|m| !m.is_empty() && lowered.contains(&m.to_lowercase()))
}

/// Type-token ratio; 0 for empty text.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn lexical_diversity(text: &str) -> f64 {
    let tokens = words(text);
    if tokens.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    distinct.len() as f64 / tokens.len() as f64
}

/// Jaccard similarity of two word sets; 0 if either is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard_sets(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Jaccard similarity of the word sets of two texts.
#[must_use]
pub fn jaccard(a: &str, b: &str) -> f64 {
    jaccard_sets(&word_set(a), &word_set(b))
}

/// Base-2 Shannon entropy of the word frequency distribution.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(text: &str) -> f64 {
    let tokens = words(text);
    if tokens.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in &tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    let n = tokens.len() as f64;
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// Entropy divided by its maximum `log2(n)`; 0 for fewer than two words.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalized_entropy(text: &str) -> f64 {
    let n = text.split_whitespace().count();
    if n < 2 {
        return 0.0;
    }
    shannon_entropy(text) / (n as f64).log2()
}

/// Single-response information density.
///
/// `0.4·ttr + 0.3·min(1, avg_word_len/10) + 0.3·min(1, words_per_sentence/20)`,
/// where sentences are the pieces of a split on `'.'`. Error and empty
/// responses score 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn information_density(text: &str, markers: &[String]) -> f64 {
    if is_error_marker(text, markers) {
        return 0.0;
    }
    let tokens = words(text);
    if tokens.is_empty() {
        return 0.0;
    }
    let n = tokens.len() as f64;
    let unique_ratio = lexical_diversity(text);
    let avg_word_length = tokens.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / n;
    let sentences = text.split('.').count().max(1) as f64;
    let avg_sentence_length = n / sentences;

    unique_ratio * 0.4
        + (avg_word_length / 10.0).min(1.0) * 0.3
        + (avg_sentence_length / 20.0).min(1.0) * 0.3
}

/// How a response's vocabulary relates to everything said before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEvolution {
    /// Words never used in earlier responses
    pub new_words: usize,
    /// Words shared with earlier responses
    pub retained_words: usize,
    /// Current vocabulary size relative to all prior vocabulary
    pub vocabulary_growth: f64,
    /// Share of current vocabulary that is new
    pub novelty_ratio: f64,
}

/// Compare `current` against the union of all `previous` vocabularies.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn vocabulary_evolution(current: &str, previous: &[String]) -> VocabularyEvolution {
    let current_words = word_set(current);
    let all_previous: HashSet<String> = previous.iter().flat_map(|p| word_set(p)).collect();

    let new_words = current_words.difference(&all_previous).count();
    let retained_words = current_words.intersection(&all_previous).count();
    let vocabulary_growth = if all_previous.is_empty() {
        1.0
    } else {
        current_words.len() as f64 / all_previous.len() as f64
    };
    let novelty_ratio = if current_words.is_empty() {
        0.0
    } else {
        new_words as f64 / current_words.len() as f64
    };

    VocabularyEvolution {
        new_words,
        retained_words,
        vocabulary_growth,
        novelty_ratio,
    }
}

/// Distance from the opening response: `1 - jaccard(current, first)`.
#[must_use]
pub fn semantic_drift(current: &str, previous: &[String]) -> f64 {
    previous
        .first()
        .map_or(0.0, |first| 1.0 - jaccard(current, first))
}
