//! Text metrics and coherence heuristics
//!
//! - [`text`]: word-level primitives (diversity, Jaccard, entropy)
//! - [`coherence`]: the [`CoherenceStrategy`] seam and its implementations
//! - [`calculator`]: turns a response plus history into a metric record

pub mod calculator;
pub mod coherence;
pub mod text;

pub use calculator::MetricCalculator;
pub use coherence::{robust_coherence, CoherenceStrategy, StrategyKind};
