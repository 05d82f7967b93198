//! # Ouroboros Analysis: Cycle Detection over LLM Conversations
//!
//! Scores each turn of a scripted multi-turn conversation with a language
//! model for coherence, entropy and four keyword-defined phases
//! (integration, consumption, transformation, generation), then looks for
//! cycles in the coherence sequence and compares models statistically.
//!
//! ## Pipeline
//!
//! - **Collect**: [`collect::ConversationRunner`] drives a
//!   [`collect::ResponseSource`] through the prompt script
//! - **Measure**: [`metrics::MetricCalculator`] with an injectable
//!   [`metrics::CoherenceStrategy`]
//! - **Detect**: [`cycles::CycleDetector`] finds peaks, troughs and phase
//!   transitions
//! - **Report**: [`report`] aggregates across sessions and models
//!
//! Computations with a minimum-data requirement return [`Outcome`] rather
//! than an error.
//!
//! ## Example Usage
//!
//! ```rust
//! use ouroboros_analysis::config::AnalysisConfig;
//! use ouroboros_analysis::report::compare_models;
//! use ouroboros_analysis::synthetic::{ModelProfile, SyntheticGenerator, DEFAULT_SEED};
//!
//! let config = AnalysisConfig::default();
//! let mut generator = SyntheticGenerator::new(DEFAULT_SEED, &config);
//! let by_model = generator.simulate(&ModelProfile::presets(), 5, 20);
//!
//! for summary in compare_models(&by_model) {
//!     println!("{}: {:.2} cycles", summary.model, summary.avg_cycles);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod collect;
pub mod config;
pub mod cycles;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod phase;
pub mod report;
pub mod session;
pub mod stats;
pub mod synthetic;

pub use error::{Error, Result};
pub use outcome::Outcome;
