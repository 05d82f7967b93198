//! Aggregation and reporting over collections of sessions
//!
//! All entry points take sessions grouped by model (see
//! [`SessionStore::by_model`](crate::session::SessionStore::by_model)) or a
//! flat slice, and return plain serde structs. [`render`] turns them into
//! text and CSV.
//!
//! - [`aggregate`]: model comparison, ANOVA, correlation, periodicity
//! - [`clean`]: the same numbers restricted to error-free sessions
//! - [`partial`]: signatures and evidence that survive missing data
//! - [`transformation`]: how rarely and where the transformation phase wins
//! - [`quality`]: error-response counts
//! - [`reanalysis`]: re-scoring stored transcripts, with a before/after summary

pub mod aggregate;
pub mod clean;
pub mod partial;
pub mod quality;
pub mod reanalysis;
pub mod render;
pub mod transformation;

pub use aggregate::{
    compare_models, phase_distribution_test, run_statistical_tests, ModelSummary,
    PhaseDistributionTest, StatisticalTests,
};
pub use clean::{analyze_clean, CleanAnalysis};
pub use partial::{aggregate_evidence, signatures, ModelSignature, PartialEvidence};
pub use quality::{error_counts, QualityReport};
pub use reanalysis::{ReanalysisSummary, REANALYZED_SUFFIX};
pub use render::write_results;
pub use transformation::{Strategy, TransformationReport};
