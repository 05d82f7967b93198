//! Re-scoring stored transcripts with a different coherence strategy
//!
//! Each input file is re-measured turn by turn, re-run through the cycle
//! detector and written next to the original as `<stem>_reanalyzed.json`.
//! Files that already carry that suffix are outputs of an earlier run and
//! are never taken as input.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aggregate::{phase_distribution_test, PhaseDistributionTest};
use crate::config::AnalysisConfig;
use crate::cycles::CycleDetector;
use crate::metrics::MetricCalculator;
use crate::session::Session;
use crate::stats;

/// File-stem suffix of re-scored outputs.
pub const REANALYZED_SUFFIX: &str = "_reanalyzed";

/// True when `path` is the output of an earlier re-scoring run.
#[must_use]
pub fn is_reanalysis_output(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem.to_string_lossy().ends_with(REANALYZED_SUFFIX))
}

/// Where the re-scored version of `file` is written: `out_dir` when given,
/// otherwise the directory of `file`.
#[must_use]
pub fn output_path(file: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = file
        .file_stem()
        .map_or_else(|| "sessions".into(), |s| s.to_string_lossy().into_owned());
    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| file.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}{REANALYZED_SUFFIX}.json"))
}

/// Recompute metrics, cycles and statistics from each session's responses.
#[must_use]
pub fn rescore(
    sessions: Vec<Session>,
    calculator: &MetricCalculator,
    detector: &CycleDetector,
) -> Vec<Session> {
    sessions
        .into_iter()
        .map(|session| {
            let metrics = calculator.measure_all(session.responses());
            detector.analyze(session.with_analysis(metrics, None, None))
        })
        .collect()
}

/// Mean, spread and extremes of a set of coherence values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoherenceSummary {
    /// Mean coherence
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

impl CoherenceSummary {
    /// Summarize the finite coherence values of `sessions`, or `None` when
    /// there are none.
    #[must_use]
    pub fn of(sessions: &[Session]) -> Option<Self> {
        let values: Vec<f64> = sessions
            .iter()
            .flat_map(Session::coherence_series)
            .filter(|c| c.is_finite())
            .collect();
        let (min, max) = stats::min_max(&values)?;
        Some(Self {
            mean: stats::mean(&values),
            std: stats::std_dev(&values),
            min,
            max,
        })
    }
}

/// Before/after comparison for one re-scored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReanalysisSummary {
    /// Input file
    pub file: String,
    /// Coherence strategy used for re-scoring
    pub strategy: String,
    /// Sessions in the file
    pub n_sessions: usize,
    /// Re-scored turns
    pub n_responses: usize,
    /// Coherence as stored in the input
    pub original: Option<CoherenceSummary>,
    /// Coherence after re-scoring
    pub rescored: Option<CoherenceSummary>,
    /// Dominant phases of the re-scored turns
    pub phases: PhaseDistributionTest,
    /// Chi-square p-value below the significance level
    pub non_uniform: bool,
}

/// Compare the stored and re-scored versions of one file.
#[must_use]
pub fn summarize(
    file: &Path,
    strategy: &str,
    original: &[Session],
    rescored: &[Session],
    config: &AnalysisConfig,
) -> ReanalysisSummary {
    let phases = phase_distribution_test(rescored);
    let non_uniform = phases
        .chi_square
        .is_some_and(|c| c.p_value < config.thresholds.significance_level);
    let summary = ReanalysisSummary {
        file: file.display().to_string(),
        strategy: strategy.to_string(),
        n_sessions: rescored.len(),
        n_responses: rescored.iter().map(|s| s.metrics().len()).sum(),
        original: CoherenceSummary::of(original),
        rescored: CoherenceSummary::of(rescored),
        phases,
        non_uniform,
    };
    debug!(
        file = %summary.file,
        sessions = summary.n_sessions,
        responses = summary.n_responses,
        "reanalysis summarized"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StrategyKind;
    use crate::phase::Phase;
    use crate::session::MetricRecord;

    fn transcript() -> Session {
        let responses: Vec<String> = [
            "We integrate and combine the sequential foundation step by step",
            "Then we consume and break down and analyze each piece",
            "Questioning everything, the paradox transforms into something new",
            "Finally we generate and create a novel emergent synthesis",
            "Integrating again, we combine the unified structure",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        let stored = (0..responses.len())
            .map(|i| MetricRecord::builder(i, 0.9).build())
            .collect();
        Session::builder("gpt-3.5-turbo", "0")
            .responses(responses)
            .metrics(stored)
            .build()
    }

    #[test]
    fn test_output_naming_and_detection() {
        let file = Path::new("data/ouroboros_gpt.json");
        let target = output_path(file, None);
        assert_eq!(target, Path::new("data/ouroboros_gpt_reanalyzed.json"));
        assert!(is_reanalysis_output(&target));
        assert!(!is_reanalysis_output(file));
        assert_eq!(
            output_path(file, Some(Path::new("out"))),
            Path::new("out/ouroboros_gpt_reanalyzed.json")
        );
    }

    #[test]
    fn test_rescore_replaces_metrics_and_cycles() {
        let config = AnalysisConfig::default();
        let calculator =
            MetricCalculator::new(&config, StrategyKind::Lexical.build(&config.error_markers));
        let rescored = rescore(vec![transcript()], &calculator, &CycleDetector::new(&config));

        assert_eq!(rescored.len(), 1);
        assert_eq!(rescored[0].metrics().len(), 5);
        assert!(rescored[0].cycles().is_some());
        assert!(rescored[0].statistics().is_some());
        assert_ne!(rescored[0].coherence_series(), vec![0.9; 5]);
    }

    #[test]
    fn test_summarize_before_and_after() {
        let config = AnalysisConfig::default();
        let original = vec![transcript()];
        let calculator =
            MetricCalculator::new(&config, StrategyKind::Semantic.build(&config.error_markers));
        let rescored = rescore(original.clone(), &calculator, &CycleDetector::new(&config));

        let summary = summarize(
            Path::new("a.json"),
            calculator.strategy_name(),
            &original,
            &rescored,
            &config,
        );
        assert_eq!(summary.n_sessions, 1);
        assert_eq!(summary.n_responses, 5);
        let before = summary.original.unwrap();
        assert!((before.mean - 0.9).abs() < 1e-12);
        assert!(before.std.abs() < 1e-12);
        let after = summary.rescored.unwrap();
        assert!(after.min <= after.mean && after.mean <= after.max);
        let counted: usize = summary.phases.counts.values().sum();
        assert_eq!(counted, 5);
        assert!(summary.phases.counts.contains_key(&Phase::Generation));
    }

    #[test]
    fn test_missing_original_coherence_is_ignored() {
        let session = Session::builder("m", "0")
            .metrics(vec![
                MetricRecord::builder(0, f64::NAN).build(),
                MetricRecord::builder(1, 0.4).build(),
            ])
            .build();
        let summary = CoherenceSummary::of(&[session]).unwrap();
        assert!((summary.mean - 0.4).abs() < 1e-12);
        assert!(CoherenceSummary::of(&[]).is_none());
    }
}
