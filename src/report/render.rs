//! Plain-text and CSV rendering
//!
//! Each report is a small borrowed wrapper implementing [`fmt::Display`], so
//! callers can print it directly or collect it into a file.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::aggregate::{ModelSummary, StatisticalTests};
use super::clean::CleanAnalysis;
use super::partial::{ModelSignature, PartialEvidence};
use super::quality::QualityReport;
use super::reanalysis::ReanalysisSummary;
use super::transformation::{Strategy, TransformationReport};
use crate::phase::Phase;
use crate::Result;

const RULE: &str = "============================================================";

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}"))
}

/// Model comparison table.
#[derive(Debug, Clone, Copy)]
pub struct ModelComparison<'a>(pub &'a [ModelSummary]);

impl fmt::Display for ModelComparison<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MODEL COMPARISON")?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "{:<28} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10} {:>14}",
            "model", "sessions", "cycles", "std", "amplitude", "trans/turn", "coherence", "dominant"
        )?;
        for s in self.0 {
            writeln!(
                f,
                "{:<28} {:>8} {:>8.2} {:>8.2} {:>10.3} {:>10.3} {:>10.3} {:>14}",
                s.model,
                s.sessions_analyzed,
                s.avg_cycles,
                s.std_cycles,
                s.avg_cycle_amplitude,
                s.phase_transition_rate,
                s.avg_coherence,
                s.dominant_phase()
            )?;
        }
        Ok(())
    }
}

/// Statistical-test section.
#[derive(Debug, Clone, Copy)]
pub struct StatisticalReport<'a>(pub &'a StatisticalTests);

impl fmt::Display for StatisticalReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tests = self.0;
        writeln!(f, "STATISTICAL TESTS")?;
        writeln!(f, "{RULE}")?;
        match &tests.anova_cycles {
            Some(anova) => writeln!(
                f,
                "Cycle count ANOVA: F({}, {}) = {:.3}, p = {:.4}{}",
                anova.result.df_between,
                anova.result.df_within,
                anova.result.f_statistic,
                anova.result.p_value,
                if anova.significant { " (significant)" } else { "" }
            )?,
            None => writeln!(f, "Cycle count ANOVA: not enough models")?,
        }
        writeln!(f, "\nPosition-coherence correlation:")?;
        for (model, c) in &tests.position_coherence_correlation {
            writeln!(
                f,
                "  {model}: r = {:.3} ± {:.3} over {} sessions",
                c.mean_correlation, c.std_correlation, c.sessions
            )?;
        }
        writeln!(f, "\nPeriodicity:")?;
        for (model, p) in &tests.periodicity {
            writeln!(
                f,
                "  {model}: mean period {:.2} ± {:.2}, mode {}",
                p.mean_period, p.std_period, p.modal_period
            )?;
        }
        Ok(())
    }
}

/// Headline findings derived from the model summaries.
#[derive(Debug, Clone, Copy)]
pub struct KeyFindings<'a>(pub &'a [ModelSummary]);

impl fmt::Display for KeyFindings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "KEY FINDINGS")?;
        writeln!(f, "{RULE}")?;
        let highest = self
            .0
            .iter()
            .max_by(|a, b| a.avg_coherence.total_cmp(&b.avg_coherence));
        let most_regular = self
            .0
            .iter()
            .min_by(|a, b| a.avg_cycle_regularity.total_cmp(&b.avg_cycle_regularity));
        if let Some(s) = highest {
            writeln!(f, "Highest coherence: {} ({:.3})", s.model, s.avg_coherence)?;
        }
        if let Some(s) = most_regular {
            writeln!(f, "Most regular cycles: {} ({:.3})", s.model, s.avg_cycle_regularity)?;
        }
        for s in self.0 {
            let phase = s.dominant_phase();
            writeln!(
                f,
                "{}: dominant phase {} ({:.1}%)",
                s.model,
                phase,
                s.phase_dominance.get(phase) * 100.0
            )?;
        }
        Ok(())
    }
}

/// Clean-session analysis section.
#[derive(Debug, Clone, Copy)]
pub struct CleanReport<'a>(pub &'a [CleanAnalysis]);

impl fmt::Display for CleanReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CLEAN SESSION ANALYSIS")?;
        writeln!(f, "{RULE}")?;
        for a in self.0 {
            writeln!(f, "{} ({} sessions, {} responses)", a.model, a.n_sessions, a.n_responses)?;
            writeln!(
                f,
                "  coherence {:.3} ± {:.3}, range {:.3}",
                a.mean_coherence, a.std_coherence, a.coherence_range
            )?;
            writeln!(
                f,
                "  cycle length {:.2}, regularity {:.2}",
                a.mean_cycle_length, a.cycle_regularity
            )?;
            writeln!(
                f,
                "  transitions {} ({:.3}/turn), into transformation {}, prediction accuracy {}",
                a.n_transitions,
                a.transition_rate,
                a.n_transformations,
                optional(a.transformation_prediction_accuracy, 3)
            )?;
        }
        Ok(())
    }
}

/// Partial-data report: signatures plus aggregated evidence.
#[derive(Debug, Clone, Copy)]
pub struct PartialReport<'a> {
    /// Per-model signatures
    pub signatures: &'a [ModelSignature],
    /// Aggregated evidence
    pub evidence: &'a PartialEvidence,
}

impl fmt::Display for PartialReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PARTIAL DATA ANALYSIS")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Responses analyzed: {}", self.evidence.total_responses)?;
        writeln!(f, "Models with data: {}", self.evidence.models_with_data.join(", "))?;

        writeln!(f, "\nSignatures:")?;
        for s in self.signatures {
            writeln!(
                f,
                "  {}: {} responses, length cv {:.3}, coherence var {:.4}, fingerprint {:.3}, prefers {}",
                s.model,
                s.n_clean_responses,
                s.response_length_signature,
                s.coherence_variance_signature,
                s.cycle_fingerprint,
                s.phase_preference.map_or("unknown", Phase::as_str)
            )?;
        }

        writeln!(f, "\nPatterns:")?;
        for p in &self.evidence.strongest_patterns {
            writeln!(f, "  {}:", p.model)?;
            for pattern in &p.patterns {
                writeln!(f, "    - {pattern}")?;
            }
        }

        writeln!(f, "\nResilience:")?;
        for (model, score) in &self.evidence.resilience {
            writeln!(f, "  {model}: {}", optional(score.measured().copied(), 3))?;
        }

        writeln!(f, "\nKey findings:")?;
        for finding in &self.evidence.key_findings {
            writeln!(f, "  * {finding}")?;
        }
        Ok(())
    }
}

/// Transformation-resistance report.
#[derive(Debug, Clone, Copy)]
pub struct TransformationSummary<'a>(pub &'a TransformationReport);

impl fmt::Display for TransformationSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        writeln!(f, "TRANSFORMATION RESISTANCE")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Sessions: {}, turns: {}", r.sessions_analyzed, r.total_turns)?;
        for (phase, count) in &r.phase_counts {
            writeln!(f, "  {phase:<15} {count:>5}")?;
        }
        writeln!(
            f,
            "Transformation share: {:.1}%, resistance score: {}",
            r.transformation_pct(),
            optional(r.resistance, 3)
        )?;

        writeln!(f, "\nTransformation rate by position:")?;
        for (pos, rate) in r.position_rates.iter().enumerate() {
            writeln!(f, "  {pos:>3}: {rate:5.1}%")?;
        }
        if let Some(peak) = r.peak_position {
            writeln!(f, "Peak position: {peak}")?;
        }
        writeln!(
            f,
            "Arc: early {:.1}%, middle {:.1}%, late {:.1}%",
            r.arc.early, r.arc.middle, r.arc.late
        )?;
        writeln!(f, "Top sessions: {}", r.top_sessions.join(", "))?;

        writeln!(f, "\nTransition matrix (from \\ to):")?;
        write!(f, "       ")?;
        for to in Phase::ALL {
            write!(f, " {:>5}", to.abbrev())?;
        }
        writeln!(f)?;
        for from in Phase::ALL {
            write!(f, "  {:<5}", from.abbrev())?;
            for to in Phase::ALL {
                write!(f, " {:>5}", r.matrix.get(from, to))?;
            }
            writeln!(f)?;
        }
        writeln!(
            f,
            "Bypass (int<->gen): {} ({}%), involving transformation: {}",
            r.bypass_count,
            optional(r.bypass_rate, 1),
            r.transformation_involved
        )?;
        writeln!(
            f,
            "Transformation vs min coherence: r = {}",
            optional(r.correlation_min_coherence.map(|c| c.r), 3)
        )?;
        writeln!(
            f,
            "Transformation vs coherence range: r = {}",
            optional(r.correlation_range.map(|c| c.r), 3)
        )?;

        writeln!(f, "\nStrategies:")?;
        for strategy in Strategy::ALL {
            let ids = r.strategies.get(&strategy).map_or(0, Vec::len);
            writeln!(f, "  {strategy:<9} {ids:>4}")?;
        }
        Ok(())
    }
}

/// One quality-check line plus its sample.
#[derive(Debug, Clone, Copy)]
pub struct QualitySummary<'a> {
    /// File or model label
    pub label: &'a str,
    /// Counts for that label
    pub report: &'a QualityReport,
}

impl fmt::Display for QualitySummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        writeln!(
            f,
            "{}: {}/{} error responses ({:.1}%)",
            self.label,
            r.errors,
            r.total,
            r.error_pct()
        )?;
        if let Some(sample) = &r.sample {
            writeln!(f, "  Sample: {sample}...")?;
        }
        Ok(())
    }
}

/// Per-file before/after summary of a re-scoring run.
#[derive(Debug, Clone, Copy)]
pub struct ReanalysisReport<'a>(pub &'a [ReanalysisSummary]);

impl fmt::Display for ReanalysisReport<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "REANALYSIS SUMMARY")?;
        writeln!(f, "{RULE}")?;
        for r in self.0 {
            writeln!(f, "\nFile: {} ({} coherence)", r.file, r.strategy)?;
            writeln!(f, "  Sessions: {}", r.n_sessions)?;
            writeln!(f, "  Responses: {}", r.n_responses)?;
            writeln!(
                f,
                "  Original coherence: {}",
                optional(r.original.map(|c| c.mean), 3)
            )?;
            if let Some(c) = r.rescored {
                writeln!(f, "  Re-scored coherence: {:.3}", c.mean)?;
                writeln!(f, "  Std dev: {:.3}", c.std)?;
                writeln!(f, "  Range: {:.3} - {:.3}", c.min, c.max)?;
            }

            let total: usize = r.phases.counts.values().sum();
            if total == 0 {
                continue;
            }
            writeln!(f, "  Phase distribution:")?;
            for (phase, count) in &r.phases.counts {
                writeln!(f, "    {phase:<15} {:5.1}%", *count as f64 / total as f64 * 100.0)?;
            }
            if let Some(chi) = r.phases.chi_square {
                writeln!(
                    f,
                    "  Chi-square: {:.2} (df {}), p = {:.4}{}",
                    chi.statistic,
                    chi.df,
                    chi.p_value,
                    if r.non_uniform { " (non-uniform)" } else { "" }
                )?;
            }
        }
        Ok(())
    }
}

/// Full analysis report: comparison, tests and findings.
#[must_use]
pub fn analysis_report(
    summaries: &[ModelSummary],
    tests: &StatisticalTests,
    clean: &[CleanAnalysis],
) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", ModelComparison(summaries));
    let _ = writeln!(out, "{}", StatisticalReport(tests));
    if !clean.is_empty() {
        let _ = writeln!(out, "{}", CleanReport(clean));
    }
    let _ = write!(out, "{}", KeyFindings(summaries));
    out
}

/// CSV of model summaries, one row per model.
#[must_use]
pub fn model_summaries_csv(summaries: &[ModelSummary]) -> String {
    let mut out = String::from(
        "model,sessions_analyzed,avg_cycles,std_cycles,avg_cycle_amplitude,phase_transition_rate,\
         coherence_stability,avg_coherence,integration,consumption,transformation,generation,\
         avg_cycle_regularity\n",
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            s.model,
            s.sessions_analyzed,
            s.avg_cycles,
            s.std_cycles,
            s.avg_cycle_amplitude,
            s.phase_transition_rate,
            s.coherence_stability,
            s.avg_coherence,
            s.phase_dominance.integration,
            s.phase_dominance.consumption,
            s.phase_dominance.transformation,
            s.phase_dominance.generation,
            s.avg_cycle_regularity
        );
    }
    out
}

/// CSV of clean-session results, one row per model.
#[must_use]
pub fn clean_analysis_csv(results: &[CleanAnalysis]) -> String {
    let mut out = String::from(
        "model,n_sessions,n_responses,mean_coherence,std_coherence,coherence_range,\
         mean_cycle_length,cycle_regularity,n_transitions,transition_rate,n_transformations,\
         transformation_prediction_accuracy\n",
    );
    for a in results {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            a.model,
            a.n_sessions,
            a.n_responses,
            a.mean_coherence,
            a.std_coherence,
            a.coherence_range,
            a.mean_cycle_length,
            a.cycle_regularity,
            a.n_transitions,
            a.transition_rate,
            a.n_transformations,
            a.transformation_prediction_accuracy.map_or_else(String::new, |v| v.to_string())
        );
    }
    out
}

/// CSV of re-scoring results, one row per input file.
#[must_use]
pub fn reanalysis_csv(results: &[ReanalysisSummary]) -> String {
    let mut out = String::from(
        "file,strategy,n_sessions,n_responses,mean_coherence_original,mean_coherence_rescored,\
         std_coherence_rescored,min_coherence_rescored,max_coherence_rescored,integration,\
         consumption,transformation,generation,chi_square,chi_square_p\n",
    );
    let cell = |v: Option<f64>| v.map_or_else(String::new, |v| v.to_string());
    for r in results {
        let counts: Vec<String> = r.phases.counts.values().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            r.file,
            r.strategy,
            r.n_sessions,
            r.n_responses,
            cell(r.original.map(|c| c.mean)),
            cell(r.rescored.map(|c| c.mean)),
            cell(r.rescored.map(|c| c.std)),
            cell(r.rescored.map(|c| c.min)),
            cell(r.rescored.map(|c| c.max)),
            counts.join(","),
            cell(r.phases.chi_square.map(|c| c.statistic)),
            cell(r.phases.chi_square.map(|c| c.p_value))
        );
    }
    out
}

/// Write `<stem>.csv` and `<stem>.txt` under `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the directory or either file cannot be
/// written.
pub fn write_results<P: AsRef<Path>>(
    dir: P,
    stem: &str,
    csv: &str,
    report: &str,
) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let csv_path = dir.join(format!("{stem}.csv"));
    let txt_path = dir.join(format!("{stem}.txt"));
    fs::write(&csv_path, csv)?;
    fs::write(&txt_path, report)?;
    info!(csv = %csv_path.display(), report = %txt_path.display(), "results written");
    Ok((csv_path, txt_path))
}
