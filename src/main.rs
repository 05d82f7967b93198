use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use ouroboros_analysis::config::AnalysisConfig;
use ouroboros_analysis::cycles::CycleDetector;
use ouroboros_analysis::metrics::{MetricCalculator, StrategyKind};
use ouroboros_analysis::report::{
    self,
    reanalysis,
    render::{self, PartialReport, QualitySummary, ReanalysisReport, TransformationSummary},
};
use ouroboros_analysis::session::{expand_paths, SessionStore};
use ouroboros_analysis::synthetic::{ModelProfile, SyntheticGenerator, DEFAULT_SEED};

#[derive(Parser)]
#[command(
    name = "ouroboros",
    version,
    about = "Coherence and phase-cycle analysis of multi-turn LLM conversations"
)]
struct Cli {
    /// Analysis configuration (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare models across stored sessions and write CSV plus a text report
    Analyze {
        /// Session files or directories of *.json files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Directory for the CSV and text report
        #[arg(long, default_value = "results")]
        results: PathBuf,
    },
    /// Generate deterministic synthetic sessions for the built-in profiles
    Synthesize {
        /// Random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Sessions per profile
        #[arg(long, default_value_t = 50)]
        sessions: usize,
        /// Turns per session
        #[arg(long, default_value_t = 20)]
        length: usize,
        /// Output file
        #[arg(long, default_value = "data/synthetic_sessions.json")]
        out: PathBuf,
    },
    /// Recompute metrics and cycles from stored responses
    Reanalyze {
        /// Session files or directories of *.json files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Coherence strategy: sentence, lexical, jaccard, semantic or entropy
        #[arg(long, default_value_t = StrategyKind::default())]
        strategy: StrategyKind,
        /// Output directory (defaults to each input file's directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Directory for the summary CSV and text report
        #[arg(long, default_value = "results")]
        results: PathBuf,
    },
    /// Count error responses per file
    Quality {
        /// Session files or directories of *.json files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Micro-cycles, crisis points, momentum, resilience and signatures
    Partial {
        /// Session files or directories of *.json files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Transformation-resistance report
    Transformation {
        /// Session files or directories of *.json files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn load_store(paths: &[PathBuf]) -> anyhow::Result<SessionStore> {
    let store = SessionStore::load_paths(paths);
    if store.is_empty() {
        bail!("no sessions could be loaded from the given paths");
    }
    info!(sessions = store.len(), "sessions loaded");
    Ok(store)
}

fn analyze(config: &AnalysisConfig, paths: &[PathBuf], results: &Path) -> anyhow::Result<()> {
    let by_model = load_store(paths)?.by_model();
    let summaries = report::compare_models(&by_model);
    let tests = report::run_statistical_tests(&by_model, config);
    let clean = report::analyze_clean(&by_model, config);

    let text = render::analysis_report(&summaries, &tests, &clean);
    println!("{text}");

    render::write_results(
        results,
        "model_comparison",
        &render::model_summaries_csv(&summaries),
        &text,
    )
    .context("failed to write comparison results")?;
    if !clean.is_empty() {
        render::write_results(
            results,
            "clean_analysis",
            &render::clean_analysis_csv(&clean),
            &render::CleanReport(&clean).to_string(),
        )
        .context("failed to write clean-session results")?;
    }
    Ok(())
}

fn synthesize(
    config: &AnalysisConfig,
    seed: u64,
    sessions: usize,
    length: usize,
    out: &Path,
) -> anyhow::Result<()> {
    let mut generator = SyntheticGenerator::new(seed, config);
    let by_model = generator.simulate(&ModelProfile::presets(), sessions, length);
    let all: Vec<_> = by_model.values().flatten().cloned().collect();
    SessionStore::save(out, &all).with_context(|| format!("failed to write {}", out.display()))?;

    let summaries = report::compare_models(&by_model);
    println!("{}", render::ModelComparison(&summaries));
    println!("Wrote {} sessions to {}", all.len(), out.display());
    Ok(())
}

fn reanalyze(
    config: &AnalysisConfig,
    paths: &[PathBuf],
    strategy: StrategyKind,
    out: Option<&Path>,
    results: &Path,
) -> anyhow::Result<()> {
    let calculator = MetricCalculator::new(config, strategy.build(&config.error_markers));
    let detector = CycleDetector::new(config);

    let inputs: Vec<PathBuf> = expand_paths(paths)
        .into_iter()
        .filter(|file| {
            let earlier = reanalysis::is_reanalysis_output(file);
            if earlier {
                info!(file = %file.display(), "skipping earlier reanalysis output");
            }
            !earlier
        })
        .collect();

    let mut summaries = Vec::new();
    for (file, sessions) in SessionStore::load_each(&inputs) {
        let rescored = reanalysis::rescore(sessions.clone(), &calculator, &detector);
        let target = reanalysis::output_path(&file, out);
        SessionStore::save(&target, &rescored)
            .with_context(|| format!("failed to write {}", target.display()))?;
        println!("{} -> {}", file.display(), target.display());
        summaries.push(reanalysis::summarize(
            &file,
            calculator.strategy_name(),
            &sessions,
            &rescored,
            config,
        ));
    }
    if summaries.is_empty() {
        bail!("no session files could be reanalyzed");
    }

    let text = ReanalysisReport(&summaries).to_string();
    print!("{text}");
    render::write_results(
        results,
        "reanalysis_summary",
        &render::reanalysis_csv(&summaries),
        &text,
    )
    .context("failed to write reanalysis summary")?;
    Ok(())
}

fn quality(config: &AnalysisConfig, paths: &[PathBuf]) -> anyhow::Result<()> {
    let loaded = SessionStore::load_each(paths);
    if loaded.is_empty() {
        bail!("no session files could be loaded");
    }
    for (file, sessions) in loaded {
        if sessions.is_empty() {
            warn!(file = %file.display(), "no sessions in file");
        }
        let label = file.display().to_string();
        let counts = report::error_counts(&sessions, config);
        print!(
            "{}",
            QualitySummary {
                label: &label,
                report: &counts,
            }
        );
    }
    Ok(())
}

fn partial(config: &AnalysisConfig, paths: &[PathBuf]) -> anyhow::Result<()> {
    let by_model = load_store(paths)?.by_model();
    let signatures = report::signatures(&by_model);
    let evidence = report::aggregate_evidence(&by_model, config);
    print!(
        "{}",
        PartialReport {
            signatures: &signatures,
            evidence: &evidence,
        }
    );
    Ok(())
}

fn transformation(paths: &[PathBuf]) -> anyhow::Result<()> {
    let store = load_store(paths)?;
    let result = report::transformation::analyze(store.sessions());
    print!("{}", TransformationSummary(&result));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Analyze { paths, results } => analyze(&config, &paths, &results),
        Command::Synthesize {
            seed,
            sessions,
            length,
            out,
        } => synthesize(&config, seed, sessions, length, &out),
        Command::Reanalyze {
            paths,
            strategy,
            out,
            results,
        } => reanalyze(&config, &paths, strategy, out.as_deref(), &results),
        Command::Quality { paths } => quality(&config, &paths),
        Command::Partial { paths } => partial(&config, &paths),
        Command::Transformation { paths } => transformation(&paths),
    }
}
