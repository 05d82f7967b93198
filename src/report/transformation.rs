//! Transformation-resistance analysis
//!
//! Measures how rarely the transformation phase dominates compared with a
//! balanced four-way split, where in the conversation it shows up, and how
//! sessions trade coherence against transformation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cycles::detect_phase_transitions;
use crate::phase::Phase;
use crate::session::{PhaseTransition, Session};
use crate::stats::{self, Correlation};

/// Sessions listed as the strongest transformers.
pub const TOP_SESSIONS: usize = 5;

/// Early arc covers positions `0..EARLY_END`.
pub const EARLY_END: usize = 7;

/// Middle arc covers positions `EARLY_END..MIDDLE_END`; the rest is late.
pub const MIDDLE_END: usize = 13;

/// How a session balances coherence against transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Very high coherence, little transformation
    Rigid,
    /// Neither extreme
    Balanced,
    /// High coherence with frequent transformation
    Brave,
    /// Low coherence and little transformation
    Chaotic,
}

impl Strategy {
    /// All strategies in report order.
    pub const ALL: [Self; 4] = [Self::Rigid, Self::Balanced, Self::Brave, Self::Chaotic];

    /// Classify a session by mean coherence and transformation percentage.
    #[must_use]
    pub fn classify(mean_coherence: f64, transform_pct: f64) -> Self {
        if mean_coherence > 0.95 && transform_pct < 15.0 {
            Self::Rigid
        } else if mean_coherence > 0.85 && transform_pct > 20.0 {
            Self::Brave
        } else if mean_coherence < 0.85 && transform_pct < 15.0 {
            Self::Chaotic
        } else {
            Self::Balanced
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rigid => "rigid",
            Self::Balanced => "balanced",
            Self::Brave => "brave",
            Self::Chaotic => "chaotic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-session transformation detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTransformation {
    /// Session identifier
    pub session_id: String,
    /// Turns dominated by transformation
    pub transform_count: usize,
    /// `transform_count / turns * 100`
    pub transform_pct: f64,
    /// Positions of those turns
    pub positions: Vec<usize>,
    /// Lowest coherence
    pub min_coherence: f64,
    /// Highest coherence
    pub max_coherence: f64,
    /// `max - min`
    pub coherence_range: f64,
    /// Mean coherence
    pub mean_coherence: f64,
    /// Strategy bucket
    pub strategy: Strategy,
}

/// Mean per-position transformation rate over each part of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversationArc {
    /// Positions before [`EARLY_END`]
    pub early: f64,
    /// Positions from [`EARLY_END`] to [`MIDDLE_END`]
    pub middle: f64,
    /// Positions from [`MIDDLE_END`] on
    pub late: f64,
}

/// Phase-to-phase transition counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    /// `counts[from][to]`, indexed by [`Phase::index`]
    pub counts: [[usize; 4]; 4],
}

impl TransitionMatrix {
    /// Record one transition.
    pub fn record(&mut self, transition: &PhaseTransition) {
        self.counts[transition.from_phase.index()][transition.to_phase.index()] += 1;
    }

    /// Count for one cell.
    #[must_use]
    pub const fn get(&self, from: Phase, to: Phase) -> usize {
        self.counts[from.index()][to.index()]
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Full transformation-resistance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationReport {
    /// Sessions analyzed
    pub sessions_analyzed: usize,
    /// Turns analyzed
    pub total_turns: usize,
    /// Turns per dominant phase
    pub phase_counts: BTreeMap<Phase, usize>,
    /// `1 - actual / (0.25 * total)`; `None` without turns
    pub resistance: Option<f64>,
    /// Percentage of sessions with transformation at each position
    pub position_rates: Vec<f64>,
    /// First position with the highest rate
    pub peak_position: Option<usize>,
    /// Early/middle/late means of `position_rates`
    pub arc: ConversationArc,
    /// Per-session detail, highest transformation share first
    pub sessions: Vec<SessionTransformation>,
    /// Identifiers of the top [`TOP_SESSIONS`] sessions
    pub top_sessions: Vec<String>,
    /// Transition counts
    pub matrix: TransitionMatrix,
    /// Direct integration/generation jumps
    pub bypass_count: usize,
    /// `bypass_count / transitions * 100`; `None` without transitions
    pub bypass_rate: Option<f64>,
    /// Transitions starting or ending in transformation
    pub transformation_involved: usize,
    /// Transformation share against minimum coherence
    pub correlation_min_coherence: Option<Correlation>,
    /// Transformation share against coherence range
    pub correlation_range: Option<Correlation>,
    /// Session ids per strategy
    pub strategies: BTreeMap<Strategy, Vec<String>>,
}

impl TransformationReport {
    /// Share of all turns dominated by transformation, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn transformation_pct(&self) -> f64 {
        if self.total_turns == 0 {
            return 0.0;
        }
        let count = self.phase_counts.get(&Phase::Transformation).copied().unwrap_or(0);
        count as f64 / self.total_turns as f64 * 100.0
    }

    /// Mean of the per-session mean coherence.
    #[must_use]
    pub fn mean_coherence(&self) -> f64 {
        let means: Vec<f64> = self.sessions.iter().map(|s| s.mean_coherence).collect();
        stats::mean(&means)
    }
}

#[allow(clippy::cast_precision_loss)]
fn session_detail(session: &Session) -> SessionTransformation {
    let coherence: Vec<f64> = session
        .coherence_series()
        .into_iter()
        .map(|c| if c.is_finite() { c } else { 0.0 })
        .collect();
    let positions: Vec<usize> = session
        .dominant_phases()
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| (p == Phase::Transformation).then_some(i))
        .collect();
    let transform_pct = if coherence.is_empty() {
        0.0
    } else {
        positions.len() as f64 / coherence.len() as f64 * 100.0
    };
    let (min_coherence, max_coherence) = stats::min_max(&coherence).unwrap_or((0.0, 0.0));
    let mean_coherence = stats::mean(&coherence);
    SessionTransformation {
        session_id: session.session_id().to_string(),
        transform_count: positions.len(),
        transform_pct,
        positions,
        min_coherence,
        max_coherence,
        coherence_range: max_coherence - min_coherence,
        mean_coherence,
        strategy: Strategy::classify(mean_coherence, transform_pct),
    }
}

/// Build the transformation-resistance report for a set of sessions.
///
/// Transitions come from each session's stored cycle summary, or are
/// recomputed from the metrics when the summary has none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze(sessions: &[Session]) -> TransformationReport {
    let mut phase_counts: BTreeMap<Phase, usize> = Phase::ALL.iter().map(|&p| (p, 0)).collect();
    let max_len = sessions.iter().map(|s| s.metrics().len()).max().unwrap_or(0);
    let mut by_position = vec![0usize; max_len];
    let mut matrix = TransitionMatrix::default();
    let mut bypass_count = 0;
    let mut transformation_involved = 0;

    for session in sessions {
        for (pos, phase) in session.dominant_phases().into_iter().enumerate() {
            *phase_counts.entry(phase).or_insert(0) += 1;
            if phase == Phase::Transformation {
                by_position[pos] += 1;
            }
        }

        let stored = session
            .cycles()
            .map(|c| c.phase_transitions.clone())
            .filter(|t| !t.is_empty());
        let transitions = stored.unwrap_or_else(|| detect_phase_transitions(session.metrics()));
        for t in &transitions {
            matrix.record(t);
            if t.is_bypass() {
                bypass_count += 1;
            }
            if t.from_phase == Phase::Transformation || t.to_phase == Phase::Transformation {
                transformation_involved += 1;
            }
        }
    }

    let total_turns: usize = phase_counts.values().sum();
    let resistance = (total_turns > 0).then(|| {
        let actual = phase_counts[&Phase::Transformation] as f64;
        1.0 - actual / (0.25 * total_turns as f64)
    });

    let n_sessions = sessions.len().max(1) as f64;
    let position_rates: Vec<f64> = by_position
        .iter()
        .map(|&count| count as f64 / n_sessions * 100.0)
        .collect();
    let mut peak_position = None;
    let mut best = f64::NEG_INFINITY;
    for (pos, &rate) in position_rates.iter().enumerate() {
        if rate > best {
            best = rate;
            peak_position = Some(pos);
        }
    }
    let slice = |start: usize, end: usize| {
        let end = end.min(position_rates.len());
        let start = start.min(end);
        stats::mean(&position_rates[start..end])
    };
    let arc = ConversationArc {
        early: slice(0, EARLY_END),
        middle: slice(EARLY_END, MIDDLE_END),
        late: slice(MIDDLE_END, position_rates.len()),
    };

    let mut details: Vec<SessionTransformation> = sessions.iter().map(session_detail).collect();
    details.sort_by(|a, b| b.transform_pct.total_cmp(&a.transform_pct));
    let top_sessions = details
        .iter()
        .take(TOP_SESSIONS)
        .map(|d| d.session_id.clone())
        .collect();

    let pcts: Vec<f64> = details.iter().map(|d| d.transform_pct).collect();
    let mins: Vec<f64> = details.iter().map(|d| d.min_coherence).collect();
    let ranges: Vec<f64> = details.iter().map(|d| d.coherence_range).collect();

    let mut strategies: BTreeMap<Strategy, Vec<String>> =
        Strategy::ALL.iter().map(|&s| (s, Vec::new())).collect();
    for d in &details {
        strategies.entry(d.strategy).or_default().push(d.session_id.clone());
    }

    let total_transitions = matrix.total();
    let bypass_rate = (total_transitions > 0)
        .then(|| bypass_count as f64 / total_transitions as f64 * 100.0);
    debug!(
        sessions = sessions.len(),
        total_turns,
        transitions = total_transitions,
        "transformation analysis complete"
    );

    TransformationReport {
        sessions_analyzed: sessions.len(),
        total_turns,
        phase_counts,
        resistance,
        position_rates,
        peak_position,
        arc,
        sessions: details,
        top_sessions,
        matrix,
        bypass_count,
        bypass_rate,
        transformation_involved,
        correlation_min_coherence: stats::pearson(&pcts, &mins),
        correlation_range: stats::pearson(&pcts, &ranges),
        strategies,
    }
}
