//! Response quality check

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::session::Session;

/// Characters of the first response kept as a sample.
pub const SAMPLE_CHARS: usize = 100;

/// Error-response counts for a collection of sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Responses inspected
    pub total: usize,
    /// Responses counted as failures
    pub errors: usize,
    /// Start of the first response of the first session
    pub sample: Option<String>,
}

impl QualityReport {
    /// `errors / total * 100`, or 0 without responses.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.errors as f64 / self.total as f64 * 100.0
        }
    }
}

/// Stricter failure test than the error markers: "error" or "api"
/// anywhere, or a reply shorter than `quality_min_chars`.
#[must_use]
pub fn is_failed_response(text: &str, config: &AnalysisConfig) -> bool {
    let lower = text.to_lowercase();
    lower.contains("error")
        || lower.contains("api")
        || text.chars().count() < config.thresholds.quality_min_chars
}

/// Count failed responses across `sessions`.
#[must_use]
pub fn error_counts(sessions: &[Session], config: &AnalysisConfig) -> QualityReport {
    let responses = sessions.iter().flat_map(Session::responses);
    let (total, errors) = responses.fold((0, 0), |(total, errors), r| {
        (total + 1, errors + usize::from(is_failed_response(r, config)))
    });
    let sample = sessions
        .first()
        .and_then(|s| s.responses().first())
        .map(|r| r.chars().take(SAMPLE_CHARS).collect());
    QualityReport { total, errors, sample }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_counts() {
        let long = "a".repeat(120);
        let sessions = vec![
            Session::builder("m", "0")
                .responses(vec![long.clone(), "Error 429".into(), "short".into()])
                .build(),
            Session::builder("m", "1")
                .responses(vec![format!("{long} mentions the API")])
                .build(),
        ];
        let report = error_counts(&sessions, &AnalysisConfig::default());
        assert_eq!(report.total, 4);
        assert_eq!(report.errors, 3);
        assert!((report.error_pct() - 75.0).abs() < 1e-12);
        assert_eq!(report.sample.as_deref().map(str::len), Some(SAMPLE_CHARS));
    }

    #[test]
    fn test_empty_sessions() {
        let report = error_counts(&[], &AnalysisConfig::default());
        assert_eq!(report.total, 0);
        assert!(report.error_pct().abs() < f64::EPSILON);
        assert!(report.sample.is_none());
    }
}
