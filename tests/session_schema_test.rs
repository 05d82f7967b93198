//! Session Schema Tests
//!
//! Persisted session files must load regardless of which collection run
//! produced them: numeric ids, null coherence, missing optional sections.

use ouroboros_analysis::phase::{Phase, PhaseScores};
use ouroboros_analysis::session::{CycleSummary, MetricRecord, Session};
use ouroboros_analysis::Error;

const SESSION_JSON: &str = r#"{
    "model": "gpt-3.5-turbo",
    "session_id": 7,
    "timestamp": "2025-08-11T18:26:31.123456",
    "prompts": ["Let's explore a concept.", "Build on that."],
    "responses": ["First reply building ideas.", "Second reply questioning them."],
    "metrics": [
        {"position": 0, "coherence": 0.61, "entropy": 3.2,
         "phase_markers": {"integration": 0.2, "consumption": 0.0, "transformation": 0.0, "generation": 0.0},
         "length": 4},
        {"position": 1, "coherence": null, "entropy": 3.5,
         "phase_markers": {"integration": 0.0, "consumption": 0.2, "transformation": 0.0, "generation": 0.0},
         "length": 4}
    ],
    "cycles": {
        "num_peaks": 0, "num_troughs": 0, "peak_positions": [], "trough_positions": [],
        "phase_transitions": [
            {"position": 1, "from_phase": "integration", "to_phase": "consumption", "coherence_change": -0.1}
        ],
        "coherence_mean": 0.61, "coherence_std": 0.0, "coherence_range": 0.0,
        "cycle_regularity": 0.0
    }
}"#;

// =============================================================================
// MetricRecord Tests
// =============================================================================

#[test]
fn test_metric_record_creation() {
    let mut scores = PhaseScores::default();
    scores.set(Phase::Generation, 0.4);
    let record = MetricRecord::new(3, 0.7, 2.5, scores, 42);

    assert_eq!(record.position(), 3);
    assert!((record.coherence() - 0.7).abs() < f64::EPSILON);
    assert_eq!(record.length(), 42);
    assert_eq!(record.dominant_phase(), Phase::Generation);
    assert!(record.semantic_drift().is_none());
}

#[test]
fn test_metric_record_optional_fields_not_serialized() {
    let record = MetricRecord::new(0, 0.5, 1.0, PhaseScores::default(), 3);
    let json = serde_json::to_value(&record).unwrap();
    let object = json.as_object().unwrap();

    assert_eq!(object.len(), 5);
    assert!(object.contains_key("phase_markers"));
    assert!(!object.contains_key("semantic_drift"));
}

#[test]
fn test_metric_record_builder_history_fields() {
    let record = MetricRecord::builder(2, 0.4)
        .similarities(0.3, 0.1)
        .semantic_drift(0.9)
        .build();

    assert_eq!(record.similarity_to_previous(), Some(0.3));
    assert_eq!(record.similarity_to_first(), Some(0.1));
    assert_eq!(record.semantic_drift(), Some(0.9));
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_session_loads_persisted_schema() {
    let session: Session = serde_json::from_str(SESSION_JSON).unwrap();

    assert_eq!(session.model(), "gpt-3.5-turbo");
    assert_eq!(session.session_id(), "7");
    assert!(session.timestamp().is_some());
    assert_eq!(session.prompts().len(), 2);
    assert_eq!(session.metrics().len(), 2);
    assert!(session.metrics()[1].coherence().is_nan());
    assert_eq!(session.dominant_phases(), vec![Phase::Integration, Phase::Consumption]);

    let cycles = session.cycles().unwrap();
    assert_eq!(cycles.phase_transitions.len(), 1);
    assert_eq!(cycles.dominant_period, None);
    assert!(session.statistics().is_none());
    assert!(session.validate().is_ok());
}

#[test]
fn test_session_serialization_round_trip() {
    let session = Session::builder("gemini-1.5-flash", "3")
        .responses(vec!["one".into(), "two".into()])
        .metrics(vec![
            MetricRecord::new(0, 0.3, 1.0, PhaseScores::default(), 1),
            MetricRecord::new(1, 0.6, 1.5, PhaseScores::default(), 1),
        ])
        .cycles(CycleSummary {
            num_peaks: 1,
            peak_positions: vec![1],
            ..CycleSummary::default()
        })
        .build();

    let json = serde_json::to_string(&session).unwrap();
    let restored: Session = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, session);
}

#[test]
fn test_session_unparseable_timestamp_is_dropped() {
    let session: Session =
        serde_json::from_str(r#"{"model": "m", "session_id": "a", "timestamp": "yesterday"}"#)
            .unwrap();
    assert!(session.timestamp().is_none());
    assert!(session.metrics().is_empty());
}

#[test]
fn test_session_rfc3339_timestamp() {
    let session: Session = serde_json::from_str(
        r#"{"model": "m", "session_id": "a", "timestamp": "2025-08-11T18:26:31+02:00"}"#,
    )
    .unwrap();
    let ts = session.timestamp().unwrap();
    assert_eq!(ts.format("%H:%M").to_string(), "16:26");
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_rejects_out_of_order_positions() {
    let session = Session::builder("m", "0")
        .metrics(vec![
            MetricRecord::new(1, 0.3, 1.0, PhaseScores::default(), 1),
            MetricRecord::new(1, 0.4, 1.0, PhaseScores::default(), 1),
        ])
        .build();
    let err = session.validate().unwrap_err();
    assert!(matches!(err, Error::MalformedSession(_)));
    assert!(err.to_string().contains("does not follow"));
}

#[test]
fn test_validate_rejects_negative_phase_score() {
    let mut scores = PhaseScores::default();
    scores.set(Phase::Consumption, -0.1);
    let session = Session::builder("m", "0")
        .metrics(vec![MetricRecord::new(0, 0.3, 1.0, scores, 1)])
        .build();
    assert!(session.validate().is_err());
}

#[test]
fn test_validate_rejects_empty_model() {
    let session = Session::builder("  ", "0").build();
    assert!(session.validate().is_err());
}
