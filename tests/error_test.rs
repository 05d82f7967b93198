//! Tests for error types

use std::str::FromStr;

use ouroboros_analysis::config::AnalysisConfig;
use ouroboros_analysis::metrics::StrategyKind;
use ouroboros_analysis::phase::Phase;
use ouroboros_analysis::Error;

#[test]
fn test_malformed_session_error() {
    let error = Error::MalformedSession("missing model".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Malformed session"));
    assert!(error_str.contains("missing model"));
    assert!(error_str.contains("will be skipped"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("window must be positive".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("window must be positive"));
}

#[test]
fn test_config_error() {
    let error = Error::Config("smoothing_sigma must be positive".to_string());
    assert!(error.to_string().starts_with("Configuration error"));
}

#[test]
fn test_response_source_error() {
    let error = Error::ResponseSource {
        model: "gpt-3.5-turbo".to_string(),
        message: "429 Too Many Requests".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("gpt-3.5-turbo"));
    assert!(error_str.contains("429"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
    let error: Error = io.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(error.to_string().contains("IO error"));
}

#[test]
fn test_json_error_conversion() {
    let json = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
    let error: Error = json.into();
    assert!(matches!(error, Error::Json(_)));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom".to_string());
    assert_eq!(error.to_string(), "custom");
}

#[test]
fn test_unknown_labels_are_invalid_input() {
    assert!(matches!(Phase::from_str("rebirth"), Err(Error::InvalidInput(_))));
    let err = StrategyKind::from_str("cosine").unwrap_err();
    assert!(err.to_string().contains("expected sentence"));
    assert_eq!(StrategyKind::from_str(" Jaccard ").unwrap(), StrategyKind::Jaccard);
}

#[test]
fn test_invalid_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"conversation_length": 0}"#).unwrap();
    assert!(matches!(AnalysisConfig::from_file(&path), Err(Error::Config(_))));

    std::fs::write(&path, "not json").unwrap();
    let err = AnalysisConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("cannot parse"));

    let err = AnalysisConfig::from_file(dir.path().join("missing.json")).unwrap_err();
    assert!(err.to_string().contains("cannot read"));
}
