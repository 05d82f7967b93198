//! Error types for ouroboros-analysis
//!
//! Insufficient data is not an error here: computations with a minimum
//! turn count return [`crate::Outcome::Insufficient`] instead.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Ouroboros analysis error types
#[derive(Error, Debug)]
pub enum Error {
    /// Session record could not be interpreted
    #[error("Malformed session: {0}\nThe record will be skipped; check the session JSON schema")]
    MalformedSession(String),

    /// Invalid argument passed to an analysis routine
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file is unreadable or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A response source failed to produce a reply
    #[error("Response source failed for {model}: {message}")]
    ResponseSource {
        /// Model that was queried
        model: String,
        /// Failure description reported by the source
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
