//! Session schema
//!
//! Typed records for the persisted session JSON:
//!
//! ```text
//! Session (1) ──< MetricRecord (N)   [one per turn, position-ordered]
//!     │
//!     ├── CycleSummary ──< PhaseTransition (N)
//!     └── SessionStatistics
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use ouroboros_analysis::phase::PhaseScores;
//! use ouroboros_analysis::session::{MetricRecord, Session};
//!
//! let metrics = vec![
//!     MetricRecord::new(0, 0.4, 3.1, PhaseScores::default(), 12),
//!     MetricRecord::new(1, 0.6, 3.4, PhaseScores::default(), 15),
//! ];
//! let session = Session::builder("gpt-3.5-turbo", "0")
//!     .responses(vec!["first".into(), "second".into()])
//!     .metrics(metrics)
//!     .build();
//!
//! assert_eq!(session.coherence_series(), vec![0.4, 0.6]);
//! ```

mod cycle_summary;
mod metric_record;
mod session_record;
mod store;

pub use cycle_summary::{CycleSummary, PhaseTransition, SessionStatistics, Trajectory};
pub use metric_record::{MetricRecord, MetricRecordBuilder};
pub use session_record::{Session, SessionBuilder};
pub use store::{expand_paths, session_file_name, SessionStore};
