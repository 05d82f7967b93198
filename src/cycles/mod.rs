//! Cycle and transition detection
//!
//! Works on the per-turn coherence sequence of a session:
//!
//! - [`peaks`]: scipy-compatible local extremum search
//! - [`smoothing`]: Gaussian smoothing with reflected edges
//! - [`transitions`]: dominant-phase changes between adjacent turns
//! - [`detector`]: the [`CycleDetector`] producing a [`CycleSummary`]
//! - [`partial`]: micro-cycles, momentum, crisis points and resilience
//!
//! [`CycleSummary`]: crate::session::CycleSummary

pub mod detector;
pub mod partial;
pub mod peaks;
pub mod smoothing;
pub mod transitions;

pub use detector::{CycleDetector, SmoothedCycles};
pub use partial::{
    detect_crisis_points, detect_micro_cycles, phase_momentum, resilience_score, MicroCycles,
    MomentumDirection, PhaseMomentum,
};
pub use peaks::{find_peaks, find_troughs, PeakOptions};
pub use smoothing::gaussian_filter1d;
pub use transitions::detect_phase_transitions;
