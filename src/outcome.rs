//! Explicit "insufficient data" results
//!
//! Cycle, momentum and resilience computations need a minimum number of
//! valid turns. Below that they report how much data was required instead
//! of producing a number.

use serde::{Deserialize, Serialize};

/// Result of a computation with a minimum-data requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Enough data was available; carries the computed value.
    Measured(T),
    /// Not enough data to compute anything meaningful.
    #[serde(rename = "insufficient_data")]
    Insufficient {
        /// Minimum number of items the computation needs
        required: usize,
        /// Number of items actually available
        available: usize,
    },
}

impl<T> Outcome<T> {
    /// Build the insufficient variant when `available < required`,
    /// otherwise evaluate `f`.
    pub fn require(required: usize, available: usize, f: impl FnOnce() -> T) -> Self {
        if available < required {
            Self::Insufficient {
                required,
                available,
            }
        } else {
            Self::Measured(f())
        }
    }

    /// Borrow the measured value, if any.
    #[must_use]
    pub const fn measured(&self) -> Option<&T> {
        match self {
            Self::Measured(value) => Some(value),
            Self::Insufficient { .. } => None,
        }
    }

    /// Take the measured value, if any.
    #[must_use]
    pub fn into_measured(self) -> Option<T> {
        match self {
            Self::Measured(value) => Some(value),
            Self::Insufficient { .. } => None,
        }
    }

    /// True when the computation lacked data.
    #[must_use]
    pub const fn is_insufficient(&self) -> bool {
        matches!(self, Self::Insufficient { .. })
    }

    /// Transform the measured value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Measured(value) => Outcome::Measured(f(value)),
            Self::Insufficient {
                required,
                available,
            } => Outcome::Insufficient {
                required,
                available,
            },
        }
    }
}
