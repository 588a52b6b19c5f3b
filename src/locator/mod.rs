//! Resilient element location on pages whose markup is not under our control.
//!
//! - [`SelectorStrategy`]: one matching heuristic plus its acceptance rules
//! - [`score`]: ranking of the matches a single strategy produced
//! - [`locate`]: priority-ordered, deadline-bounded polling over a strategy list
//! - [`diagnose`]: a one-shot report of what every strategy sees

pub mod engine;
pub mod score;
pub mod strategy;

pub use engine::{DiagnosedElement, StrategyReport, diagnose, locate};
pub use score::Scoring;
pub use strategy::{Matcher, SelectorStrategy, SizeRange, Validator};

use crate::dom::ElementSnapshot;
use crate::error::{RelayError, Result};
use serde::Serialize;
use std::time::Duration;

/// A validated, scored match from one locate attempt
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub element: ElementSnapshot,
    pub score: f64,
    /// Id of the strategy that produced the match
    pub source: String,
}

/// Outcome of one [`locate`] call
#[derive(Debug, Clone, Serialize)]
pub struct LocateResult {
    pub found: bool,
    pub element: Option<Candidate>,
    pub attempts_made: u32,
    pub elapsed_ms: u64,
    /// Times the document context changed while polling
    pub context_resets: u32,
}

/// Timing bounds for [`locate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    pub deadline: Duration,
    pub poll_interval: Duration,
}

impl LocateOptions {
    pub fn new(deadline: Duration, poll_interval: Duration) -> Self {
        Self { deadline, poll_interval }
    }

    pub fn from_millis(deadline_ms: u64, poll_interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(deadline_ms), Duration::from_millis(poll_interval_ms))
    }

    /// The poll interval must be positive and no longer than the deadline
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(RelayError::InvalidArgument("poll interval must be greater than zero".to_string()));
        }
        if self.poll_interval > self.deadline {
            return Err(RelayError::InvalidArgument(format!(
                "poll interval {:?} exceeds deadline {:?}",
                self.poll_interval, self.deadline
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_options_validation() {
        assert!(LocateOptions::from_millis(1000, 100).validate().is_ok());
        assert!(LocateOptions::from_millis(1000, 1000).validate().is_ok());
        assert!(LocateOptions::from_millis(1000, 0).validate().is_err());
        assert!(LocateOptions::from_millis(100, 1000).validate().is_err());
    }
}
