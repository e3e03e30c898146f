//! Scan cycle stage machine
//!
//! `Idle -> Sampling -> Analyzing -> (Recording | Done)`, with `Recording ->
//! Done`. Any stage before `Done` may jump straight to `Done` when the cycle
//! ends early. `Done` is terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of one scan cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStage {
    Idle,
    Sampling,
    Analyzing,
    Recording,
    Done,
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Sampling => "sampling",
            Self::Analyzing => "analyzing",
            Self::Recording => "recording",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Illegal stage transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal stage transition: {from} -> {to}")]
pub struct StageError {
    from: ScanStage,
    to: ScanStage,
}

impl StageError {
    /// Stage the transition was attempted from
    #[inline]
    #[must_use]
    pub fn from_stage(&self) -> ScanStage {
        self.from
    }

    /// Requested target stage
    #[inline]
    #[must_use]
    pub fn to_stage(&self) -> ScanStage {
        self.to
    }
}

/// Stages reachable from `from`
#[must_use]
pub fn allowed_transitions(from: ScanStage) -> &'static [ScanStage] {
    use ScanStage::{Analyzing, Done, Idle, Recording, Sampling};
    match from {
        Idle => &[Sampling, Done],
        Sampling => &[Analyzing, Done],
        Analyzing => &[Recording, Done],
        Recording => &[Done],
        Done => &[],
    }
}

/// Validate a single transition
///
/// # Errors
/// Returns `StageError` if `to` is not reachable from `from`
pub fn validate_transition(from: ScanStage, to: ScanStage) -> Result<(), StageError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StageError { from, to })
    }
}

/// Tracks the current stage and the path taken
#[derive(Debug, Clone)]
pub struct StageTracker {
    history: Vec<ScanStage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    /// Start in `Idle`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: vec![ScanStage::Idle],
        }
    }

    /// Current stage
    #[inline]
    #[must_use]
    pub fn current(&self) -> ScanStage {
        self.history
            .last()
            .copied()
            .unwrap_or(ScanStage::Idle)
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns `StageError` on an illegal transition; the stage is unchanged
    pub fn advance(&mut self, to: ScanStage) -> Result<(), StageError> {
        validate_transition(self.current(), to)?;
        tracing::debug!(from = %self.current(), to = %to, "scan stage");
        self.history.push(to);
        Ok(())
    }

    /// Every stage visited, in order
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[ScanStage] {
        &self.history
    }

    /// Consume into the visited stages
    #[inline]
    #[must_use]
    pub fn into_history(self) -> Vec<ScanStage> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn happy_path_with_recording() {
        let mut tracker = StageTracker::new();
        for stage in [
            ScanStage::Sampling,
            ScanStage::Analyzing,
            ScanStage::Recording,
            ScanStage::Done,
        ] {
            tracker.advance(stage).unwrap();
        }
        assert_eq!(tracker.current(), ScanStage::Done);
        assert_eq!(tracker.history().len(), 5);
    }

    #[test]
    fn illegal_transitions_rejected() {
        assert!(validate_transition(ScanStage::Idle, ScanStage::Analyzing).is_err());
        assert!(validate_transition(ScanStage::Sampling, ScanStage::Recording).is_err());
        assert!(validate_transition(ScanStage::Done, ScanStage::Idle).is_err());

        let mut tracker = StageTracker::new();
        let err = tracker.advance(ScanStage::Recording).unwrap_err();
        assert_eq!(err.from_stage(), ScanStage::Idle);
        assert_eq!(err.to_stage(), ScanStage::Recording);
        assert_eq!(tracker.current(), ScanStage::Idle);
    }

    #[test]
    fn config_failure_ends_from_idle() {
        let mut tracker = StageTracker::new();
        assert!(tracker.advance(ScanStage::Done).is_ok());
        assert!(tracker.advance(ScanStage::Sampling).is_err());
    }

    fn any_stage() -> impl Strategy<Value = ScanStage> {
        prop_oneof![
            Just(ScanStage::Idle),
            Just(ScanStage::Sampling),
            Just(ScanStage::Analyzing),
            Just(ScanStage::Recording),
            Just(ScanStage::Done),
        ]
    }

    proptest! {
        #[test]
        fn prop_validation_matches_allowed(from in any_stage(), to in any_stage()) {
            let ok = validate_transition(from, to).is_ok();
            prop_assert_eq!(ok, allowed_transitions(from).contains(&to));
        }

        #[test]
        fn prop_done_is_terminal(to in any_stage()) {
            prop_assert!(validate_transition(ScanStage::Done, to).is_err());
        }
    }
}
