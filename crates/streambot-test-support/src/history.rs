//! Test round histories — mock `RoundHistory` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use streambot_core::error::DomainError;
use streambot_core::history::{RoundHistory, RoundOutcome};

/// A round history that records every outcome.
#[derive(Debug, Default)]
pub struct RecordingRoundHistory {
    outcomes: Mutex<Vec<RoundOutcome>>,
}

impl RecordingRoundHistory {
    /// Create an empty recording history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded outcomes.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn outcomes(&self) -> Vec<RoundOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoundHistory for RecordingRoundHistory {
    async fn record_outcome(&self, outcome: &RoundOutcome) -> Result<(), DomainError> {
        self.outcomes.lock().unwrap().push(outcome.clone());
        Ok(())
    }
}

/// A round history that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingRoundHistory;

#[async_trait]
impl RoundHistory for FailingRoundHistory {
    async fn record_outcome(&self, _outcome: &RoundOutcome) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
