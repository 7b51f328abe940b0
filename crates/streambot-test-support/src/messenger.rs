//! Test messengers — mock `Messenger` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use streambot_core::error::DomainError;
use streambot_core::messenger::Messenger;

/// A messenger that records every posted message.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    posted: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    /// Create an empty recording messenger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all posted messages, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn posted(&self) -> Vec<String> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn post(&self, text: &str) -> Result<(), DomainError> {
        self.posted.lock().unwrap().push(text.to_owned());
        Ok(())
    }
}

/// A messenger that always fails. Useful for testing failure isolation.
#[derive(Debug)]
pub struct FailingMessenger;

#[async_trait]
impl Messenger for FailingMessenger {
    async fn post(&self, _text: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("chat connection lost".into()))
    }
}
