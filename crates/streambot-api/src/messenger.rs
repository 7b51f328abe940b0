//! Chat output through the tracing pipeline.

use async_trait::async_trait;
use streambot_core::error::DomainError;
use streambot_core::messenger::Messenger;
use tracing::info;

/// A messenger that emits every chat line as a structured log event on the
/// `chat` target. Stands in for a platform chat client.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn post(&self, text: &str) -> Result<(), DomainError> {
        info!(target: "chat", text, "chat message");
        Ok(())
    }
}
