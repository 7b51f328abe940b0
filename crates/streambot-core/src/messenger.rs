//! Chat messenger port.

use async_trait::async_trait;

use crate::error::DomainError;

/// Posts rendered text to the channel chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a message to chat.
    async fn post(&self, text: &str) -> Result<(), DomainError>;
}
