//! Accounts port for user lookup and point balances.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::user::{User, UserId};

/// User and balance storage.
#[async_trait]
pub trait Accounts: Send + Sync {
    /// Load a user by identifier.
    async fn get_user(&self, user_id: UserId) -> Result<User, DomainError>;

    /// Add `amount` points to a user's balance.
    async fn credit(&self, user_id: UserId, amount: u64) -> Result<(), DomainError>;

    /// Remove `amount` points from a user's balance.
    ///
    /// Fails with `DomainError::InsufficientBalance` without changing the
    /// balance when it cannot cover the amount.
    async fn withdraw(&self, user_id: UserId, amount: u64) -> Result<(), DomainError>;
}
