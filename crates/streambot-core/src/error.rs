//! Domain error types.

use thiserror::Error;

use crate::user::UserId;

/// Top-level error type shared by collaborators.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A user was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// A user's balance cannot cover a withdrawal.
    #[error("insufficient balance for user {user_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The user whose balance was checked.
        user_id: UserId,
        /// The requested amount.
        requested: u64,
        /// The balance available.
        available: u64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
