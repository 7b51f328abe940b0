//! `PostgreSQL` implementation of the `Accounts` port.

use async_trait::async_trait;
use sqlx::PgPool;
use streambot_core::accounts::Accounts;
use streambot_core::error::DomainError;
use streambot_core::user::{User, UserId};
use tracing::debug;

use crate::{from_column, storage_error, to_column};

/// PostgreSQL-backed point balances, stored in the `users` table.
#[derive(Debug, Clone)]
pub struct PgAccounts {
    pool: PgPool,
}

impl PgAccounts {
    /// Creates a new `PgAccounts`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Accounts for PgAccounts {
    async fn get_user(&self, user_id: UserId) -> Result<User, DomainError> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT id, display_name, points FROM users WHERE id = $1")
                .bind(user_id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        let (id, display_name, points) = row.ok_or(DomainError::UserNotFound(user_id))?;
        Ok(User {
            id: UserId(id),
            display_name,
            balance: from_column("points", points)?,
        })
    }

    async fn credit(&self, user_id: UserId, amount: u64) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE users SET points = points + $2 WHERE id = $1")
            .bind(user_id.0)
            .bind(to_column("amount", amount)?)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(user_id));
        }
        debug!(%user_id, amount, "points credited");
        Ok(())
    }

    async fn withdraw(&self, user_id: UserId, amount: u64) -> Result<(), DomainError> {
        let remaining: Option<(i64,)> = sqlx::query_as(
            "UPDATE users SET points = points - $2 \
             WHERE id = $1 AND points >= $2 \
             RETURNING points",
        )
        .bind(user_id.0)
        .bind(to_column("amount", amount)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        if remaining.is_some() {
            debug!(%user_id, amount, "points withdrawn");
            return Ok(());
        }

        // Nothing updated: either the user is missing or the balance is short.
        let user = self.get_user(user_id).await?;
        Err(DomainError::InsufficientBalance {
            user_id,
            requested: amount,
            available: user.balance,
        })
    }
}
