//! `PostgreSQL` implementation of the `RoundHistory` port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use streambot_core::error::DomainError;
use streambot_core::history::{OutcomeStatus, RoundHistory, RoundOutcome};
use streambot_core::user::UserId;
use uuid::Uuid;

use crate::{from_column, storage_error, to_column};

type OutcomeRow = (Uuid, i64, i64, i64, bool, String, DateTime<Utc>);

/// PostgreSQL-backed round history, stored in the `adventure_records` table.
#[derive(Debug, Clone)]
pub struct PgRoundHistory {
    pool: PgPool,
}

impl PgRoundHistory {
    /// Creates a new `PgRoundHistory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads every outcome recorded for `round_id`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails or a stored
    /// row cannot be decoded.
    pub async fn outcomes_for_round(&self, round_id: Uuid) -> Result<Vec<RoundOutcome>, DomainError> {
        let rows: Vec<OutcomeRow> = sqlx::query_as(
            "SELECT round_id, user_id, bet, payout, companion, status, recorded_at \
             FROM adventure_records WHERE round_id = $1 ORDER BY id",
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(decode).collect()
    }
}

fn decode(row: OutcomeRow) -> Result<RoundOutcome, DomainError> {
    let (round_id, user_id, bet, payout, companion, status, recorded_at) = row;
    Ok(RoundOutcome {
        round_id,
        user_id: UserId(user_id),
        bet: from_column("bet", bet)?,
        payout: from_column("payout", payout)?,
        companion,
        status: status
            .parse::<OutcomeStatus>()
            .map_err(|e| DomainError::Infrastructure(e.to_string()))?,
        recorded_at,
    })
}

#[async_trait]
impl RoundHistory for PgRoundHistory {
    async fn record_outcome(&self, outcome: &RoundOutcome) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO adventure_records \
             (round_id, user_id, bet, payout, companion, status, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(outcome.round_id)
        .bind(outcome.user_id.0)
        .bind(to_column("bet", outcome.bet)?)
        .bind(to_column("payout", outcome.payout)?)
        .bind(outcome.companion)
        .bind(outcome.status.as_str())
        .bind(outcome.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}
