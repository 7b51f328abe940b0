//! Round history port.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::user::UserId;

/// How an entrant's stake ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The entrant survived and the payout was credited.
    Won,
    /// The entrant was a victim and forfeited the bet.
    Lost,
    /// The entrant survived but crediting the owner failed; kept for
    /// reconciliation with a zero payout.
    CreditFailed,
}

impl OutcomeStatus {
    /// Stable string form used for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Lost => "lost",
            Self::CreditFailed => "credit_failed",
        }
    }
}

impl FromStr for OutcomeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            "credit_failed" => Ok(Self::CreditFailed),
            other => Err(DomainError::Validation(format!(
                "unknown outcome status: {other}"
            ))),
        }
    }
}

/// One entrant's result in a finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// The round this outcome belongs to.
    pub round_id: Uuid,
    /// The user who owns the stake.
    pub user_id: UserId,
    /// The amount wagered.
    pub bet: u64,
    /// The amount credited for this stake.
    pub payout: u64,
    /// Whether the stake was placed by the user's companion.
    pub companion: bool,
    /// How the stake ended.
    pub status: OutcomeStatus,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Persistent history of round outcomes.
#[async_trait]
pub trait RoundHistory: Send + Sync {
    /// Record one entrant's outcome.
    async fn record_outcome(&self, outcome: &RoundOutcome) -> Result<(), DomainError>;
}
