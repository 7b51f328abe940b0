//! Streambot Store — `PostgreSQL` adapters for the collaborator ports.
//!
//! Tables are created by the migrations in the workspace `migrations/`
//! directory. Point balances and stakes are `BIGINT` columns; values that do
//! not fit either side of the `u64`/`i64` boundary are rejected rather than
//! wrapped.

pub mod pg_accounts;
pub mod pg_round_history;

use streambot_core::error::DomainError;

pub(crate) fn storage_error(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(e.to_string())
}

pub(crate) fn to_column(field: &str, value: u64) -> Result<i64, DomainError> {
    i64::try_from(value)
        .map_err(|_| DomainError::Validation(format!("{field} out of range: {value}")))
}

pub(crate) fn from_column(field: &str, value: i64) -> Result<u64, DomainError> {
    u64::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative {field} in storage: {value}")))
}
