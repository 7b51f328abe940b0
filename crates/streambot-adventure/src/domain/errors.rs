//! Errors raised by the adventure game.

use streambot_core::error::DomainError;
use streambot_core::user::UserId;
use thiserror::Error;

use super::state::{AdventureState, RoundEvent};
use super::story::RenderError;

/// Errors raised by adventure operations.
#[derive(Debug, Error)]
pub enum AdventureError {
    /// The round is already running; new entrants are not accepted.
    #[error("an adventure is already under way")]
    RoundInProgress,

    /// The user already holds an entry in the current round.
    #[error("user {0} has already joined this adventure")]
    AlreadyJoined(UserId),

    /// Bets must be positive.
    #[error("bet must be greater than zero")]
    InvalidBet,

    /// The lifecycle does not allow this event in the current state.
    #[error("cannot apply {event:?} while {from:?}")]
    IllegalTransition {
        /// The state the round was in.
        from: AdventureState,
        /// The event that was rejected.
        event: RoundEvent,
    },

    /// A chapter template could not be rendered.
    #[error("chapter render failed: {0}")]
    Render(#[from] RenderError),

    /// A collaborator or configuration error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}
