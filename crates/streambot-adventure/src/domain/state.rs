//! Adventure lifecycle state machine.

use serde::Serialize;

use super::errors::AdventureError;

/// Lifecycle state of the adventure game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdventureState {
    /// No round exists.
    #[default]
    Idle,
    /// A round accepts entrants until the join window closes.
    JoinOpen,
    /// The story is being narrated; the roster is frozen.
    Running,
}

/// Events that move the lifecycle forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// The first entrant of an idle period joined.
    FirstJoin,
    /// The join window timer fired.
    JoinWindowClosed,
    /// Payouts were settled.
    Settled,
    /// The round was torn down without settling.
    Aborted,
}

impl AdventureState {
    /// Applies `event`, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns `AdventureError::IllegalTransition` for any pair not in the
    /// lifecycle.
    pub fn transition(self, event: RoundEvent) -> Result<Self, AdventureError> {
        match (self, event) {
            (Self::Idle, RoundEvent::FirstJoin) => Ok(Self::JoinOpen),
            (Self::JoinOpen, RoundEvent::JoinWindowClosed) => Ok(Self::Running),
            (Self::Running, RoundEvent::Settled)
            | (Self::JoinOpen | Self::Running, RoundEvent::Aborted) => Ok(Self::Idle),
            (from, event) => Err(AdventureError::IllegalTransition { from, event }),
        }
    }
}
