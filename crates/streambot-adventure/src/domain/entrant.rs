//! Entrants: one stake each in a round.

use serde::Serialize;
use streambot_core::rng::DeterministicRng;
use streambot_core::settings::Multiplier;
use streambot_core::user::UserRef;

/// Who placed a stake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A chat user betting for themselves.
    User(UserRef),
    /// A user's companion, settled through its owner.
    Companion {
        /// The companion's name, used in narration.
        name: String,
        /// The user the companion belongs to.
        owner: UserRef,
    },
}

impl Identity {
    /// The user that pays for and is paid for this stake.
    #[must_use]
    pub fn owner(&self) -> &UserRef {
        match self {
            Self::User(user) | Self::Companion { owner: user, .. } => user,
        }
    }

    /// The name used in chat narration.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(user) => &user.display_name,
            Self::Companion { name, .. } => name,
        }
    }

    /// Whether this stake was placed by a companion.
    #[must_use]
    pub fn is_companion(&self) -> bool {
        matches!(self, Self::Companion { .. })
    }
}

/// The two sides of an adventure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Survivors are paid out.
    Survivors,
    /// Victims forfeit their bet.
    Victims,
}

impl Team {
    /// Draws a team with an unbiased coin flip.
    pub fn draw(rng: &mut dyn DeterministicRng) -> Self {
        if rng.coin_flip() {
            Self::Survivors
        } else {
            Self::Victims
        }
    }
}

/// One stake participating in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrant {
    /// Who placed the stake.
    pub identity: Identity,
    /// Points wagered; already withdrawn from the owner.
    pub bet: u64,
    /// Multiplier in effect when the stake was placed.
    pub multiplier: Multiplier,
    /// Side drawn for this stake, fixed for the round.
    pub team: Team,
}

impl Entrant {
    /// Points owed for this stake: `bet × multiplier` for survivors, zero
    /// for victims.
    #[must_use]
    pub fn payout(&self) -> u64 {
        match self.team {
            Team::Survivors => self.multiplier.apply(self.bet),
            Team::Victims => 0,
        }
    }
}
