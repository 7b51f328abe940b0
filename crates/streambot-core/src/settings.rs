//! Round settings and the settings source port.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Win multiplier with two decimal places of precision, stored as hundredths
/// so payouts stay exact integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiplier(u32);

impl Multiplier {
    /// Creates a multiplier from hundredths (`150` is `1.5x`).
    #[must_use]
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Creates a multiplier from a decimal ratio, rounded to hundredths.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the ratio is not finite, not
    /// positive, or too large to represent.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_ratio(ratio: f64) -> Result<Self, DomainError> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(DomainError::Validation(format!(
                "win multiplier must be a positive number, got {ratio}"
            )));
        }
        let hundredths = (ratio * 100.0).round();
        if hundredths < 1.0 || hundredths > f64::from(u32::MAX) {
            return Err(DomainError::Validation(format!(
                "win multiplier {ratio} is out of range"
            )));
        }
        Ok(Self(hundredths as u32))
    }

    /// Returns the raw hundredths value.
    #[must_use]
    pub const fn hundredths(self) -> u32 {
        self.0
    }

    /// Returns the multiplier as a decimal ratio.
    #[must_use]
    pub fn as_ratio(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Applies the multiplier to a stake, rounding down. Saturates at `u64::MAX`.
    #[must_use]
    pub fn apply(self, stake: u64) -> u64 {
        let scaled = u128::from(stake) * u128::from(self.0) / 100;
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / 100, self.0 % 100)
    }
}

/// Settings governing one adventure round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSettings {
    /// How long the join window stays open.
    pub join_timeout: Duration,
    /// Payout multiplier for survivors.
    pub win_multiplier: Multiplier,
    /// Suggested pause before the next round, for display only.
    pub cooldown: Duration,
}

impl RoundSettings {
    /// Checks the settings can drive a round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the join timeout or the
    /// multiplier is zero.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.join_timeout.is_zero() {
            return Err(DomainError::Configuration(
                "join timeout must be greater than zero".to_owned(),
            ));
        }
        if self.win_multiplier.hundredths() == 0 {
            return Err(DomainError::Configuration(
                "win multiplier must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Source of the currently effective round settings.
pub trait SettingsSource: Send + Sync {
    /// Returns the settings in effect right now.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if settings are missing or invalid.
    fn current_round_settings(&self) -> Result<RoundSettings, DomainError>;
}
