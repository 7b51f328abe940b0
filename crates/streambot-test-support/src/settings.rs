//! Test settings sources.

use streambot_core::error::DomainError;
use streambot_core::settings::{RoundSettings, SettingsSource};

/// A settings source that always returns the same settings.
#[derive(Debug, Clone, Copy)]
pub struct StaticSettings(pub RoundSettings);

impl SettingsSource for StaticSettings {
    fn current_round_settings(&self) -> Result<RoundSettings, DomainError> {
        Ok(self.0)
    }
}

/// A settings source with nothing configured. Useful for testing
/// configuration-error paths.
#[derive(Debug, Clone, Copy)]
pub struct MissingSettings;

impl SettingsSource for MissingSettings {
    fn current_round_settings(&self) -> Result<RoundSettings, DomainError> {
        Err(DomainError::Configuration(
            "adventure settings are not configured".into(),
        ))
    }
}
