//! Live-reloadable round settings.

use streambot_core::error::DomainError;
use streambot_core::settings::{RoundSettings, SettingsSource};
use tokio::sync::watch;

/// Round settings that can be replaced at runtime. Subscribers are notified
/// of every accepted update; rounds already open keep the values they
/// captured.
#[derive(Debug)]
pub struct LiveSettings {
    sender: watch::Sender<RoundSettings>,
}

impl LiveSettings {
    /// Creates live settings from an initial value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if `initial` is invalid.
    pub fn new(initial: RoundSettings) -> Result<Self, DomainError> {
        initial.validate()?;
        let (sender, _) = watch::channel(initial);
        Ok(Self { sender })
    }

    /// Replaces the settings.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` and keeps the previous value if
    /// `settings` is invalid.
    pub fn update(&self, settings: RoundSettings) -> Result<(), DomainError> {
        settings.validate()?;
        self.sender.send_replace(settings);
        Ok(())
    }

    /// Subscribes to settings changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RoundSettings> {
        self.sender.subscribe()
    }
}

impl SettingsSource for LiveSettings {
    fn current_round_settings(&self) -> Result<RoundSettings, DomainError> {
        Ok(*self.sender.borrow())
    }
}
