//! Shared application state.

use std::sync::Arc;

use streambot_adventure::application::orchestrator::AdventureOrchestrator;
use streambot_adventure::application::settings::LiveSettings;
use streambot_core::accounts::Accounts;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The running adventure game.
    pub orchestrator: AdventureOrchestrator,
    /// Point balances, used to take and refund bets.
    pub accounts: Arc<dyn Accounts>,
    /// Live round settings.
    pub settings: Arc<LiveSettings>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        orchestrator: AdventureOrchestrator,
        accounts: Arc<dyn Accounts>,
        settings: Arc<LiveSettings>,
    ) -> Self {
        Self {
            orchestrator,
            accounts,
            settings,
        }
    }
}
