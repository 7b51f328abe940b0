//! Shared test mocks and utilities for the Streambot chat bot.

mod accounts;
mod clock;
mod history;
mod messenger;
mod rng;
mod settings;

pub use accounts::InMemoryAccounts;
pub use clock::FixedClock;
pub use history::{FailingRoundHistory, RecordingRoundHistory};
pub use messenger::{FailingMessenger, RecordingMessenger};
pub use rng::{MockRng, SequenceRng};
pub use settings::{MissingSettings, StaticSettings};
