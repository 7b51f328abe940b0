//! Domain model for the adventure game: lifecycle, entrants, roster,
//! stories and payout accounting.

pub mod entrant;
pub mod errors;
pub mod ledger;
pub mod roster;
pub mod state;
pub mod story;
