//! Streambot — Adventure mini-game.
//!
//! Chat participants wager points during a join window; the bot then narrates
//! a random story over delayed chat messages and pays out the survivors.

pub mod application;
pub mod domain;
