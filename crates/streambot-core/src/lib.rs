//! Streambot Core — shared abstractions.
//!
//! This crate defines the fundamental traits and types that the game
//! components depend on: time, randomness, settings and the collaborator
//! ports (chat, accounts, round history). It contains no infrastructure code.

pub mod accounts;
pub mod clock;
pub mod error;
pub mod history;
pub mod messenger;
pub mod rng;
pub mod settings;
pub mod user;
