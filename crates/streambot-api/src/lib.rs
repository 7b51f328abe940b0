//! Streambot API — HTTP surface, configuration and adapters for the
//! adventure game service.

pub mod config;
pub mod error;
pub mod messenger;
pub mod routes;
pub mod state;
