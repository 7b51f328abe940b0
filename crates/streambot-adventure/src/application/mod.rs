//! Application services: story catalog, round timeline, the orchestrator
//! and live settings.

pub mod catalog;
pub mod orchestrator;
pub mod settings;
pub mod timeline;
