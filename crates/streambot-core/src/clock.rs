//! Clock abstraction for determinism.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Abstraction over wall-clock time for deterministic behavior.
///
/// Only used for informational timestamps (next run, recorded outcomes).
/// Round timing runs on the async runtime's monotonic timer.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the time `delay` from now, clamped to now if it overflows.
    fn after(&self, delay: Duration) -> DateTime<Utc> {
        let now = self.now();
        TimeDelta::from_std(delay)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(now)
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
