//! Clock seam for timestamp generation.
//!
//! Services never call `Utc::now()` directly; they go through a [`Clock`]
//! so time-based behavior (cycle times, pause durations, retry windows) is
//! deterministic under test.

use crate::domain::TimestampUtc;
use chrono::Duration;
use std::sync::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimestampUtc;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampUtc {
        TimestampUtc::now()
    }
}

/// A clock that only moves when told to. Intended for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<TimestampUtc>,
}

impl ManualClock {
    /// Starts the clock at the given instant.
    pub fn starting_at(start: TimestampUtc) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Advances the clock by whole minutes.
    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = TimestampUtc(now.0 + Duration::minutes(minutes));
    }

    /// Moves the clock to an absolute instant.
    pub fn set(&self, instant: TimestampUtc) {
        *self.now.lock().expect("clock lock poisoned") = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimestampUtc {
        *self.now.lock().expect("clock lock poisoned")
    }
}
