//! Wall-clock port
//!
//! Everything time-dependent (record timestamps, the once-per-day prune rule,
//! line ages) reads the clock through [`IClock`] so tests can pin it.

use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};

/// Source of the current local wall-clock time
pub trait IClock: Send + Sync {
    /// Current time in the host's local time zone, without offset
    fn now(&self) -> NaiveDateTime;
}

/// The real clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl IClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at a given instant, movable by hand
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`
    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl IClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
