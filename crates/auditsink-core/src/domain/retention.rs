//! Retention policy
//!
//! A window, in whole days, that audit lines are kept for. Anything below one
//! day disables pruning entirely.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::log_line::age_in_days;

/// How long audit lines are retained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    keep_for_days: i64,
}

impl RetentionPolicy {
    pub fn new(keep_for_days: i64) -> Self {
        Self { keep_for_days }
    }

    /// A policy that never prunes
    pub fn disabled() -> Self {
        Self { keep_for_days: 0 }
    }

    pub fn keep_for_days(&self) -> i64 {
        self.keep_for_days
    }

    /// Returns true if pruning should run at all
    pub fn is_enabled(&self) -> bool {
        self.keep_for_days >= 1
    }

    /// Returns true if a line dated `date` survives a prune at `now`
    ///
    /// Inclusive: a line exactly `keep_for_days` old is retained.
    pub fn retains(&self, date: NaiveDate, now: NaiveDateTime) -> bool {
        age_in_days(date, now) <= self.keep_for_days
    }
}
