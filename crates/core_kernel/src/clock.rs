//! Clock seam for date-dependent derivations
//!
//! Overdue status depends on "today". Threading a `Clock` through the
//! engine instead of reading the system date inline keeps the status
//! machine deterministic and testable.

use chrono::{Local, NaiveDate};

/// Supplies the current local date
pub trait Clock: Send + Sync {
    /// Returns today's date
    fn today(&self) -> NaiveDate;
}

/// Production clock backed by the system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Test clock pinned to a fixed date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
