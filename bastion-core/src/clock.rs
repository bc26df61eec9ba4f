//! Wall clock access.
//!
//! Placement timestamps and spawn time windows read the wall clock through
//! [`Clock`] so tests can drive time by hand.
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Local, NaiveTime, Timelike, Utc};
use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the unix epoch.
    fn now_millis(&self) -> i64;

    /// The local time of day.
    fn time_of_day(&self) -> NaiveTime;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn time_of_day(&self) -> NaiveTime {
        let now = Local::now().time();
        // Minute precision, matching the `HH:mm` windows it is compared against
        now.with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now)
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    millis: AtomicI64,
    time_of_day: Mutex<NaiveTime>,
}

impl ManualClock {
    /// Creates a clock at the given epoch millis and midnight.
    #[must_use]
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
            time_of_day: Mutex::new(NaiveTime::MIN),
        }
    }

    /// Sets the epoch millis.
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Moves the epoch millis forward.
    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Sets the time of day.
    pub fn set_time_of_day(&self, time: NaiveTime) {
        *self.time_of_day.lock() = time;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn time_of_day(&self) -> NaiveTime {
        *self.time_of_day.lock()
    }
}
