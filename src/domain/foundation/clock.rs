//! Injectable clock for all billing time math.
//!
//! Penalty accrual, grace-period expiry and reminder windows are pure
//! given "now"; components take `Arc<dyn Clock>` instead of calling the
//! system clock so tests can time-travel deterministically.

use std::sync::{Mutex, PoisonError};

use super::Timestamp;

/// Source of the current moment.
pub trait Clock: Send + Sync {
    /// Returns the current moment.
    fn now(&self) -> Timestamp;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Settable clock for deterministic tests.
///
/// Lives with the production code rather than behind `cfg(test)` so the
/// integration suite can drive it too.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    /// Creates a clock frozen at the given moment.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Moves the clock to an absolute moment.
    pub fn set(&self, to: Timestamp) {
        *self.lock() = to;
    }

    /// Advances the clock by whole days.
    pub fn advance_days(&self, days: i64) {
        let mut current = self.lock();
        *current = current.plus_days(days);
    }

    /// Advances the clock by seconds.
    pub fn advance_secs(&self, secs: i64) {
        let mut current = self.lock();
        *current = current.plus_secs(secs);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Timestamp> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Timestamp::now();
        let now = SystemClock.now();
        let after = Timestamp::now();

        assert!(!now.is_before(&before));
        assert!(!now.is_after(&after));
    }

    #[test]
    fn manual_clock_stays_frozen_until_moved() {
        let start = Timestamp::from_unix_secs(1_700_000_000);
        let clock = ManualClock::new(start);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn manual_clock_advances_by_days() {
        let start = Timestamp::from_unix_secs(1_700_000_000);
        let clock = ManualClock::new(start);

        clock.advance_days(3);
        assert_eq!(clock.now(), start.plus_days(3));
    }

    #[test]
    fn manual_clock_set_jumps_to_absolute_moment() {
        let clock = ManualClock::new(Timestamp::from_unix_secs(1_700_000_000));
        let later = Timestamp::from_unix_secs(1_800_000_000);

        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn manual_clock_is_shareable_across_threads() {
        use std::sync::Arc;

        let clock = Arc::new(ManualClock::new(Timestamp::from_unix_secs(1_000)));
        let cloned = Arc::clone(&clock);

        let handle = std::thread::spawn(move || {
            cloned.advance_secs(60);
        });
        handle.join().unwrap();

        assert_eq!(clock.now().as_unix_secs(), 1_060);
    }
}
