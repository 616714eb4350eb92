//! Time source injected into the controller.
//!
//! Production code uses [`SystemClock`]; tests drive timers with
//! [`ManualClock`] instead of sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};

pub trait Clock: Send + Sync {
    /// Monotonic time, used for every timer.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for timestamps shown to the user.
    fn utc_now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
///
/// Wall-clock time starts at 2024-06-01T12:00:00Z and advances in step
/// with the monotonic time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
    origin: Instant,
    utc_origin: DateTime<Utc>,
}

impl ManualClock {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            now: Arc::new(Mutex::new(origin)),
            origin,
            utc_origin: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap_or_default(),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.now() - self.origin)
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.utc_origin + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.advance_ms(250);
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn test_manual_clock_wall_time_follows_advance() {
        let clock = ManualClock::new();
        let start = clock.utc_now();

        clock.advance_ms(1_500);
        assert_eq!(
            clock.utc_now() - start,
            chrono::Duration::milliseconds(1_500)
        );
    }
}
