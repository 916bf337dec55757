use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};

/// Source of wall-clock time for completion stamps and notice keys.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, at: OffsetDateTime) {
        *self.now.lock() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use time::Duration;
    use time::macros::datetime;

    #[test]
    fn manual_clock_advances_only_on_request() {
        let clock = ManualClock::new(datetime!(2025-12-20 09:00 UTC));
        assert_eq!(clock.now(), datetime!(2025-12-20 09:00 UTC));

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), datetime!(2025-12-20 09:05 UTC));

        clock.set(datetime!(2026-01-01 00:00 UTC));
        assert_eq!(clock.now(), datetime!(2026-01-01 00:00 UTC));
    }
}
