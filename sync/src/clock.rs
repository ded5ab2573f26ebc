//! Time source for sync watermarks.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// Where the sync engine reads "now" from.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to, in whole seconds.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(secs),
        }
    }

    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.secs.load(Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at(100);
        assert_eq!(clock.now().timestamp(), 100);
        clock.set(250);
        assert_eq!(clock.now().timestamp(), 250);
    }
}
