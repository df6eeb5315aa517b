//! Wall-clock sources for record timestamps and identifiers.

use crate::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of producer-assigned time.
pub trait Clock: Send + Sync {
    /// Milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;

    /// Whole seconds since Unix epoch.
    fn now(&self) -> Timestamp {
        Timestamp(self.now_millis() / 1000)
    }
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // A clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn at_secs(secs: u64) -> Self {
        Self {
            millis: AtomicU64::new(secs.saturating_mul(1000)),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.millis.fetch_add(secs.saturating_mul(1000), Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at_secs(1_700_000_000);
        assert_eq!(clock.now(), Timestamp(1_700_000_000));

        clock.advance_secs(10);
        clock.advance_millis(999);
        assert_eq!(clock.now(), Timestamp(1_700_000_010));
        assert_eq!(clock.now_millis(), 1_700_000_010_999);
    }

    #[test]
    fn test_system_clock_is_past_2020() {
        assert!(SystemClock.now().0 > 1_577_836_800);
    }
}
