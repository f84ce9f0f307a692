//! [`Clock`] implementations.

use std::sync::atomic::{AtomicU64, Ordering};

use tranche_core::traits::Clock;
use tranche_core::types::Timestamp;

/// Wall-clock time in whole UTC seconds since the Unix epoch.
///
/// Readings before the epoch clamp to 0. Consecutive readings never go
/// backwards even if the host clock is stepped back.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp().max(0) as Timestamp;
        let prev = self.last.fetch_max(wall, Ordering::AcqRel);
        prev.max(wall)
    }
}

/// Externally driven clock for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move to `t`. Earlier times are ignored. Returns the resulting reading.
    pub fn set(&self, t: Timestamp) -> Timestamp {
        let prev = self.now.fetch_max(t, Ordering::AcqRel);
        prev.max(t)
    }

    /// Move forward by `seconds`, saturating at `Timestamp::MAX`.
    pub fn advance(&self, seconds: u64) -> Timestamp {
        let step = |t: Timestamp| Some(t.saturating_add(seconds));
        match self.now.fetch_update(Ordering::AcqRel, Ordering::Acquire, step) {
            Ok(prev) | Err(prev) => prev.saturating_add(seconds),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }
}
