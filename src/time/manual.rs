// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Manually driven clock for deterministic tests and replays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{Clock, Timestamp};

/// A clock that only moves when told to.
///
/// `advance` and `set` never move the clock backwards, so the monotonicity
/// contract of [`Clock`] still holds.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: AtomicU64::new(start.as_nanos()),
        }
    }

    /// Moves the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        let delta = d.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(delta))
            });
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Moves the clock to `ts` if it is later than the current reading.
    pub fn set(&self, ts: Timestamp) {
        self.nanos.fetch_max(ts.as_nanos(), Ordering::AcqRel);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z, far enough from the epoch for day-sized windows
        Self::new(Timestamp::from_secs(1_704_067_200))
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
