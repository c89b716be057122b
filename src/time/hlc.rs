// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Wall-clock source for commit timestamps.
//!
//! Follows physical time, but bumps by one nanosecond whenever the system
//! clock stalls or steps backwards, so commit times handed to the ledger never
//! regress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{Clock, Timestamp};

/// Hybrid Logical Clock.
///
/// Guarantees that each call to `now()` returns a timestamp strictly greater than
/// all previous calls, even under concurrent access.
#[derive(Debug, Default)]
pub struct HlcClock {
    last_nanos: AtomicU64,
}

impl HlcClock {
    /// Creates a new clock.
    pub fn new() -> Self {
        Self::default()
    }

    fn physical_time_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

impl Clock for HlcClock {
    fn now(&self) -> Timestamp {
        loop {
            let physical = Self::physical_time_nanos();
            let last = self.last_nanos.load(Ordering::Acquire);
            let next = physical.max(last.saturating_add(1));

            match self
                .last_nanos
                .compare_exchange(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Timestamp::from_nanos(next),
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_increasing() {
        let hlc = HlcClock::new();
        let mut last = hlc.now();

        for _ in 0..1000 {
            let current = hlc.now();
            assert!(current > last, "HLC must be strictly increasing");
            last = current;
        }
    }

    #[test]
    fn test_strictly_increasing_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let hlc = Arc::new(HlcClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let hlc = Arc::clone(&hlc);
                thread::spawn(move || {
                    let mut last = hlc.now();
                    for _ in 0..1000 {
                        let current = hlc.now();
                        assert!(current > last);
                        last = current;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }
    }

    #[test]
    fn test_hlc_tracks_wall_clock() {
        let hlc = HlcClock::new();
        let wall = HlcClock::physical_time_nanos();
        assert!(hlc.now().as_nanos() >= wall);
    }
}
