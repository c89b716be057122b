// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Wall-clock commit timestamps.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: u64 = 1_000_000_000;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// A wall-clock instant in nanoseconds since the Unix epoch.
///
/// Commit timestamps are advisory: they drive human-facing `AT(TIMESTAMP => ..)`
/// lookups, offset arithmetic and retention windows, but never ordering.
/// Ordering between commits is decided solely by commit id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from nanoseconds since the Unix epoch.
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a timestamp from whole seconds since the Unix epoch.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Returns nanoseconds since the Unix epoch.
    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Returns whole seconds since the Unix epoch.
    #[inline]
    pub const fn as_secs(&self) -> u64 {
        self.0 / NANOS_PER_SEC
    }

    /// Adds a duration, saturating at the maximum representable instant.
    #[inline]
    pub fn saturating_add(&self, d: Duration) -> Self {
        Self(self.0.saturating_add(d.as_nanos().min(u64::MAX as u128) as u64))
    }

    /// Subtracts a duration, saturating at the epoch.
    #[inline]
    pub fn saturating_sub(&self, d: Duration) -> Self {
        Self(self.0.saturating_sub(d.as_nanos().min(u64::MAX as u128) as u64))
    }

    /// Shifts the timestamp by a signed number of seconds.
    pub fn offset_secs(&self, secs: i64) -> Self {
        let d = Duration::from_secs(secs.unsigned_abs());
        if secs >= 0 {
            self.saturating_add(d)
        } else {
            self.saturating_sub(d)
        }
    }

    /// Returns the instant `days` whole days before this one.
    #[inline]
    pub fn days_before(&self, days: u32) -> Self {
        self.saturating_sub(days_to_duration(days))
    }

    /// Returns the instant `days` whole days after this one.
    #[inline]
    pub fn days_after(&self, days: u32) -> Self {
        self.saturating_add(days_to_duration(days))
    }

    /// Returns the elapsed duration since `earlier`, or zero if `earlier` is later.
    #[inline]
    pub fn since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

/// Converts a whole-day retention setting into a duration.
#[inline]
pub fn days_to_duration(days: u32) -> Duration {
    Duration::from_secs(u64::from(days) * SECS_PER_DAY)
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.0 / NANOS_PER_SEC, self.0 % NANOS_PER_SEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_secs() {
        let ts = Timestamp::from_secs(10);
        assert_eq!(ts.as_nanos(), 10 * NANOS_PER_SEC);
        assert_eq!(ts.as_secs(), 10);
    }

    #[test]
    fn test_offset_secs() {
        let ts = Timestamp::from_secs(100);
        assert_eq!(ts.offset_secs(-40), Timestamp::from_secs(60));
        assert_eq!(ts.offset_secs(5), Timestamp::from_secs(105));
        assert_eq!(ts.offset_secs(0), ts);
    }

    #[test]
    fn test_saturating_bounds() {
        let ts = Timestamp::from_secs(10);
        assert_eq!(ts.offset_secs(-100), Timestamp::EPOCH);
        assert_eq!(
            Timestamp::from_nanos(u64::MAX).saturating_add(Duration::from_secs(1)),
            Timestamp::from_nanos(u64::MAX)
        );
    }

    #[test]
    fn test_days_arithmetic() {
        let ts = Timestamp::from_secs(10 * SECS_PER_DAY);
        assert_eq!(ts.days_before(3), Timestamp::from_secs(7 * SECS_PER_DAY));
        assert_eq!(ts.days_after(1), Timestamp::from_secs(11 * SECS_PER_DAY));
        assert_eq!(ts.days_before(0), ts);
    }

    #[test]
    fn test_since() {
        let a = Timestamp::from_secs(5);
        let b = Timestamp::from_secs(8);
        assert_eq!(b.since(a), Duration::from_secs(3));
        assert_eq!(a.since(b), Duration::ZERO);
    }

    #[test]
    fn test_display() {
        let ts = Timestamp::from_nanos(1_500_000_000);
        assert_eq!(ts.to_string(), "1.500000000");
    }
}
