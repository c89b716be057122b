// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Clock trait definition.

use super::Timestamp;

/// The clock trait - implemented by the hybrid logical clock and the manual test clock.
///
/// All commit timestamps and "now" evaluations for retention windows flow
/// through this interface.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    ///
    /// Implementations must be monotonic: a later call never returns an
    /// earlier instant than a previous call on the same clock.
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    #[inline]
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
