// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Clocks and commit timestamps.
//!
//! Wall-clock time is advisory in this crate. It answers "what did the table
//! look like at 09:00" and bounds retention windows, but commit ids alone
//! decide which of two commits happened first.
//!
//! # Example
//!
//! ```
//! use rewinddb::time::{Clock, HlcClock};
//!
//! let clock = HlcClock::new();
//! let a = clock.now();
//! let b = clock.now();
//! assert!(b > a);
//! ```

mod hlc;
mod manual;
mod timestamp;
mod traits;

pub use hlc::HlcClock;
pub use manual::ManualClock;
pub use timestamp::{days_to_duration, Timestamp};
pub use traits::Clock;
