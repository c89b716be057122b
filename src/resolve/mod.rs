// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time resolution.
//!
//! Every `AT(...)` / `BEFORE(...)` reference is first bound to a [`Cut`] over
//! the ledger's total order, then resolved per object to the newest entry the
//! cut admits.
//!
//! # Semantics
//!
//! - `TIMESTAMP`: last commit with `time <= t` (AT) or `time < t` (BEFORE).
//! - `OFFSET`: `TIMESTAMP => now + secs`; positive offsets are future times.
//! - `STATEMENT`: state after the statement's commit (AT) or the immediately
//!   preceding entry by commit id (BEFORE). Wall-clock time plays no part.
//! - `STREAM`: state at the stream's offset, AT only.

mod point;
mod resolver;

pub use point::{Anchor, BoundPoint, Cut, PointInTime, ResolvedVersion, TimeRef};
pub use resolver::PointInTimeResolver;
