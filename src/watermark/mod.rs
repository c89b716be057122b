// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Reclamation watermark.
//!
//! Physical removal of history lags the query-visible retention window. The
//! [`WatermarkGate`] keeps removal behind every in-flight read, and the
//! [`Reclaimer`] moves eligible entries to the [`ColdTier`] or discards them.

mod cold;
mod gate;
mod reclaimer;

pub use cold::{ArchivedVersion, ColdTier, InMemoryColdTier};
pub use gate::{ReadTicket, WatermarkGate};
pub use reclaimer::{ReclaimStats, Reclaimer, ReclaimerHandle};
