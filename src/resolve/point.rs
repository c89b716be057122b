// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time references and cuts.

use serde::{Deserialize, Serialize};

use crate::catalog::CommitMark;
use crate::ledger::{CommitId, StatementId, VersionEntry};
use crate::time::Timestamp;

/// Inclusive (`AT`) or exclusive (`BEFORE`) resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Anchor {
    At,
    Before,
}

/// What a point in time is expressed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRef {
    Timestamp(Timestamp),
    /// Seconds relative to now; must be zero or negative.
    Offset(i64),
    Statement(StatementId),
    Stream(String),
}

/// `AT(...)` / `BEFORE(...)` as accepted by the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointInTime {
    pub anchor: Anchor,
    pub reference: TimeRef,
}

impl PointInTime {
    pub fn at(reference: TimeRef) -> Self {
        Self {
            anchor: Anchor::At,
            reference,
        }
    }

    pub fn before(reference: TimeRef) -> Self {
        Self {
            anchor: Anchor::Before,
            reference,
        }
    }

    /// The current committed state, `AT(OFFSET => 0)`.
    pub fn now() -> Self {
        Self::at(TimeRef::Offset(0))
    }

    pub fn at_timestamp(ts: Timestamp) -> Self {
        Self::at(TimeRef::Timestamp(ts))
    }

    pub fn before_timestamp(ts: Timestamp) -> Self {
        Self::before(TimeRef::Timestamp(ts))
    }

    pub fn at_offset(secs: i64) -> Self {
        Self::at(TimeRef::Offset(secs))
    }

    pub fn at_statement(id: impl Into<StatementId>) -> Self {
        Self::at(TimeRef::Statement(id.into()))
    }

    pub fn before_statement(id: impl Into<StatementId>) -> Self {
        Self::before(TimeRef::Statement(id.into()))
    }

    pub fn at_stream(name: impl Into<String>) -> Self {
        Self::at(TimeRef::Stream(name.into()))
    }
}

/// A reference reduced to a bound over the ledger's total order.
///
/// Time cuts compare commit timestamps; commit cuts compare commit ids. Both
/// select a prefix of an object's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cut {
    Time { at: Timestamp, inclusive: bool },
    Commit { at: CommitId, inclusive: bool },
}

impl Cut {
    /// Returns true if a commit with this id and time falls inside the cut.
    pub fn admits(&self, commit: CommitId, time: Timestamp) -> bool {
        match *self {
            Cut::Time { at, inclusive: true } => time <= at,
            Cut::Time { at, inclusive: false } => time < at,
            Cut::Commit { at, inclusive: true } => commit <= at,
            Cut::Commit { at, inclusive: false } => commit < at,
        }
    }

    #[inline]
    pub fn admits_entry(&self, entry: &VersionEntry) -> bool {
        self.admits(entry.commit, entry.time)
    }

    #[inline]
    pub fn admits_mark(&self, mark: &CommitMark) -> bool {
        self.admits(mark.commit, mark.time)
    }
}

/// A point evaluated against "now": the cut plus the instant it stands for,
/// which is what the retention window is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundPoint {
    pub cut: Cut,
    pub target_time: Timestamp,
    pub now: Timestamp,
    /// Wider window granted to stream offsets, in days.
    pub extended_window: Option<u32>,
}

/// A point resolved to a concrete ledger entry of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub entry: VersionEntry,
    pub target_time: Timestamp,
    pub retention_days: u32,
}
