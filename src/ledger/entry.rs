// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Ledger entry types.

use serde::{Deserialize, Serialize};

use crate::catalog::ObjectId;
use crate::time::Timestamp;

/// Tenant-wide commit identifier. Strictly increasing and the only authority
/// on "happened before".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct CommitId(pub u64);

impl CommitId {
    /// Sentinel below every real commit.
    pub const ZERO: CommitId = CommitId(0);

    #[inline]
    pub fn next(&self) -> CommitId {
        CommitId(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// External correlation key of the statement that produced a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementId(pub String);

impl From<&str> for StatementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StatementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque pointer to an immutable data state in the snapshot store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SnapshotRef(pub u64);

impl SnapshotRef {
    /// The empty data state. Containers and views always point here.
    pub const EMPTY: SnapshotRef = SnapshotRef(0);
}

/// Kind of state-changing operation recorded by a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpKind {
    Create,
    Mutate,
    Rename,
    Truncate,
    Drop,
    /// Reopens a dropped generation in place.
    Undrop,
}

/// One immutable row of the version ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub object: ObjectId,
    pub commit: CommitId,
    pub time: Timestamp,
    pub op: OpKind,
    /// Data state after the operation. A DROP keeps the last live snapshot.
    pub snapshot: SnapshotRef,
    pub statement: Option<StatementId>,
    pub dropped: bool,
}

impl VersionEntry {
    /// Returns true if the object had live data after this entry.
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.dropped
    }
}
