// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Error types shared by every resolution, lifecycle and change-feed operation.

use crate::catalog::{ObjectId, ObjectKind};
use crate::ledger::{CommitId, StatementId};
use crate::time::Timestamp;

/// Errors surfaced by the retention engine.
///
/// Every resolution failure is reported with its specific kind. Reclamation lag
/// is never reported as an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("object {object} did not exist at the requested point")]
    ObjectDidNotExistAtPoint { object: ObjectId },

    #[error("requested time {requested} is in the future (now {now})")]
    FutureTime { requested: Timestamp, now: Timestamp },

    #[error(
        "point is beyond the {retention_days}-day retention window of object {object}"
    )]
    RetentionExceeded { object: ObjectId, retention_days: u32 },

    #[error("an active object named {name:?} already exists")]
    NameConflict { name: String },

    #[error("no recoverable dropped version of {name:?}")]
    NoRecoverableVersion { name: String },

    #[error("change tracking was not enabled on object {object} at the requested start point")]
    NoChangeData { object: ObjectId },

    #[error("unsupported time travel target: {0}")]
    UnsupportedTarget(String),

    #[error("stream {name:?} is stale")]
    StaleStream { name: String },

    #[error("hybrid table {object} cannot be cloned at a statement point")]
    HybridUnsupported { object: ObjectId },

    #[error("unknown statement {0}")]
    UnknownStatement(StatementId),

    #[error("unknown stream {0:?}")]
    UnknownStream(String),

    #[error("invalid point in time: {0}")]
    InvalidPoint(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("cannot {operation} a {kind}")]
    WrongKind {
        operation: &'static str,
        kind: ObjectKind,
    },

    #[error("statement {0} was already committed")]
    DuplicateStatement(StatementId),

    #[error("write conflict on object {object}: {base} is no longer its newest entry")]
    WriteConflict { object: ObjectId, base: CommitId },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("snapshot for commit {commit} is missing from the snapshot store")]
    SnapshotMissing { commit: CommitId },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
