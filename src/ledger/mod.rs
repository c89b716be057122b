// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Version ledger.
//!
//! The ledger is an append-only record of every state-changing operation on
//! every object of a tenant. Each entry is an immutable pointer to a data
//! snapshot, stamped with a tenant-wide commit id and an advisory wall-clock
//! time.
//!
//! # Key Concepts
//!
//! - **Commit ids** are the single ordering authority. Two entries are never
//!   ordered by their timestamps.
//! - **Generations** are lifespans of an object under a name. A DROP closes the
//!   generation; UNDROP reopens it in place under the same object id.
//! - **Batches** let container operations touch many objects under one commit.
//!
//! # Example
//!
//! ```
//! use rewinddb::catalog::{ObjectId, ObjectKind};
//! use rewinddb::ledger::{Ledger, LedgerBatch, OpKind, SnapshotRef};
//! use rewinddb::time::Timestamp;
//!
//! let ledger = Ledger::new();
//! let mut batch = LedgerBatch::new();
//! batch.create(ObjectId(1), ObjectKind::Table, "orders", None, SnapshotRef(7));
//! let created = ledger.commit(&batch, None, Timestamp::from_secs(10)).unwrap();
//!
//! let mutated = ledger
//!     .append(ObjectId(1), OpKind::Mutate, SnapshotRef(8), None, Timestamp::from_secs(11))
//!     .unwrap();
//! assert!(mutated > created);
//! ```

mod batch;
mod entry;
mod generation;
mod log;

pub use batch::{LedgerBatch, LedgerOp};
pub use entry::{CommitId, OpKind, SnapshotRef, StatementId, VersionEntry};
pub use generation::{Generation, GenerationState};
pub use log::{Ledger, LogView, Reclaimed};
