// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Snapshot storage seam.
//!
//! The engine treats data states as opaque, immutable row sets addressed by
//! [`SnapshotRef`]. Everything physical (files, copy-on-write, compaction)
//! lives behind [`SnapshotStore`]; the in-memory store is the reference
//! implementation.

mod memory;
mod row;

use std::sync::Arc;

use crate::ledger::SnapshotRef;

pub use memory::MemorySnapshotStore;
pub use row::{project, project_row, row, Row, RowId, RowSet, Value};

/// Immutable, append-only store of data states.
pub trait SnapshotStore: Send + Sync {
    /// Loads a data state. `SnapshotRef::EMPTY` always loads as an empty set.
    fn load(&self, snapshot: SnapshotRef) -> Option<Arc<RowSet>>;

    /// Stores a new immutable data state and returns its reference.
    fn store(&self, rows: RowSet) -> SnapshotRef;

    /// Assigns a fresh physical row id.
    fn allocate_row_id(&self) -> RowId;

    /// Frees a data state no ledger entry references any more.
    ///
    /// Later loads of `snapshot` return `None`; readers already holding its
    /// rows keep them. Releasing `SnapshotRef::EMPTY` does nothing.
    fn release(&self, snapshot: SnapshotRef);
}
