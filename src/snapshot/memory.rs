// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! In-memory snapshot store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ledger::SnapshotRef;

use super::row::{RowId, RowSet};
use super::SnapshotStore;

/// Snapshot store that keeps every data state in memory.
///
/// Data states are immutable once stored. Clones alias the same `Arc`, so a
/// clone never copies rows.
#[derive(Debug)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<SnapshotRef, Arc<RowSet>>>,
    empty: Arc<RowSet>,
    next_snapshot: AtomicU64,
    next_row: AtomicU64,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            empty: Arc::new(RowSet::new()),
            next_snapshot: AtomicU64::new(1),
            next_row: AtomicU64::new(1),
        }
    }

    /// Number of distinct data states stored, excluding the empty state.
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, snapshot: SnapshotRef) -> Option<Arc<RowSet>> {
        if snapshot == SnapshotRef::EMPTY {
            return Some(Arc::clone(&self.empty));
        }
        self.snapshots.read().get(&snapshot).cloned()
    }

    fn store(&self, rows: RowSet) -> SnapshotRef {
        if rows.is_empty() {
            return SnapshotRef::EMPTY;
        }
        let snapshot = SnapshotRef(self.next_snapshot.fetch_add(1, Ordering::Relaxed));
        self.snapshots.write().insert(snapshot, Arc::new(rows));
        snapshot
    }

    fn allocate_row_id(&self) -> RowId {
        RowId(self.next_row.fetch_add(1, Ordering::Relaxed))
    }

    fn release(&self, snapshot: SnapshotRef) {
        if snapshot != SnapshotRef::EMPTY {
            self.snapshots.write().remove(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::row;

    #[test]
    fn test_store_and_load() {
        let store = MemorySnapshotStore::new();
        let mut rows = RowSet::new();
        rows.insert(store.allocate_row_id(), row([("id", 1i64)]));

        let snap = store.store(rows.clone());
        assert_ne!(snap, SnapshotRef::EMPTY);
        assert_eq!(*store.load(snap).unwrap(), rows);
    }

    #[test]
    fn test_empty_snapshot() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.store(RowSet::new()), SnapshotRef::EMPTY);
        assert!(store.load(SnapshotRef::EMPTY).unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_release() {
        let store = MemorySnapshotStore::new();
        let mut rows = RowSet::new();
        rows.insert(store.allocate_row_id(), row([("id", 1i64)]));
        let snap = store.store(rows);
        let held = store.load(snap).unwrap();

        store.release(snap);
        assert!(store.is_empty());
        assert!(store.load(snap).is_none());
        assert_eq!(held.len(), 1);

        store.release(SnapshotRef::EMPTY);
        assert!(store.load(SnapshotRef::EMPTY).is_some());
    }

    #[test]
    fn test_unknown_snapshot() {
        let store = MemorySnapshotStore::new();
        assert!(store.load(SnapshotRef(99)).is_none());
    }

    #[test]
    fn test_row_ids_unique() {
        let store = MemorySnapshotStore::new();
        let a = store.allocate_row_id();
        let b = store.allocate_row_id();
        assert!(b > a);
    }
}
