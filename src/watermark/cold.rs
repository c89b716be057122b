// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Cold tier for reclaimed permanent-class history.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::ObjectId;
use crate::ledger::VersionEntry;
use crate::snapshot::RowSet;

/// A reclaimed entry together with the data state it pointed at.
#[derive(Debug, Clone)]
pub struct ArchivedVersion {
    pub entry: VersionEntry,
    /// `None` if the hot store no longer held the state.
    pub rows: Option<Arc<RowSet>>,
}

/// Destination for history that leaves the queryable window of a
/// permanent-class object. Nothing in the cold tier is reachable through
/// time travel.
pub trait ColdTier: Send + Sync {
    fn archive(&self, object: ObjectId, versions: Vec<ArchivedVersion>);

    /// Number of archived entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cold tier kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryColdTier {
    archived: RwLock<Vec<(ObjectId, ArchivedVersion)>>,
}

impl InMemoryColdTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archived versions of one object, in archive order.
    pub fn versions_for(&self, object: ObjectId) -> Vec<ArchivedVersion> {
        self.archived
            .read()
            .iter()
            .filter(|(o, _)| *o == object)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl ColdTier for InMemoryColdTier {
    fn archive(&self, object: ObjectId, versions: Vec<ArchivedVersion>) {
        let mut archived = self.archived.write();
        archived.extend(versions.into_iter().map(|v| (object, v)));
    }

    fn len(&self) -> usize {
        self.archived.read().len()
    }
}
