// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Drop and undrop.

use tracing::{info, instrument};

use crate::catalog::ObjectId;
use crate::error::{Error, Result};
use crate::ledger::{CommitId, LedgerBatch};
use crate::snapshot::SnapshotStore;
use crate::time::Clock;

use super::RetentionEngine;

impl<S, C> RetentionEngine<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + 'static,
{
    /// Drops an active object.
    ///
    /// Dropping a container closes every active descendant in the same
    /// commit, each stamped with the container's effective retention.
    /// Descendants dropped earlier keep their own drop record.
    #[instrument(skip(self), fields(object = %object))]
    pub fn drop_object(&self, object: ObjectId) -> Result<CommitId> {
        let _ddl = self.ddl.lock();
        self.active_meta(object)?;
        let retention_days = self.retention().effective_retention(object)?;

        let mut batch = LedgerBatch::new();
        batch.drop_object(object, retention_days);
        for child in self.catalog.descendants(object) {
            if self.ledger.generation(child)?.is_active() {
                batch.drop_object(child, retention_days);
            }
        }

        let commit = self.ledger.commit(&batch, None, self.clock.now())?;
        info!(%commit, retention_days, closed = batch.len(), "dropped object");
        Ok(commit)
    }

    /// Restores the most recently dropped recoverable generation of `name`.
    ///
    /// Fails with `NameConflict` while an active object holds the name and
    /// `NoRecoverableVersion` when no dropped generation is still inside its
    /// retention window. A container comes back with every descendant its
    /// drop closed.
    #[instrument(skip(self))]
    pub fn undrop(&self, parent: Option<ObjectId>, name: &str) -> Result<ObjectId> {
        let _ddl = self.ddl.lock();
        if let Some(parent) = parent {
            self.active_meta(parent)?;
        }
        if self.ledger.active_by_name(parent, name).is_some() {
            return Err(Error::NameConflict {
                name: name.to_string(),
            });
        }

        let now = self.clock.now();
        let target = self
            .ledger
            .generations(parent, name)
            .into_iter()
            .filter(|g| g.is_recoverable(now))
            .max_by_key(|g| g.drop_commit())
            .ok_or_else(|| Error::NoRecoverableVersion {
                name: name.to_string(),
            })?;

        let mut batch = LedgerBatch::new();
        batch.undrop(target.object);
        for child in self.catalog.descendants(target.object) {
            let generation = self.ledger.generation(child)?;
            if generation.is_dropped() && generation.drop_commit() == target.drop_commit() {
                batch.undrop(child);
            }
        }

        let commit = self.ledger.commit(&batch, None, now)?;
        info!(
            object = %target.object,
            %commit,
            restored = batch.len(),
            "undropped object"
        );
        Ok(target.object)
    }
}
