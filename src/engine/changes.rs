// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Change feeds and streams over the engine.

use tracing::{debug, info};

use crate::catalog::{CommitMark, ObjectId, ObjectMeta};
use crate::changes::{diff, ChangeMode, ChangeRecord, Stream};
use crate::error::{Error, Result};
use crate::ledger::{CommitId, SnapshotRef};
use crate::resolve::{BoundPoint, Cut, PointInTime, PointInTimeResolver};
use crate::snapshot::{project, RowSet, SnapshotStore};
use crate::time::Clock;

use super::RetentionEngine;

impl<S, C> RetentionEngine<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + 'static,
{
    /// Net row changes of `object` between `from` and `to` (now if `None`).
    ///
    /// Change tracking must have been on no later than `from`. The result
    /// depends only on the two resolved states, so repeated calls with the
    /// same arguments return the same records.
    pub fn changes(
        &self,
        object: ObjectId,
        from: &PointInTime,
        to: Option<&PointInTime>,
        mode: ChangeMode,
    ) -> Result<Vec<ChangeRecord>> {
        let resolver = self.resolver(self.clock.now());
        let from = resolver.bind(from)?;
        let to = resolver.bind(to.unwrap_or(&PointInTime::now()))?;
        self.changes_between(&resolver, object, &from, &to, mode)
    }

    fn changes_between(
        &self,
        resolver: &PointInTimeResolver<'_>,
        object: ObjectId,
        from: &BoundPoint,
        to: &BoundPoint,
        mode: ChangeMode,
    ) -> Result<Vec<ChangeRecord>> {
        let start = resolver.resolve_bound(object, from)?;
        let _ticket = self.gate.acquire(start.entry.commit);
        let start = resolver.resolve_bound(object, from)?;
        let end = resolver.resolve_bound(object, to)?;

        let meta = self.catalog.get(object)?;
        if !meta.kind.holds_rows() {
            return Err(Error::WrongKind {
                operation: "read changes from",
                kind: meta.kind,
            });
        }
        match meta.change_tracking {
            Some(mark) if from.cut.admits_mark(&mark) => {}
            _ => return Err(Error::NoChangeData { object }),
        }
        if start.entry.commit > end.entry.commit {
            return Err(Error::InvalidPoint(
                "change interval ends before it starts".to_string(),
            ));
        }

        let before = self.load_projected(&meta, start.entry.commit, start.entry.snapshot)?;
        let after = self.load_projected(&meta, end.entry.commit, end.entry.snapshot)?;
        let records = diff(&before, &after, mode);

        debug!(
            %object,
            from = %start.entry.commit,
            to = %end.entry.commit,
            records = records.len(),
            "computed change feed"
        );
        Ok(records)
    }

    fn load_projected(
        &self,
        meta: &ObjectMeta,
        commit: CommitId,
        snapshot: SnapshotRef,
    ) -> Result<RowSet> {
        let rows = self
            .snapshots
            .load(snapshot)
            .ok_or(Error::SnapshotMissing { commit })?;
        Ok(project(&rows, &meta.columns))
    }

    /// Creates a stream on a table at the current commit, enabling change
    /// tracking if it is off.
    pub fn create_stream(&self, name: &str, table: ObjectId) -> Result<Stream> {
        let _ddl = self.ddl.lock();
        let meta = self.active_meta(table)?;
        if !meta.kind.holds_rows() {
            return Err(Error::WrongKind {
                operation: "create a stream on",
                kind: meta.kind,
            });
        }

        let now = self.clock.now();
        let offset = CommitMark {
            commit: self.ledger.current_commit(),
            time: now,
        };
        let stream = Stream {
            name: name.to_string(),
            object: table,
            offset: offset.commit,
            offset_time: now,
            created_at: now,
        };
        self.streams.create(stream.clone())?;
        self.catalog.update(table, |m| {
            m.change_tracking.get_or_insert(offset);
            Ok(())
        })?;

        info!(stream = name, object = %table, offset = %offset.commit, "created stream");
        Ok(stream)
    }

    /// Changes since the stream's offset, without advancing it.
    pub fn stream_changes(&self, name: &str, mode: ChangeMode) -> Result<Vec<ChangeRecord>> {
        let stream = self.streams.get(name)?;
        self.changes(stream.object, &PointInTime::at_stream(name), None, mode)
    }

    /// Changes since the stream's offset; the offset then moves to the end of
    /// the returned interval.
    pub fn consume_stream(&self, name: &str, mode: ChangeMode) -> Result<Vec<ChangeRecord>> {
        let stream = self.streams.get(name)?;
        let now = self.clock.now();
        let resolver = self.resolver(now);

        let from = resolver.bind(&PointInTime::at_stream(name))?;
        let head = self.ledger.current_commit();
        let to = BoundPoint {
            cut: Cut::Commit {
                at: head,
                inclusive: true,
            },
            target_time: now,
            now,
            extended_window: None,
        };

        let records = self.changes_between(&resolver, stream.object, &from, &to, mode)?;
        self.streams.advance(name, head, now)?;

        debug!(stream = name, offset = %head, records = records.len(), "consumed stream");
        Ok(records)
    }

    /// Removes a stream. Change tracking stays on.
    pub fn drop_stream(&self, name: &str) -> Result<Stream> {
        self.streams.remove(name)
    }
}
