// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Zero-copy clones.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::catalog::{CloneOrigin, ObjectId, ObjectKind, ObjectMeta};
use crate::error::{Error, Result};
use crate::ledger::{CommitId, LedgerBatch, SnapshotRef};
use crate::resolve::{BoundPoint, PointInTime, TimeRef};
use crate::snapshot::SnapshotStore;
use crate::time::Clock;

use super::RetentionEngine;

/// Opt-in relaxations for container clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloneOptions {
    /// Omit children whose history at the point has left retention instead of
    /// failing the whole clone.
    pub skip_insufficient_retention: bool,
    /// Omit hybrid tables from statement-based container clones instead of
    /// failing.
    pub hybrid_override: bool,
}

impl CloneOptions {
    pub fn skip_insufficient_retention(mut self) -> Self {
        self.skip_insufficient_retention = true;
        self
    }

    pub fn hybrid_override(mut self) -> Self {
        self.hybrid_override = true;
        self
    }
}

/// One object the clone will create.
struct Planned {
    source: ObjectMeta,
    id: ObjectId,
    parent: Option<ObjectId>,
    name: String,
    snapshot: SnapshotRef,
    commit: CommitId,
}

impl<S, C> RetentionEngine<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + 'static,
{
    /// Clones `source` as `name` under `parent`, as of `point` (now if
    /// `None`).
    ///
    /// Containers are cloned with every child that existed at the point. All
    /// new objects are created in one ledger commit; their first entries
    /// alias the resolved source snapshots, so no rows are copied and the
    /// clone has no history older than its own creation. The source ledger is
    /// not touched.
    #[instrument(skip(self, point), fields(source = %source))]
    pub fn clone_object(
        &self,
        source: ObjectId,
        parent: Option<ObjectId>,
        name: &str,
        point: Option<&PointInTime>,
        options: CloneOptions,
    ) -> Result<ObjectId> {
        let _ddl = self.ddl.lock();
        let root = self.active_meta(source)?;
        self.check_parent(parent, root.kind)?;

        let now = self.clock.now();
        let resolver = self.resolver(now);
        let point = point.cloned().unwrap_or_else(PointInTime::now);
        let bound = resolver.bind(&point)?;
        let statement_based = matches!(point.reference, TimeRef::Statement(_));

        let version = resolver.resolve_bound(source, &bound)?;
        let mut plan = vec![Planned {
            id: self.catalog.allocate_id(),
            parent,
            name: name.to_string(),
            snapshot: version.entry.snapshot,
            commit: version.entry.commit,
            source: root,
        }];

        // Source id -> new id, for re-parenting children.
        let mut mapped: HashMap<ObjectId, ObjectId> = HashMap::new();
        mapped.insert(source, plan[0].id);

        for child in self.catalog.descendants(source) {
            let meta = self.catalog.get(child)?;
            let Some(new_parent) = meta.parent.and_then(|p| mapped.get(&p).copied()) else {
                continue;
            };

            let resolved = if meta.kind == ObjectKind::View {
                self.view_existed_at(child, &bound)?
            } else {
                if statement_based && meta.kind == ObjectKind::HybridTable {
                    if options.hybrid_override {
                        debug!(object = %child, "omitting hybrid table from clone");
                        continue;
                    }
                    return Err(Error::HybridUnsupported { object: child });
                }
                match resolver.resolve_bound(child, &bound) {
                    Ok(v) => Some((v.entry.snapshot, v.entry.commit)),
                    Err(Error::ObjectDidNotExistAtPoint { .. }) => None,
                    Err(Error::RetentionExceeded { .. })
                        if options.skip_insufficient_retention =>
                    {
                        warn!(object = %child, "skipping child outside retention");
                        None
                    }
                    Err(e) => return Err(e),
                }
            };

            let Some((snapshot, commit)) = resolved else {
                continue;
            };
            let id = self.catalog.allocate_id();
            mapped.insert(child, id);
            plan.push(Planned {
                id,
                parent: Some(new_parent),
                name: self.ledger.generation(child)?.name,
                snapshot,
                commit,
                source: meta,
            });
        }

        // Pin the resolved states until the clone entries reference them, then
        // check none was reclaimed before the pin took hold.
        let oldest = plan.iter().map(|p| p.commit).min().unwrap_or(CommitId::ZERO);
        let _ticket = self.gate.acquire(oldest);
        for p in &plan {
            let reclaimed_below = self.ledger.read(p.source.id, |log| log.reclaimed_below)?;
            if p.commit < reclaimed_below {
                return Err(Error::RetentionExceeded {
                    object: p.source.id,
                    retention_days: self.retention().effective_retention(p.source.id)?,
                });
            }
        }

        let mut batch = LedgerBatch::new();
        for p in &plan {
            batch.create(p.id, p.source.kind, p.name.clone(), p.parent, p.snapshot);
        }
        let commit = self.ledger.commit(&batch, None, now)?;
        let created = self.mark(commit, now);

        for p in plan.iter() {
            self.catalog.insert(ObjectMeta {
                id: p.id,
                kind: p.source.kind,
                class: p.source.class,
                parent: p.parent,
                settings: p.source.settings,
                columns: p.source.columns.clone(),
                definition: p.source.definition.clone(),
                created,
                change_tracking: None,
                clone_origin: Some(CloneOrigin {
                    source: p.source.id,
                    commit: p.commit,
                }),
            });
        }

        info!(%commit, objects = plan.len(), "cloned object");
        Ok(plan[0].id)
    }

    /// Views are cloned by definition: they only need to have existed at the
    /// cut.
    fn view_existed_at(
        &self,
        view: ObjectId,
        bound: &BoundPoint,
    ) -> Result<Option<(SnapshotRef, CommitId)>> {
        self.ledger.read(view, |log| {
            let idx = log.entries.partition_point(|e| bound.cut.admits_entry(e));
            log.entries[..idx]
                .last()
                .filter(|e| !e.dropped)
                .map(|e| (SnapshotRef::EMPTY, e.commit))
        })
    }
}
