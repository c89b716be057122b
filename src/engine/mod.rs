// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Per-tenant retention engine.
//!
//! [`RetentionEngine`] ties the catalog, version ledger, snapshot store,
//! stream registry and watermark gate together and exposes the operations the
//! query layer maps onto: object DDL and DML, historical reads, clones,
//! drop/undrop, change feeds and reclamation.
//!
//! Object DDL is serialized per tenant by a short mutex. Data writes take no
//! shared lock while they build a new state: each commits only if the entry
//! it started from is still the object's newest, and rebuilds and retries
//! otherwise. Readers work from cloned metadata and immutable snapshots.
//!
//! # Example
//!
//! ```
//! use rewinddb::config::EngineConfig;
//! use rewinddb::engine::{RetentionEngine, TableDef};
//! use rewinddb::resolve::PointInTime;
//! use rewinddb::snapshot::{row, Value};
//!
//! let engine = RetentionEngine::in_memory(EngineConfig::default()).unwrap();
//! let db = engine.create_database("sales").unwrap();
//! let schema = engine.create_schema(db, "public").unwrap();
//! let orders = engine
//!     .create_table(schema, "orders", TableDef::new(["id", "status"]))
//!     .unwrap();
//!
//! engine
//!     .insert_rows(orders, vec![row([("id", Value::Int(1)), ("status", Value::from("open"))])], None)
//!     .unwrap();
//!
//! let read = engine.read_at(orders, &PointInTime::now()).unwrap();
//! assert_eq!(read.len(), 1);
//! ```

mod changes;
mod clone;
mod lifecycle;


use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::catalog::{Catalog, CommitMark, ObjectId, ObjectKind, ObjectMeta, ObjectSettings, TableClass};
use crate::changes::StreamRegistry;
use crate::config::{AccountSettings, EngineConfig, Setting};
use crate::error::{Error, Result};
use crate::history::{self, HistoryRecord};
use crate::ledger::{CommitId, Ledger, LedgerBatch, OpKind, SnapshotRef, StatementId};
use crate::resolve::{PointInTime, PointInTimeResolver, ResolvedVersion};
use crate::retention::{validate_retention, RetentionResolver};
use crate::snapshot::{project, project_row, MemorySnapshotStore, Row, RowId, RowSet, SnapshotStore};
use crate::time::{Clock, HlcClock, Timestamp};
use crate::watermark::{
    ColdTier, InMemoryColdTier, ReadTicket, ReclaimStats, Reclaimer, ReclaimerHandle,
    WatermarkGate,
};

pub use clone::CloneOptions;

/// Definition of a new table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub columns: Vec<String>,
    pub class: TableClass,
    pub hybrid: bool,
    pub settings: ObjectSettings,
    pub change_tracking: bool,
}

impl TableDef {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            class: TableClass::Permanent,
            hybrid: false,
            settings: ObjectSettings::default(),
            change_tracking: false,
        }
    }

    pub fn class(mut self, class: TableClass) -> Self {
        self.class = class;
        self
    }

    /// Makes this a hybrid table.
    pub fn hybrid(mut self) -> Self {
        self.hybrid = true;
        self
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.settings.retention_days = Some(days);
        self
    }

    pub fn max_extension_days(mut self, days: u32) -> Self {
        self.settings.max_extension_days = Some(days);
        self
    }

    /// Enables change tracking from the creation commit.
    pub fn change_tracking(mut self) -> Self {
        self.change_tracking = true;
        self
    }

    fn kind(&self) -> ObjectKind {
        if self.hybrid {
            ObjectKind::HybridTable
        } else {
            ObjectKind::Table
        }
    }
}

/// Result of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inserted {
    pub commit: CommitId,
    pub row_ids: Vec<RowId>,
}

/// A historical read.
///
/// Holds a watermark read ticket for as long as it lives, so the history it
/// was resolved against cannot be reclaimed underneath it. Dropping the read
/// releases the ticket.
#[derive(Debug)]
pub struct HistoricalRead {
    version: ResolvedVersion,
    columns: Vec<String>,
    rows: Arc<RowSet>,
    _ticket: ReadTicket,
}

impl HistoricalRead {
    /// The ledger entry the read resolved to.
    pub fn version(&self) -> &ResolvedVersion {
        &self.version
    }

    #[inline]
    pub fn commit(&self) -> CommitId {
        self.version.entry.commit
    }

    /// Rows projected through the object's current column schema.
    pub fn rows(&self) -> RowSet {
        project(&self.rows, &self.columns)
    }

    /// One row, projected, if present.
    pub fn get(&self, id: RowId) -> Option<Row> {
        self.rows.get(&id).map(|r| project_row(r, &self.columns))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Retention and recovery engine for one tenant.
pub struct RetentionEngine<S: SnapshotStore, C: Clock> {
    config: EngineConfig,
    ledger: Arc<Ledger>,
    catalog: Arc<Catalog>,
    snapshots: Arc<S>,
    clock: Arc<C>,
    streams: Arc<StreamRegistry>,
    gate: Arc<WatermarkGate>,
    cold: Arc<dyn ColdTier>,
    account: Arc<RwLock<AccountSettings>>,
    /// Serializes DDL. Data writes never take it.
    ddl: Mutex<()>,
}

impl RetentionEngine<MemorySnapshotStore, HlcClock> {
    /// Creates an engine over an in-memory snapshot store and a hybrid
    /// logical clock.
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(HlcClock::new()),
        )
    }
}

impl<S, C> RetentionEngine<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + 'static,
{
    /// Creates an engine over the given snapshot store and clock.
    pub fn with_parts(config: EngineConfig, snapshots: Arc<S>, clock: Arc<C>) -> Result<Self> {
        config.validate()?;
        let account = config.account;
        Ok(Self {
            config,
            ledger: Arc::new(Ledger::new()),
            catalog: Arc::new(Catalog::new()),
            snapshots,
            clock,
            streams: Arc::new(StreamRegistry::new()),
            gate: Arc::new(WatermarkGate::new()),
            cold: Arc::new(InMemoryColdTier::new()),
            account: Arc::new(RwLock::new(account)),
            ddl: Mutex::new(()),
        })
    }

    /// Replaces the cold tier reclaimed permanent-class history is sent to.
    pub fn with_cold_tier(mut self, cold: Arc<dyn ColdTier>) -> Self {
        self.cold = cold;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn snapshots(&self) -> &Arc<S> {
        &self.snapshots
    }

    pub fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    pub fn streams(&self) -> &Arc<StreamRegistry> {
        &self.streams
    }

    pub fn gate(&self) -> &Arc<WatermarkGate> {
        &self.gate
    }

    pub fn cold_tier(&self) -> &Arc<dyn ColdTier> {
        &self.cold
    }

    pub fn account_settings(&self) -> AccountSettings {
        *self.account.read()
    }

    /// Replaces the account-level settings.
    pub fn set_account_settings(&self, settings: AccountSettings) -> Result<()> {
        settings.validate()?;
        *self.account.write() = settings;
        info!(
            retention_days = settings.retention_days,
            min_retention_days = settings.min_retention_days,
            "account settings updated"
        );
        Ok(())
    }

    /// Current effective retention of an object in days.
    pub fn effective_retention(&self, object: ObjectId) -> Result<u32> {
        self.retention().effective_retention(object)
    }

    /// Current effective max extension of an object in days.
    pub fn effective_max_extension(&self, object: ObjectId) -> Result<u32> {
        self.retention().effective_max_extension(object)
    }

    fn retention(&self) -> RetentionResolver<'_> {
        RetentionResolver::new(&self.catalog, *self.account.read())
    }

    fn resolver(&self, now: Timestamp) -> PointInTimeResolver<'_> {
        PointInTimeResolver::new(
            &self.ledger,
            &self.catalog,
            self.retention(),
            &self.streams,
            now,
        )
    }

    fn mark(&self, commit: CommitId, fallback: Timestamp) -> CommitMark {
        CommitMark {
            commit,
            time: self.ledger.commit_time(commit).unwrap_or(fallback),
        }
    }

    /// Metadata of an object whose current generation is active.
    fn active_meta(&self, object: ObjectId) -> Result<ObjectMeta> {
        let meta = self.catalog.get(object)?;
        if !self.ledger.generation(object)?.is_active() {
            return Err(Error::ObjectNotFound(object.to_string()));
        }
        Ok(meta)
    }

    fn check_parent(&self, parent: Option<ObjectId>, kind: ObjectKind) -> Result<()> {
        match parent {
            None if kind == ObjectKind::Database => Ok(()),
            None => Err(Error::InvalidOperation(format!("a {kind} needs a parent"))),
            Some(parent) => {
                let meta = self.active_meta(parent)?;
                if meta.kind.accepts_child(kind) {
                    Ok(())
                } else {
                    Err(Error::WrongKind {
                        operation: "create objects in",
                        kind: meta.kind,
                    })
                }
            }
        }
    }

    // Object DDL

    pub fn create_database(&self, name: &str) -> Result<ObjectId> {
        self.create_object(NewObject::container(None, name, ObjectKind::Database))
    }

    pub fn create_schema(&self, database: ObjectId, name: &str) -> Result<ObjectId> {
        self.create_object(NewObject::container(Some(database), name, ObjectKind::Schema))
    }

    pub fn create_table(&self, schema: ObjectId, name: &str, def: TableDef) -> Result<ObjectId> {
        let kind = def.kind();
        self.create_object(NewObject {
            parent: Some(schema),
            name,
            kind,
            class: def.class,
            settings: def.settings,
            columns: def.columns,
            definition: None,
            change_tracking: def.change_tracking,
        })
    }

    pub fn create_view(&self, schema: ObjectId, name: &str, definition: &str) -> Result<ObjectId> {
        let mut new = NewObject::container(Some(schema), name, ObjectKind::View);
        new.definition = Some(definition.to_string());
        self.create_object(new)
    }

    /// Sets retention on a new database or schema.
    pub fn create_container_with(
        &self,
        parent: Option<ObjectId>,
        name: &str,
        kind: ObjectKind,
        settings: ObjectSettings,
    ) -> Result<ObjectId> {
        if !kind.is_container() {
            return Err(Error::WrongKind {
                operation: "create as container",
                kind,
            });
        }
        let mut new = NewObject::container(parent, name, kind);
        new.settings = settings;
        self.create_object(new)
    }

    fn create_object(&self, new: NewObject<'_>) -> Result<ObjectId> {
        let _ddl = self.ddl.lock();
        self.check_parent(new.parent, new.kind)?;
        if let Some(days) = new.settings.retention_days {
            validate_retention(new.class, days)?;
        }

        let id = self.catalog.allocate_id();
        let mut batch = LedgerBatch::new();
        batch.create(id, new.kind, new.name, new.parent, SnapshotRef::EMPTY);

        let now = self.clock.now();
        let commit = self.ledger.commit(&batch, None, now)?;
        let created = self.mark(commit, now);

        self.catalog.insert(ObjectMeta {
            id,
            kind: new.kind,
            class: new.class,
            parent: new.parent,
            settings: new.settings,
            columns: new.columns,
            definition: new.definition,
            created,
            change_tracking: new.change_tracking.then_some(created),
            clone_origin: None,
        });

        debug!(object = %id, kind = %new.kind, name = new.name, %commit, "created object");
        Ok(id)
    }

    /// Looks up the active object holding `name` under `parent`.
    pub fn resolve_name(&self, parent: Option<ObjectId>, name: &str) -> Result<ObjectId> {
        self.ledger
            .active_by_name(parent, name)
            .ok_or_else(|| Error::ObjectNotFound(name.to_string()))
    }

    /// Looks up an active object by dotted path, e.g. `sales.public.orders`.
    pub fn lookup(&self, path: &str) -> Result<ObjectId> {
        let mut parent = None;
        for part in path.split('.') {
            parent = Some(self.resolve_name(parent, part)?);
        }
        parent.ok_or_else(|| Error::ObjectNotFound(path.to_string()))
    }

    /// Renames an active object in place.
    pub fn rename(&self, object: ObjectId, name: &str) -> Result<CommitId> {
        let _ddl = self.ddl.lock();
        self.active_meta(object)?;
        let mut batch = LedgerBatch::new();
        batch.rename(object, name);
        let commit = self.ledger.commit(&batch, None, self.clock.now())?;
        debug!(%object, name, %commit, "renamed object");
        Ok(commit)
    }

    /// Applies an object-scoped setting.
    pub fn set_setting(&self, object: ObjectId, setting: Setting) -> Result<()> {
        let _ddl = self.ddl.lock();
        let meta = self.active_meta(object)?;
        let now = self.clock.now();

        match setting {
            Setting::RetentionDays(days) => {
                if let Some(days) = days {
                    validate_retention(meta.class, days)?;
                }
                self.catalog.update(object, |m| {
                    m.settings.retention_days = days;
                    Ok(())
                })?;
            }
            Setting::MaxExtensionDays(days) => {
                self.catalog.update(object, |m| {
                    m.settings.max_extension_days = days;
                    Ok(())
                })?;
            }
            Setting::ChangeTrackingEnabled(true) => {
                if !meta.kind.holds_rows() {
                    return Err(Error::WrongKind {
                        operation: "track changes on",
                        kind: meta.kind,
                    });
                }
                let mark = CommitMark {
                    commit: self.ledger.current_commit(),
                    time: now,
                };
                self.catalog.update(object, |m| {
                    m.change_tracking.get_or_insert(mark);
                    Ok(())
                })?;
            }
            Setting::ChangeTrackingEnabled(false) => {
                if !self.streams.for_object(object).is_empty() {
                    return Err(Error::InvalidSetting(format!(
                        "change tracking on {object} is required by a stream"
                    )));
                }
                self.catalog.update(object, |m| {
                    m.change_tracking = None;
                    Ok(())
                })?;
            }
        }

        info!(%object, ?setting, "setting applied");
        Ok(())
    }

    /// Replaces a table's column schema. History is always read through the
    /// current schema, so this also changes how older states project.
    pub fn alter_columns<I, T>(&self, table: ObjectId, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let _ddl = self.ddl.lock();
        let meta = self.active_meta(table)?;
        if !meta.kind.holds_rows() {
            return Err(Error::WrongKind {
                operation: "alter columns of",
                kind: meta.kind,
            });
        }
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.catalog.update(table, |m| {
            m.columns = columns;
            Ok(())
        })
    }

    // DML

    /// Inserts rows, projected through the table's columns.
    pub fn insert_rows(
        &self,
        table: ObjectId,
        rows: Vec<Row>,
        statement: Option<StatementId>,
    ) -> Result<Inserted> {
        let mut row_ids = Vec::with_capacity(rows.len());
        let commit = self.write_rows(table, OpKind::Mutate, statement, |meta, state| {
            row_ids.clear();
            for r in &rows {
                let id = self.snapshots.allocate_row_id();
                state.insert(id, project_row(r, &meta.columns));
                row_ids.push(id);
            }
        })?;
        Ok(Inserted { commit, row_ids })
    }

    /// Applies `update` to every row matching `filter`. Row ids are kept.
    pub fn update_rows<F, U>(
        &self,
        table: ObjectId,
        filter: F,
        update: U,
        statement: Option<StatementId>,
    ) -> Result<CommitId>
    where
        F: Fn(RowId, &Row) -> bool,
        U: Fn(&mut Row),
    {
        self.write_rows(table, OpKind::Mutate, statement, |_, state| {
            for (id, r) in state.iter_mut() {
                if filter(*id, r) {
                    update(r);
                }
            }
        })
    }

    /// Deletes every row matching `filter`.
    pub fn delete_rows<F>(
        &self,
        table: ObjectId,
        filter: F,
        statement: Option<StatementId>,
    ) -> Result<CommitId>
    where
        F: Fn(RowId, &Row) -> bool,
    {
        self.write_rows(table, OpKind::Mutate, statement, |_, state| {
            state.retain(|id, r| !filter(*id, r));
        })
    }

    pub fn truncate(&self, table: ObjectId, statement: Option<StatementId>) -> Result<CommitId> {
        self.write_rows(table, OpKind::Truncate, statement, |_, state| state.clear())
    }

    /// Builds a new state from the newest entry and commits it on top of
    /// that entry. `f` runs again if another write lands first.
    fn write_rows<F>(
        &self,
        table: ObjectId,
        op: OpKind,
        statement: Option<StatementId>,
        mut f: F,
    ) -> Result<CommitId>
    where
        F: FnMut(&ObjectMeta, &mut RowSet),
    {
        loop {
            let meta = self.active_meta(table)?;
            if !meta.kind.holds_rows() {
                return Err(Error::WrongKind {
                    operation: "write rows to",
                    kind: meta.kind,
                });
            }

            let base = self.ledger.latest(table)?;
            let Some(current) = self.snapshots.load(base.snapshot) else {
                // Freed after a newer entry replaced it.
                if self.ledger.latest(table)?.commit != base.commit {
                    continue;
                }
                return Err(Error::SnapshotMissing {
                    commit: base.commit,
                });
            };

            let mut state = (*current).clone();
            f(&meta, &mut state);
            let snapshot = self.snapshots.store(state);

            let result = self.ledger.append_after(
                table,
                base.commit,
                op,
                snapshot,
                statement.clone(),
                self.clock.now(),
            );
            match result {
                Ok(commit) => return Ok(commit),
                Err(Error::WriteConflict { .. }) => {
                    self.snapshots.release(snapshot);
                    debug!(object = %table, base = %base.commit, "write conflict, retrying");
                }
                Err(e) => {
                    self.snapshots.release(snapshot);
                    return Err(e);
                }
            }
        }
    }

    // Reads

    /// Resolves a point in time for one object without reading data.
    pub fn resolve(&self, object: ObjectId, point: &PointInTime) -> Result<ResolvedVersion> {
        self.resolver(self.clock.now()).resolve(object, point)
    }

    /// Reads a table as of a point in time.
    pub fn read_at(&self, object: ObjectId, point: &PointInTime) -> Result<HistoricalRead> {
        let resolver = self.resolver(self.clock.now());
        let bound = resolver.bind(point)?;
        let first = resolver.resolve_bound(object, &bound)?;

        // Pin the entry, then check it survived until the pin was in place.
        let ticket = self.gate.acquire(first.entry.commit);
        let version = resolver.resolve_bound(object, &bound)?;

        let meta = self.catalog.get(object)?;
        if !meta.kind.holds_rows() {
            return Err(Error::WrongKind {
                operation: "read rows from",
                kind: meta.kind,
            });
        }

        let rows = self
            .snapshots
            .load(version.entry.snapshot)
            .ok_or(Error::SnapshotMissing {
                commit: version.entry.commit,
            })?;

        Ok(HistoricalRead {
            version,
            columns: meta.columns,
            rows,
            _ticket: ticket,
        })
    }

    // History

    /// Every non-reclaimed generation under `parent`.
    pub fn history(&self, parent: Option<ObjectId>) -> Vec<HistoryRecord> {
        history::list(&self.ledger, parent)
    }

    /// Every non-reclaimed generation of `name` under `parent`.
    pub fn history_of(&self, parent: Option<ObjectId>, name: &str) -> Vec<HistoryRecord> {
        history::list_named(&self.ledger, parent, name)
    }

    // Reclamation

    /// Builds a reclaimer sharing this engine's state.
    pub fn reclaimer(&self) -> Arc<Reclaimer> {
        let clock: Arc<dyn Clock> = self.clock.clone();
        let snapshots: Arc<dyn SnapshotStore> = self.snapshots.clone();
        Arc::new(Reclaimer::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.catalog),
            snapshots,
            Arc::clone(&self.streams),
            Arc::clone(&self.gate),
            Arc::clone(&self.cold),
            clock,
            Arc::clone(&self.account),
        ))
    }

    /// Runs one reclamation pass on the calling thread.
    #[instrument(skip(self))]
    pub fn reclaim_now(&self) -> ReclaimStats {
        self.reclaimer().run_once()
    }

    /// Starts background reclamation on the configured interval.
    pub fn start_reclaimer(&self) -> ReclaimerHandle {
        self.reclaimer().spawn(self.config.reclaim_interval)
    }
}

/// Arguments of a create, shared by every object kind.
struct NewObject<'a> {
    parent: Option<ObjectId>,
    name: &'a str,
    kind: ObjectKind,
    class: TableClass,
    settings: ObjectSettings,
    columns: Vec<String>,
    definition: Option<String>,
    change_tracking: bool,
}

impl<'a> NewObject<'a> {
    fn container(parent: Option<ObjectId>, name: &'a str, kind: ObjectKind) -> Self {
        Self {
            parent,
            name,
            kind,
            class: TableClass::Permanent,
            settings: ObjectSettings::default(),
            columns: Vec::new(),
            definition: None,
            change_tracking: false,
        }
    }
}
