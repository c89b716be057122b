// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Append-only per-tenant version ledger.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::catalog::ObjectId;
use crate::error::{Error, Result};
use crate::time::Timestamp;

use super::batch::{LedgerBatch, LedgerOp};
use super::entry::{CommitId, OpKind, SnapshotRef, StatementId, VersionEntry};
use super::generation::{Generation, GenerationState};

/// Everything the ledger knows about one object.
#[derive(Debug)]
struct ObjectLog {
    entries: Vec<VersionEntry>,
    generation: Generation,
    /// Entries with a commit id below this have been reclaimed.
    reclaimed_below: CommitId,
}

impl ObjectLog {
    fn last_snapshot(&self) -> SnapshotRef {
        self.entries
            .last()
            .map(|e| e.snapshot)
            .unwrap_or(SnapshotRef::EMPTY)
    }
}

/// Borrowed view of one object's log, handed to [`Ledger::read`] closures.
#[derive(Debug, Clone, Copy)]
pub struct LogView<'a> {
    /// Retained entries in commit order.
    pub entries: &'a [VersionEntry],
    pub generation: &'a Generation,
    pub reclaimed_below: CommitId,
}

/// What a reclamation removed from the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reclaimed {
    /// Removed entries in commit order.
    pub entries: Vec<VersionEntry>,
    /// Data states no retained entry of any object references any more.
    pub released: Vec<SnapshotRef>,
}

impl Reclaimed {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    logs: HashMap<ObjectId, ObjectLog>,
    statements: HashMap<StatementId, CommitId>,
    commit_times: BTreeMap<CommitId, Timestamp>,
    /// Retained entries per non-empty data state. Clones alias their
    /// source's states.
    snapshot_refs: HashMap<SnapshotRef, usize>,
    /// Retained entries per commit. A batch commit spans several objects.
    commit_refs: HashMap<CommitId, usize>,
    last_time: Timestamp,
}

/// Drops one reference to `key`. Returns true if it was the last.
fn unref<K: Hash + Eq>(refs: &mut HashMap<K, usize>, key: &K) -> bool {
    match refs.get_mut(key) {
        Some(count) if *count > 1 => {
            *count -= 1;
            false
        }
        Some(_) => {
            refs.remove(key);
            true
        }
        None => false,
    }
}

impl LedgerInner {
    fn active_log(&self, object: ObjectId) -> Result<&ObjectLog> {
        match self.logs.get(&object) {
            Some(log) if log.generation.is_active() => Ok(log),
            _ => Err(Error::ObjectNotFound(object.to_string())),
        }
    }

    fn active_holder(&self, parent: Option<ObjectId>, name: &str) -> Option<ObjectId> {
        self.logs
            .values()
            .find(|log| {
                log.generation.is_active()
                    && log.generation.parent == parent
                    && log.generation.name == name
            })
            .map(|log| log.generation.object)
    }

    fn validate(&self, batch: &LedgerBatch) -> Result<()> {
        for (object, base) in batch.expected() {
            let latest = self.active_log(*object)?.entries.last().map(|e| e.commit);
            if latest != Some(*base) {
                return Err(Error::WriteConflict {
                    object: *object,
                    base: *base,
                });
            }
        }

        let mut seen = HashSet::new();
        let mut vacated = HashSet::new();
        let mut claims: Vec<(ObjectId, Option<ObjectId>, &str)> = Vec::new();

        for op in batch.ops() {
            if !seen.insert(op.object()) {
                return Err(Error::InvalidOperation(format!(
                    "object {} appears twice in one commit",
                    op.object()
                )));
            }

            match op {
                LedgerOp::Create {
                    object,
                    name,
                    parent,
                    ..
                } => {
                    if self.logs.contains_key(object) {
                        return Err(Error::InvalidOperation(format!(
                            "object {object} is already registered"
                        )));
                    }
                    claims.push((*object, *parent, name.as_str()));
                }
                LedgerOp::Mutate { object, .. } | LedgerOp::Truncate { object, .. } => {
                    self.active_log(*object)?;
                }
                LedgerOp::Rename { object, name } => {
                    let log = self.active_log(*object)?;
                    vacated.insert(*object);
                    claims.push((*object, log.generation.parent, name.as_str()));
                }
                LedgerOp::Drop { object, .. } => {
                    self.active_log(*object)?;
                    vacated.insert(*object);
                }
                LedgerOp::Undrop { object } => {
                    let log = self
                        .logs
                        .get(object)
                        .ok_or_else(|| Error::ObjectNotFound(object.to_string()))?;
                    if !log.generation.is_dropped() {
                        return Err(Error::NoRecoverableVersion {
                            name: log.generation.name.clone(),
                        });
                    }
                    claims.push((*object, log.generation.parent, log.generation.name.as_str()));
                }
            }
        }

        let mut claimed = HashSet::new();
        for (object, parent, name) in claims {
            if !claimed.insert((parent, name)) {
                return Err(Error::NameConflict {
                    name: name.to_string(),
                });
            }
            if let Some(holder) = self.active_holder(parent, name) {
                if holder != object && !vacated.contains(&holder) {
                    return Err(Error::NameConflict {
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn apply(
        &mut self,
        op: &LedgerOp,
        commit: CommitId,
        time: Timestamp,
        statement: &Option<StatementId>,
    ) {
        let entry = |object, op, snapshot, dropped| VersionEntry {
            object,
            commit,
            time,
            op,
            snapshot,
            statement: statement.clone(),
            dropped,
        };

        match op {
            LedgerOp::Create {
                object,
                kind,
                name,
                parent,
                snapshot,
            } => {
                let log = ObjectLog {
                    entries: vec![entry(*object, OpKind::Create, *snapshot, false)],
                    generation: Generation {
                        object: *object,
                        kind: *kind,
                        name: name.clone(),
                        parent: *parent,
                        created: commit,
                        created_time: time,
                        renamed: None,
                        state: GenerationState::Active,
                    },
                    reclaimed_below: CommitId::ZERO,
                };
                self.logs.insert(*object, log);
            }
            LedgerOp::Mutate { object, snapshot } => {
                if let Some(log) = self.logs.get_mut(object) {
                    log.entries
                        .push(entry(*object, OpKind::Mutate, *snapshot, false));
                }
            }
            LedgerOp::Truncate { object, snapshot } => {
                if let Some(log) = self.logs.get_mut(object) {
                    log.entries
                        .push(entry(*object, OpKind::Truncate, *snapshot, false));
                }
            }
            LedgerOp::Rename { object, name } => {
                if let Some(log) = self.logs.get_mut(object) {
                    let snapshot = log.last_snapshot();
                    log.entries
                        .push(entry(*object, OpKind::Rename, snapshot, false));
                    log.generation.name = name.clone();
                    log.generation.renamed = Some(commit);
                }
            }
            LedgerOp::Drop {
                object,
                retention_days,
            } => {
                if let Some(log) = self.logs.get_mut(object) {
                    let snapshot = log.last_snapshot();
                    log.entries.push(entry(*object, OpKind::Drop, snapshot, true));
                    log.generation.state = GenerationState::Dropped {
                        drop_commit: commit,
                        drop_time: time,
                        retention_days: *retention_days,
                    };
                }
            }
            LedgerOp::Undrop { object } => {
                if let Some(log) = self.logs.get_mut(object) {
                    let snapshot = log.last_snapshot();
                    log.entries
                        .push(entry(*object, OpKind::Undrop, snapshot, false));
                    log.generation.state = GenerationState::Active;
                }
            }
        }
    }

    /// Counts the newest entry of `object`, just pushed by a commit.
    fn track(&mut self, object: ObjectId) {
        let Some((snapshot, commit)) = self
            .logs
            .get(&object)
            .and_then(|log| log.entries.last())
            .map(|e| (e.snapshot, e.commit))
        else {
            return;
        };
        if snapshot != SnapshotRef::EMPTY {
            *self.snapshot_refs.entry(snapshot).or_insert(0) += 1;
        }
        *self.commit_refs.entry(commit).or_insert(0) += 1;
    }

    /// Drops index state held only by `removed` and returns the data states
    /// nothing retained references.
    fn forget(&mut self, removed: &[VersionEntry]) -> Vec<SnapshotRef> {
        let mut released = Vec::new();
        for entry in removed {
            if unref(&mut self.commit_refs, &entry.commit) {
                self.commit_times.remove(&entry.commit);
                if let Some(statement) = &entry.statement {
                    self.statements.remove(statement);
                }
            }
            if unref(&mut self.snapshot_refs, &entry.snapshot) {
                released.push(entry.snapshot);
            }
        }
        released
    }
}

/// Append-only version ledger for one tenant.
///
/// The write lock covers only validation, commit-id assignment and the entry
/// pushes of one commit. Readers never block each other.
#[derive(Debug)]
pub struct Ledger {
    inner: RwLock<LedgerInner>,
    next_commit: AtomicU64,
}

impl Ledger {
    /// Creates an empty ledger. The first commit id handed out is `c1`.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerInner::default()),
            next_commit: AtomicU64::new(1),
        }
    }

    /// Commits a batch atomically under one fresh commit id.
    ///
    /// `now` is the advisory commit time; it is clamped so commit times never
    /// decrease along commit ids.
    pub fn commit(
        &self,
        batch: &LedgerBatch,
        statement: Option<StatementId>,
        now: Timestamp,
    ) -> Result<CommitId> {
        if batch.is_empty() {
            return Err(Error::InvalidOperation("empty ledger batch".to_string()));
        }

        let mut inner = self.inner.write();
        if let Some(s) = &statement {
            if inner.statements.contains_key(s) {
                return Err(Error::DuplicateStatement(s.clone()));
            }
        }
        inner.validate(batch)?;

        let commit = CommitId(self.next_commit.fetch_add(1, Ordering::AcqRel));
        let time = now.max(inner.last_time);
        inner.last_time = time;

        for op in batch.ops() {
            inner.apply(op, commit, time, &statement);
            inner.track(op.object());
        }
        inner.commit_times.insert(commit, time);
        if let Some(s) = statement {
            inner.statements.insert(s, commit);
        }

        debug!(%commit, ops = batch.len(), "ledger commit");
        Ok(commit)
    }

    /// Appends a single data operation (MUTATE or TRUNCATE) to a live object.
    ///
    /// Structural operations (create, rename, drop, undrop) go through
    /// [`Ledger::commit`].
    pub fn append(
        &self,
        object: ObjectId,
        op: OpKind,
        snapshot: SnapshotRef,
        statement: Option<StatementId>,
        now: Timestamp,
    ) -> Result<CommitId> {
        let batch = data_batch(object, op, snapshot)?;
        self.commit(&batch, statement, now)
    }

    /// Appends a data operation computed from the state at `base`.
    ///
    /// Fails with [`Error::WriteConflict`] if another commit has landed on
    /// the object since `base`; the caller rebuilds its state and retries.
    pub fn append_after(
        &self,
        object: ObjectId,
        base: CommitId,
        op: OpKind,
        snapshot: SnapshotRef,
        statement: Option<StatementId>,
        now: Timestamp,
    ) -> Result<CommitId> {
        let mut batch = data_batch(object, op, snapshot)?;
        batch.expect_latest(object, base);
        self.commit(&batch, statement, now)
    }

    /// Runs `f` over a borrowed view of one object's log.
    pub fn read<T>(&self, object: ObjectId, f: impl FnOnce(LogView<'_>) -> T) -> Result<T> {
        let inner = self.inner.read();
        let log = inner
            .logs
            .get(&object)
            .ok_or_else(|| Error::ObjectNotFound(object.to_string()))?;
        Ok(f(LogView {
            entries: &log.entries,
            generation: &log.generation,
            reclaimed_below: log.reclaimed_below,
        }))
    }

    /// Returns a copy of an object's retained entries.
    pub fn entries(&self, object: ObjectId) -> Result<Vec<VersionEntry>> {
        self.read(object, |view| view.entries.to_vec())
    }

    /// Returns the newest retained entry of an object.
    pub fn latest(&self, object: ObjectId) -> Result<VersionEntry> {
        self.read(object, |view| view.entries.last().cloned())?
            .ok_or_else(|| Error::ObjectNotFound(object.to_string()))
    }

    /// Returns the object's generation record.
    pub fn generation(&self, object: ObjectId) -> Result<Generation> {
        self.read(object, |view| view.generation.clone())
    }

    /// Returns the active object holding `name` under `parent`.
    pub fn active_by_name(&self, parent: Option<ObjectId>, name: &str) -> Option<ObjectId> {
        self.inner.read().active_holder(parent, name)
    }

    /// Returns every non-reclaimed generation that carries `name` under `parent`.
    ///
    /// Dropped generations come first ordered by drop commit id, so the most
    /// recently dropped is last among them; the active generation, if any,
    /// follows.
    pub fn generations(&self, parent: Option<ObjectId>, name: &str) -> Vec<Generation> {
        let inner = self.inner.read();
        let mut out: Vec<Generation> = inner
            .logs
            .values()
            .map(|log| &log.generation)
            .filter(|g| !g.is_reclaimed() && g.parent == parent && g.name == name)
            .cloned()
            .collect();
        out.sort_by_key(|g| (g.is_active(), g.drop_commit(), g.created));
        out
    }

    /// Returns every generation the ledger has ever seen, in creation order.
    pub fn all_generations(&self) -> Vec<Generation> {
        let inner = self.inner.read();
        let mut out: Vec<Generation> = inner.logs.values().map(|l| l.generation.clone()).collect();
        out.sort_by_key(|g| (g.created, g.object));
        out
    }

    /// Returns every object id known to the ledger.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.inner.read().logs.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Looks up the commit produced by a statement.
    pub fn statement_commit(&self, statement: &StatementId) -> Option<CommitId> {
        self.inner.read().statements.get(statement).copied()
    }

    /// Returns the advisory time of a commit.
    pub fn commit_time(&self, commit: CommitId) -> Option<Timestamp> {
        self.inner.read().commit_times.get(&commit).copied()
    }

    /// Returns the most recently assigned commit id, or `c0` if none.
    #[inline]
    pub fn current_commit(&self) -> CommitId {
        CommitId(self.next_commit.load(Ordering::Acquire).saturating_sub(1))
    }

    /// Number of distinct data states referenced by retained entries.
    pub fn referenced_snapshots(&self) -> usize {
        self.inner.read().snapshot_refs.len()
    }

    /// Removes entries of a live object with commit ids below `below`.
    ///
    /// The newest entry is always kept so the object keeps a current state.
    pub fn reclaim_below(&self, object: ObjectId, below: CommitId) -> Result<Reclaimed> {
        let mut inner = self.inner.write();
        let log = inner
            .logs
            .get_mut(&object)
            .ok_or_else(|| Error::ObjectNotFound(object.to_string()))?;

        let keep_from = log
            .entries
            .iter()
            .position(|e| e.commit >= below)
            .unwrap_or(log.entries.len())
            .min(log.entries.len().saturating_sub(1));

        let removed: Vec<_> = log.entries.drain(..keep_from).collect();
        if let Some(last) = removed.last() {
            log.reclaimed_below = log.reclaimed_below.max(last.commit.next());
        }
        let released = inner.forget(&removed);
        Ok(Reclaimed {
            entries: removed,
            released,
        })
    }

    /// Reclaims a dropped generation entirely. The generation becomes
    /// `Reclaimed` and every entry is handed back to the caller.
    pub fn purge(&self, object: ObjectId) -> Result<Reclaimed> {
        let mut inner = self.inner.write();
        let log = inner
            .logs
            .get_mut(&object)
            .ok_or_else(|| Error::ObjectNotFound(object.to_string()))?;

        let drop_commit = match log.generation.state {
            GenerationState::Dropped { drop_commit, .. } => drop_commit,
            _ => {
                return Err(Error::InvalidOperation(format!(
                    "object {object} is not dropped"
                )))
            }
        };

        log.generation.state = GenerationState::Reclaimed { drop_commit };
        log.reclaimed_below = drop_commit.next();
        let removed = std::mem::take(&mut log.entries);
        let released = inner.forget(&removed);
        Ok(Reclaimed {
            entries: removed,
            released,
        })
    }
}

fn data_batch(object: ObjectId, op: OpKind, snapshot: SnapshotRef) -> Result<LedgerBatch> {
    let mut batch = LedgerBatch::new();
    match op {
        OpKind::Mutate => batch.mutate(object, snapshot),
        OpKind::Truncate => batch.truncate(object, snapshot),
        other => {
            return Err(Error::InvalidOperation(format!(
                "{other:?} must be committed through a ledger batch"
            )))
        }
    };
    Ok(batch)
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ObjectKind;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn create_table(ledger: &Ledger, id: u64, name: &str) -> CommitId {
        let mut batch = LedgerBatch::new();
        batch.create(
            ObjectId(id),
            ObjectKind::Table,
            name,
            Some(ObjectId(100)),
            SnapshotRef(id * 10),
        );
        ledger.commit(&batch, None, ts(id)).unwrap()
    }

    fn drop_table(ledger: &Ledger, id: u64) -> CommitId {
        let mut batch = LedgerBatch::new();
        batch.drop_object(ObjectId(id), 1);
        ledger.commit(&batch, None, ts(1_000 + id)).unwrap()
    }

    #[test]
    fn test_append_monotonic() {
        let ledger = Ledger::new();
        let c1 = create_table(&ledger, 1, "t");
        let c2 = ledger
            .append(ObjectId(1), OpKind::Mutate, SnapshotRef(11), None, ts(5))
            .unwrap();
        let c3 = ledger
            .append(ObjectId(1), OpKind::Truncate, SnapshotRef(12), None, ts(6))
            .unwrap();

        assert!(c1 < c2 && c2 < c3);
        assert_eq!(ledger.current_commit(), c3);

        let entries = ledger.entries(ObjectId(1)).unwrap();
        let ops: Vec<_> = entries.iter().map(|e| e.op).collect();
        assert_eq!(ops, vec![OpKind::Create, OpKind::Mutate, OpKind::Truncate]);
    }

    #[test]
    fn test_commit_time_never_decreases() {
        let ledger = Ledger::new();
        create_table(&ledger, 5, "t");
        let c = ledger
            .append(ObjectId(5), OpKind::Mutate, SnapshotRef(51), None, ts(1))
            .unwrap();
        assert_eq!(ledger.commit_time(c), Some(ts(5)));
    }

    #[test]
    fn test_append_unknown_object() {
        let ledger = Ledger::new();
        let result = ledger.append(ObjectId(9), OpKind::Mutate, SnapshotRef(1), None, ts(1));
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[test]
    fn test_append_rejects_structural_ops() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        let result = ledger.append(ObjectId(1), OpKind::Drop, SnapshotRef(1), None, ts(2));
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_append_to_dropped_object() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        drop_table(&ledger, 1);

        let result = ledger.append(ObjectId(1), OpKind::Mutate, SnapshotRef(1), None, ts(2_000));
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[test]
    fn test_drop_entry_keeps_last_snapshot() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        drop_table(&ledger, 1);

        let last = ledger.latest(ObjectId(1)).unwrap();
        assert_eq!(last.op, OpKind::Drop);
        assert!(last.dropped);
        assert_eq!(last.snapshot, SnapshotRef(10));
    }

    #[test]
    fn test_create_name_conflict() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");

        let mut batch = LedgerBatch::new();
        batch.create(ObjectId(2), ObjectKind::Table, "t", Some(ObjectId(100)), SnapshotRef(20));
        let result = ledger.commit(&batch, None, ts(3));
        assert!(matches!(result, Err(Error::NameConflict { .. })));
    }

    #[test]
    fn test_rename_frees_name() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");

        let mut batch = LedgerBatch::new();
        batch.rename(ObjectId(1), "t_old");
        ledger.commit(&batch, None, ts(3)).unwrap();

        assert_eq!(ledger.active_by_name(Some(ObjectId(100)), "t"), None);
        assert_eq!(
            ledger.active_by_name(Some(ObjectId(100)), "t_old"),
            Some(ObjectId(1))
        );
        create_table(&ledger, 2, "t");
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "a");
        let before = ledger.current_commit();

        let mut batch = LedgerBatch::new();
        batch.drop_object(ObjectId(1), 1).drop_object(ObjectId(77), 1);
        assert!(ledger.commit(&batch, None, ts(10)).is_err());

        assert_eq!(ledger.current_commit(), before);
        assert!(ledger.generation(ObjectId(1)).unwrap().is_active());
    }

    #[test]
    fn test_batch_shares_commit_id() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "a");
        create_table(&ledger, 2, "b");

        let mut batch = LedgerBatch::new();
        batch.drop_object(ObjectId(1), 3).drop_object(ObjectId(2), 3);
        let commit = ledger.commit(&batch, None, ts(10)).unwrap();

        assert_eq!(ledger.generation(ObjectId(1)).unwrap().drop_commit(), Some(commit));
        assert_eq!(ledger.generation(ObjectId(2)).unwrap().drop_commit(), Some(commit));
    }

    #[test]
    fn test_duplicate_object_in_batch() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "a");

        let mut batch = LedgerBatch::new();
        batch.mutate(ObjectId(1), SnapshotRef(2)).drop_object(ObjectId(1), 1);
        assert!(matches!(
            ledger.commit(&batch, None, ts(10)),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_duplicate_statement() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "a");
        ledger
            .append(ObjectId(1), OpKind::Mutate, SnapshotRef(2), Some("q1".into()), ts(2))
            .unwrap();

        let result =
            ledger.append(ObjectId(1), OpKind::Mutate, SnapshotRef(3), Some("q1".into()), ts(3));
        assert!(matches!(result, Err(Error::DuplicateStatement(_))));
    }

    #[test]
    fn test_statement_index() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "a");
        let c = ledger
            .append(ObjectId(1), OpKind::Mutate, SnapshotRef(2), Some("q1".into()), ts(2))
            .unwrap();
        assert_eq!(ledger.statement_commit(&"q1".into()), Some(c));
        assert_eq!(ledger.statement_commit(&"q2".into()), None);
    }

    #[test]
    fn test_generations_order() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        let d1 = drop_table(&ledger, 1);
        create_table(&ledger, 2, "t");
        let d2 = drop_table(&ledger, 2);
        create_table(&ledger, 3, "t");

        let gens = ledger.generations(Some(ObjectId(100)), "t");
        let ids: Vec<_> = gens.iter().map(|g| g.object).collect();
        assert_eq!(ids, vec![ObjectId(1), ObjectId(2), ObjectId(3)]);
        assert_eq!(gens[0].drop_commit(), Some(d1));
        assert_eq!(gens[1].drop_commit(), Some(d2));
        assert!(gens[2].is_active());
    }

    #[test]
    fn test_undrop_reopens_in_place() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        drop_table(&ledger, 1);

        let mut batch = LedgerBatch::new();
        batch.undrop(ObjectId(1));
        ledger.commit(&batch, None, ts(5_000)).unwrap();

        let g = ledger.generation(ObjectId(1)).unwrap();
        assert!(g.is_active());
        let last = ledger.latest(ObjectId(1)).unwrap();
        assert_eq!(last.op, OpKind::Undrop);
        assert_eq!(last.snapshot, SnapshotRef(10));
    }

    #[test]
    fn test_undrop_name_conflict() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        drop_table(&ledger, 1);
        create_table(&ledger, 2, "t");

        let mut batch = LedgerBatch::new();
        batch.undrop(ObjectId(1));
        assert!(matches!(
            ledger.commit(&batch, None, ts(5_000)),
            Err(Error::NameConflict { .. })
        ));
    }

    #[test]
    fn test_reclaim_keeps_newest_entry() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        for i in 0..3 {
            ledger
                .append(ObjectId(1), OpKind::Mutate, SnapshotRef(20 + i), None, ts(10 + i))
                .unwrap();
        }

        let removed = ledger.reclaim_below(ObjectId(1), CommitId(u64::MAX)).unwrap();
        assert_eq!(removed.len(), 3);

        let remaining = ledger.entries(ObjectId(1)).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].snapshot, SnapshotRef(22));
        let floor = ledger.read(ObjectId(1), |v| v.reclaimed_below).unwrap();
        assert_eq!(floor, remaining[0].commit);
    }

    #[test]
    fn test_purge_marks_reclaimed() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        drop_table(&ledger, 1);

        let removed = ledger.purge(ObjectId(1)).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(ledger.generation(ObjectId(1)).unwrap().is_reclaimed());
        assert!(ledger.generations(Some(ObjectId(100)), "t").is_empty());

        let result = ledger.append(ObjectId(1), OpKind::Mutate, SnapshotRef(1), None, ts(9_000));
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[test]
    fn test_reclaim_releases_unshared_snapshots() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        ledger
            .append(ObjectId(1), OpKind::Mutate, SnapshotRef(11), None, ts(2))
            .unwrap();
        ledger
            .append(ObjectId(1), OpKind::Mutate, SnapshotRef(12), None, ts(3))
            .unwrap();

        // A clone aliasing the middle state.
        let mut batch = LedgerBatch::new();
        batch.create(ObjectId(2), ObjectKind::Table, "c", Some(ObjectId(100)), SnapshotRef(11));
        ledger.commit(&batch, None, ts(4)).unwrap();
        assert_eq!(ledger.referenced_snapshots(), 3);

        let reclaimed = ledger.reclaim_below(ObjectId(1), CommitId(u64::MAX)).unwrap();
        assert_eq!(reclaimed.len(), 2);
        assert_eq!(reclaimed.released, vec![SnapshotRef(10)]);
        assert_eq!(ledger.referenced_snapshots(), 2);
    }

    #[test]
    fn test_purge_forgets_statements_and_times() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        let c = ledger
            .append(ObjectId(1), OpKind::Mutate, SnapshotRef(11), Some("q1".into()), ts(2))
            .unwrap();
        drop_table(&ledger, 1);

        let reclaimed = ledger.purge(ObjectId(1)).unwrap();
        assert_eq!(reclaimed.len(), 3);
        assert_eq!(reclaimed.released, vec![SnapshotRef(10), SnapshotRef(11)]);
        assert_eq!(ledger.statement_commit(&"q1".into()), None);
        assert_eq!(ledger.commit_time(c), None);
        assert_eq!(ledger.referenced_snapshots(), 0);
    }

    #[test]
    fn test_shared_commit_outlives_partial_purge() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "a");
        create_table(&ledger, 2, "b");
        let mut batch = LedgerBatch::new();
        batch.drop_object(ObjectId(1), 1).drop_object(ObjectId(2), 1);
        let dropped = ledger.commit(&batch, None, ts(10)).unwrap();

        ledger.purge(ObjectId(1)).unwrap();
        assert!(ledger.commit_time(dropped).is_some());
        ledger.purge(ObjectId(2)).unwrap();
        assert!(ledger.commit_time(dropped).is_none());
    }

    #[test]
    fn test_append_after_detects_conflict() {
        let ledger = Ledger::new();
        let base = create_table(&ledger, 1, "t");
        let next = ledger
            .append_after(ObjectId(1), base, OpKind::Mutate, SnapshotRef(11), None, ts(2))
            .unwrap();

        let result =
            ledger.append_after(ObjectId(1), base, OpKind::Mutate, SnapshotRef(12), None, ts(3));
        assert!(matches!(result, Err(Error::WriteConflict { .. })));
        assert_eq!(ledger.current_commit(), next);
        assert_eq!(ledger.latest(ObjectId(1)).unwrap().snapshot, SnapshotRef(11));
    }

    #[test]
    fn test_rename_marks_generation() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        assert_eq!(ledger.generation(ObjectId(1)).unwrap().renamed, None);

        let mut batch = LedgerBatch::new();
        batch.rename(ObjectId(1), "t2");
        let renamed = ledger.commit(&batch, None, ts(3)).unwrap();

        let g = ledger.generation(ObjectId(1)).unwrap();
        assert_eq!(g.renamed, Some(renamed));
        assert_eq!(g.created, CommitId(1));
        assert!(ledger.generations(Some(ObjectId(100)), "t").is_empty());
        assert_eq!(ledger.generations(Some(ObjectId(100)), "t2").len(), 1);
    }

    #[test]
    fn test_purge_requires_dropped() {
        let ledger = Ledger::new();
        create_table(&ledger, 1, "t");
        assert!(ledger.purge(ObjectId(1)).is_err());
    }

    #[test]
    fn test_concurrent_appends_strictly_ordered() {
        use std::sync::Arc;
        use std::thread;

        let ledger = Arc::new(Ledger::new());
        create_table(&ledger, 1, "t");

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..250 {
                        ledger
                            .append(ObjectId(1), OpKind::Mutate, SnapshotRef(t * 1000 + i), None, ts(2))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        let entries = ledger.entries(ObjectId(1)).unwrap();
        assert_eq!(entries.len(), 1001);
        assert!(entries.windows(2).all(|w| w[0].commit < w[1].commit));
    }
}
