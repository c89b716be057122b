// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Background reclamation of history outside the retention window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{Catalog, ObjectId, TableClass};
use crate::changes::StreamRegistry;
use crate::config::AccountSettings;
use crate::error::Result;
use crate::ledger::{CommitId, Generation, GenerationState, Ledger, Reclaimed};
use crate::retention::RetentionResolver;
use crate::snapshot::SnapshotStore;
use crate::time::{Clock, Timestamp};

use super::cold::{ArchivedVersion, ColdTier};
use super::gate::WatermarkGate;

/// Statistics from one reclamation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReclaimStats {
    pub objects_scanned: u64,
    /// Entries moved to the cold tier (permanent class).
    pub entries_archived: u64,
    /// Entries discarded outright (transient and temporary classes).
    pub entries_purged: u64,
    pub generations_reclaimed: u64,
    /// Data states freed from the snapshot store.
    pub snapshots_released: u64,
    /// Safe watermark the pass ran under.
    pub watermark: CommitId,
}

/// Advances the safe watermark and reclaims ledger history behind it.
///
/// For a live object, entries older than the one covering the retention
/// window start, and older than every non-stale stream offset, are
/// eligible. A dropped generation is purged whole once its frozen retention
/// has passed. Nothing at or above the safe watermark or an outstanding read
/// ticket is touched. Data states no retained entry references are freed.
pub struct Reclaimer {
    ledger: Arc<Ledger>,
    catalog: Arc<Catalog>,
    snapshots: Arc<dyn SnapshotStore>,
    streams: Arc<StreamRegistry>,
    gate: Arc<WatermarkGate>,
    cold: Arc<dyn ColdTier>,
    clock: Arc<dyn Clock>,
    account: Arc<RwLock<AccountSettings>>,
    passes: AtomicU64,
}

impl Reclaimer {
    pub fn new(
        ledger: Arc<Ledger>,
        catalog: Arc<Catalog>,
        snapshots: Arc<dyn SnapshotStore>,
        streams: Arc<StreamRegistry>,
        gate: Arc<WatermarkGate>,
        cold: Arc<dyn ColdTier>,
        clock: Arc<dyn Clock>,
        account: Arc<RwLock<AccountSettings>>,
    ) -> Self {
        Self {
            ledger,
            catalog,
            snapshots,
            streams,
            gate,
            cold,
            clock,
            account,
            passes: AtomicU64::new(0),
        }
    }

    /// Number of completed passes.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Runs one reclamation pass.
    ///
    /// Failures on individual objects are logged and skipped; a lagging
    /// watermark is never an error.
    #[instrument(skip(self))]
    pub fn run_once(&self) -> ReclaimStats {
        let now = self.clock.now();
        let account = *self.account.read();
        let resolver = RetentionResolver::new(&self.catalog, account);
        let watermark = self.gate.advance(self.ledger.current_commit().next());

        let mut stats = ReclaimStats {
            watermark,
            ..Default::default()
        };

        for generation in self.ledger.all_generations() {
            let result = match generation.state {
                GenerationState::Active => {
                    stats.objects_scanned += 1;
                    self.reclaim_live(&generation, &resolver, watermark, now, &mut stats)
                }
                GenerationState::Dropped { drop_commit, .. } => {
                    stats.objects_scanned += 1;
                    if !generation.is_recoverable(now) && drop_commit < watermark {
                        self.reclaim_dropped(&generation, drop_commit, &mut stats)
                    } else {
                        Ok(())
                    }
                }
                GenerationState::Reclaimed { .. } => Ok(()),
            };

            if let Err(e) = result {
                warn!(object = %generation.object, error = %e, "skipping object during reclamation");
            }
        }

        self.passes.fetch_add(1, Ordering::Relaxed);
        info!(
            %watermark,
            archived = stats.entries_archived,
            purged = stats.entries_purged,
            generations = stats.generations_reclaimed,
            released = stats.snapshots_released,
            "reclamation pass complete"
        );
        stats
    }

    fn reclaim_live(
        &self,
        generation: &Generation,
        resolver: &RetentionResolver<'_>,
        watermark: CommitId,
        now: Timestamp,
        stats: &mut ReclaimStats,
    ) -> Result<()> {
        let object = generation.object;
        let meta = self.catalog.get(object)?;
        let window_start = now.days_before(resolver.effective_retention(object)?);
        let staleness = resolver.staleness_window(object)?;
        let streams = self.streams.for_object(object);

        let bound = self.ledger.read(object, |view| {
            // The entry covering the window start stays queryable.
            let anchor = view.entries.partition_point(|e| e.time <= window_start);
            let mut bound = view.entries[..anchor].last()?.commit;

            for stream in &streams {
                if stream.is_stale(staleness, view.reclaimed_below, now) {
                    continue;
                }
                let covering = view.entries.partition_point(|e| e.commit <= stream.offset);
                if let Some(entry) = view.entries[..covering].last() {
                    bound = bound.min(entry.commit);
                }
            }
            Some(bound)
        })?;

        let Some(bound) = bound else {
            return Ok(());
        };

        let removed = self.gate.with_reclaim_limit(|limit| {
            self.ledger
                .reclaim_below(object, bound.min(watermark).min(limit))
        })?;
        if !removed.is_empty() {
            debug!(%object, count = removed.len(), "reclaimed history");
        }
        self.dispose(meta.class, object, removed, stats);
        Ok(())
    }

    fn reclaim_dropped(
        &self,
        generation: &Generation,
        drop_commit: CommitId,
        stats: &mut ReclaimStats,
    ) -> Result<()> {
        let object = generation.object;
        let class = self
            .catalog
            .get(object)
            .map(|meta| meta.class)
            .unwrap_or_default();

        let purged = self.gate.with_reclaim_limit(|limit| {
            (drop_commit < limit).then(|| self.ledger.purge(object))
        });
        let Some(removed) = purged.transpose()? else {
            return Ok(());
        };
        self.dispose(class, object, removed, stats);
        self.catalog.remove(object);
        stats.generations_reclaimed += 1;

        debug!(%object, name = %generation.name, "reclaimed dropped generation");
        Ok(())
    }

    /// Hands removed entries to the cold tier or discards them, then frees
    /// the data states nothing retained still points at.
    fn dispose(
        &self,
        class: TableClass,
        object: ObjectId,
        removed: Reclaimed,
        stats: &mut ReclaimStats,
    ) {
        if removed.is_empty() {
            return;
        }
        let count = removed.len() as u64;
        if class.has_cold_tier() {
            let versions = removed
                .entries
                .into_iter()
                .map(|entry| ArchivedVersion {
                    rows: self.snapshots.load(entry.snapshot),
                    entry,
                })
                .collect();
            self.cold.archive(object, versions);
            stats.entries_archived += count;
        } else {
            stats.entries_purged += count;
        }

        for snapshot in &removed.released {
            self.snapshots.release(*snapshot);
        }
        stats.snapshots_released += removed.released.len() as u64;
    }

    /// Runs passes on a tokio interval until the returned handle is shut down.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> ReclaimerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        self.run_once();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("reclaimer stopped");
        });

        ReclaimerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a spawned reclaimer task.
#[derive(Debug)]
pub struct ReclaimerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReclaimerHandle {
    /// Signals the task to stop and waits for it to finish its current pass.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "reclaimer task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
