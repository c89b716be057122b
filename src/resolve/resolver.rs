// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time resolver.

use tracing::debug;

use crate::catalog::{Catalog, ObjectId};
use crate::changes::StreamRegistry;
use crate::error::{Error, Result};
use crate::ledger::{CommitId, Ledger};
use crate::retention::RetentionResolver;
use crate::time::Timestamp;

use super::point::{Anchor, BoundPoint, Cut, PointInTime, ResolvedVersion, TimeRef};

/// Maps point-in-time references to concrete ledger entries.
///
/// A resolver is bound to one evaluation of "now", so resolving the same
/// point for a container and each of its children sees one consistent cut.
pub struct PointInTimeResolver<'a> {
    ledger: &'a Ledger,
    catalog: &'a Catalog,
    retention: RetentionResolver<'a>,
    streams: &'a StreamRegistry,
    now: Timestamp,
}

impl<'a> PointInTimeResolver<'a> {
    pub fn new(
        ledger: &'a Ledger,
        catalog: &'a Catalog,
        retention: RetentionResolver<'a>,
        streams: &'a StreamRegistry,
        now: Timestamp,
    ) -> Self {
        Self {
            ledger,
            catalog,
            retention,
            streams,
            now,
        }
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Reduces a reference to a cut over the ledger.
    pub fn bind(&self, point: &PointInTime) -> Result<BoundPoint> {
        let inclusive = point.anchor == Anchor::At;

        let mut extended_window = None;
        let (cut, target_time) = match &point.reference {
            TimeRef::Timestamp(ts) => {
                if *ts > self.now {
                    return Err(Error::FutureTime {
                        requested: *ts,
                        now: self.now,
                    });
                }
                (Cut::Time { at: *ts, inclusive }, *ts)
            }
            TimeRef::Offset(secs) => {
                if *secs > 0 {
                    return Err(Error::FutureTime {
                        requested: self.now.offset_secs(*secs),
                        now: self.now,
                    });
                }
                let ts = self.now.offset_secs(*secs);
                (Cut::Time { at: ts, inclusive }, ts)
            }
            TimeRef::Statement(statement) => {
                let commit = self
                    .ledger
                    .statement_commit(statement)
                    .ok_or_else(|| Error::UnknownStatement(statement.clone()))?;
                let time = self.ledger.commit_time(commit).unwrap_or(self.now);
                (Cut::Commit { at: commit, inclusive }, time)
            }
            TimeRef::Stream(name) => {
                if !inclusive {
                    return Err(Error::InvalidPoint(
                        "BEFORE is not supported for stream positions".to_string(),
                    ));
                }
                let stream = self.streams.get(name)?;
                let staleness = self.retention.staleness_window(stream.object)?;
                let reclaimed_below = self.ledger.read(stream.object, |v| v.reclaimed_below)?;
                if stream.is_stale(staleness, reclaimed_below, self.now) {
                    return Err(Error::StaleStream { name: name.clone() });
                }
                extended_window = Some(staleness);
                (
                    Cut::Commit {
                        at: stream.offset,
                        inclusive: true,
                    },
                    stream.offset_time,
                )
            }
        };

        Ok(BoundPoint {
            cut,
            target_time,
            now: self.now,
            extended_window,
        })
    }

    /// Resolves a reference for one object.
    pub fn resolve(&self, object: ObjectId, point: &PointInTime) -> Result<ResolvedVersion> {
        let bound = self.bind(point)?;
        self.resolve_bound(object, &bound)
    }

    /// Resolves an already-bound point for one object.
    ///
    /// Checks, in order: the object existed at the cut, then the cut lies
    /// inside the retention window and its entry has not been reclaimed.
    pub fn resolve_bound(&self, object: ObjectId, bound: &BoundPoint) -> Result<ResolvedVersion> {
        let meta = self.catalog.get(object)?;
        if !meta.is_time_travel_target() {
            return Err(Error::UnsupportedTarget(format!(
                "{} {object} has no data history",
                meta.kind
            )));
        }

        let generation = self.ledger.generation(object)?;
        let retention_days = self.retention.for_generation(&generation)?;

        let (found, reclaimed_below) = self.ledger.read(object, |view| {
            let idx = view
                .entries
                .partition_point(|e| bound.cut.admits_entry(e));
            let found = idx.checked_sub(1).map(|i| view.entries[i].clone());
            (found, view.reclaimed_below)
        })?;

        let entry = match found {
            Some(entry) => entry,
            None if reclaimed_below > CommitId::ZERO
                && bound.cut.admits_mark(&meta.created) =>
            {
                return Err(Error::RetentionExceeded {
                    object,
                    retention_days,
                })
            }
            None => return Err(Error::ObjectDidNotExistAtPoint { object }),
        };

        if entry.dropped || entry.commit < meta.created.commit {
            return Err(Error::ObjectDidNotExistAtPoint { object });
        }

        let window_days = bound
            .extended_window
            .map_or(retention_days, |days| days.max(retention_days));
        let window_start = self.now.days_before(window_days);
        if bound.target_time < window_start || entry.commit < reclaimed_below {
            return Err(Error::RetentionExceeded {
                object,
                retention_days,
            });
        }

        debug!(%object, commit = %entry.commit, "resolved point in time");
        Ok(ResolvedVersion {
            entry,
            target_time: bound.target_time,
            retention_days,
        })
    }
}
