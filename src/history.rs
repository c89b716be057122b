// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Generation history listing for external tools.

use serde::{Deserialize, Serialize};

use crate::catalog::{ObjectId, ObjectKind};
use crate::error::Result;
use crate::ledger::{CommitId, Generation, GenerationState, Ledger};
use crate::time::Timestamp;

/// One generation as shown by a history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub name: String,
    pub kind: ObjectKind,
    pub object: ObjectId,
    pub created_commit: CommitId,
    pub created_time: Timestamp,
    /// Commit where the object took its current name, if renamed.
    #[serde(default)]
    pub renamed_commit: Option<CommitId>,
    pub dropped_commit: Option<CommitId>,
    pub dropped_time: Option<Timestamp>,
    pub retention_at_drop: Option<u32>,
}

impl From<&Generation> for HistoryRecord {
    fn from(g: &Generation) -> Self {
        let (dropped_commit, dropped_time, retention_at_drop) = match g.state {
            GenerationState::Dropped {
                drop_commit,
                drop_time,
                retention_days,
            } => (Some(drop_commit), Some(drop_time), Some(retention_days)),
            GenerationState::Active | GenerationState::Reclaimed { .. } => (None, None, None),
        };
        Self {
            name: g.name.clone(),
            kind: g.kind,
            object: g.object,
            created_commit: g.created,
            created_time: g.created_time,
            renamed_commit: g.renamed,
            dropped_commit,
            dropped_time,
            retention_at_drop,
        }
    }
}

/// Every non-reclaimed generation directly under `parent`, ordered by name
/// and then as [`Ledger::generations`] orders a name's stack.
pub fn list(ledger: &Ledger, parent: Option<ObjectId>) -> Vec<HistoryRecord> {
    let mut names: Vec<String> = ledger
        .all_generations()
        .into_iter()
        .filter(|g| g.parent == parent && !g.is_reclaimed())
        .map(|g| g.name)
        .collect();
    names.sort();
    names.dedup();

    names
        .iter()
        .flat_map(|name| list_named(ledger, parent, name))
        .collect()
}

/// Every non-reclaimed generation of `name` under `parent`.
pub fn list_named(ledger: &Ledger, parent: Option<ObjectId>, name: &str) -> Vec<HistoryRecord> {
    ledger
        .generations(parent, name)
        .iter()
        .map(HistoryRecord::from)
        .collect()
}

/// Serializes a listing as pretty-printed JSON.
pub fn to_json(records: &[HistoryRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}
