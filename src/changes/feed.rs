// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Row-level delta between two data states.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::snapshot::{Row, RowId, RowSet};

/// `CHANGES(INFORMATION => ...)` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeMode {
    /// Inserts, deletes and updates (as DELETE + INSERT pairs).
    #[default]
    Default,
    /// Only rows that are net-new at the end of the interval.
    AppendOnly,
}

/// `METADATA$ACTION` of a change row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Delete,
}

/// One row of a change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub action: ChangeAction,
    pub is_update: bool,
    pub row_id: RowId,
    pub row: Row,
}

impl ChangeRecord {
    fn insert(row_id: RowId, row: &Row, is_update: bool) -> Self {
        Self {
            action: ChangeAction::Insert,
            is_update,
            row_id,
            row: row.clone(),
        }
    }

    fn delete(row_id: RowId, row: &Row, is_update: bool) -> Self {
        Self {
            action: ChangeAction::Delete,
            is_update,
            row_id,
            row: row.clone(),
        }
    }
}

/// Computes the net delta from `from` to `to`, keyed by row id.
///
/// Output is ordered by row id, with the DELETE of an update before its INSERT.
/// A row inserted and deleted inside the interval is in neither state and so
/// never appears.
pub fn diff(from: &RowSet, to: &RowSet, mode: ChangeMode) -> Vec<ChangeRecord> {
    let mut out = Vec::new();
    let mut old_rows = from.iter().peekable();
    let mut new_rows = to.iter().peekable();

    loop {
        let step = match (old_rows.peek().copied(), new_rows.peek().copied()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((o, _)), Some((n, _))) => o.cmp(n),
        };

        match step {
            Ordering::Less => {
                if let Some((id, old)) = old_rows.next() {
                    if mode == ChangeMode::Default {
                        out.push(ChangeRecord::delete(*id, old, false));
                    }
                }
            }
            Ordering::Greater => {
                if let Some((id, new)) = new_rows.next() {
                    out.push(ChangeRecord::insert(*id, new, false));
                }
            }
            Ordering::Equal => {
                if let (Some((id, old)), Some((_, new))) = (old_rows.next(), new_rows.next()) {
                    if mode == ChangeMode::Default && old != new {
                        out.push(ChangeRecord::delete(*id, old, true));
                        out.push(ChangeRecord::insert(*id, new, true));
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{row, Value};

    fn rows(items: &[(u64, i64)]) -> RowSet {
        items
            .iter()
            .map(|(id, v)| (RowId(*id), row([("v", Value::Int(*v))])))
            .collect()
    }

    #[test]
    fn test_insert_delete_update() {
        let from = rows(&[(1, 10), (2, 20), (3, 30)]);
        let to = rows(&[(1, 10), (2, 21), (4, 40)]);

        let changes = diff(&from, &to, ChangeMode::Default);
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.row_id.0, c.action, c.is_update))
            .collect();
        assert_eq!(
            summary,
            vec![
                (2, ChangeAction::Delete, true),
                (2, ChangeAction::Insert, true),
                (3, ChangeAction::Delete, false),
                (4, ChangeAction::Insert, false),
            ]
        );
        assert_eq!(changes[0].row.get("v"), Some(&Value::Int(20)));
        assert_eq!(changes[1].row.get("v"), Some(&Value::Int(21)));
    }

    #[test]
    fn test_append_only_keeps_net_new() {
        let from = rows(&[(1, 10), (2, 20)]);
        let to = rows(&[(2, 25), (3, 30)]);

        let changes = diff(&from, &to, ChangeMode::AppendOnly);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].row_id, RowId(3));
        assert_eq!(changes[0].action, ChangeAction::Insert);
        assert!(!changes[0].is_update);
    }

    #[test]
    fn test_identical_states_produce_nothing() {
        let state = rows(&[(1, 10), (2, 20)]);
        assert!(diff(&state, &state, ChangeMode::Default).is_empty());
    }
}
