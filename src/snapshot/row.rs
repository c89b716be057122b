// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Row model and schema projection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Physical row identifier. Assigned at insert, stable across updates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RowId(pub u64);

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// A row image: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Every row of one data state, keyed by row id.
pub type RowSet = BTreeMap<RowId, Row>;

/// Builds a row from `(column, value)` pairs.
pub fn row<K, V, I>(pairs: I) -> Row
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Projects a row through the current column schema.
///
/// Columns added since the row was written read as `Null`; columns removed
/// since are dropped.
pub fn project_row(row: &Row, columns: &[String]) -> Row {
    columns
        .iter()
        .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
        .collect()
}

/// Projects every row of a data state through the current column schema.
pub fn project(rows: &RowSet, columns: &[String]) -> RowSet {
    rows.iter()
        .map(|(id, r)| (*id, project_row(r, columns)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_project_fills_new_columns_with_null() {
        let r = row([("id", Value::Int(1)), ("status", Value::from("open"))]);
        let projected = project_row(&r, &cols(&["id", "status", "region"]));
        assert_eq!(projected.get("region"), Some(&Value::Null));
        assert_eq!(projected.get("status"), Some(&Value::from("open")));
    }

    #[test]
    fn test_project_drops_removed_columns() {
        let r = row([("id", Value::Int(1)), ("legacy", Value::Bool(true))]);
        let projected = project_row(&r, &cols(&["id"]));
        assert_eq!(projected.len(), 1);
        assert!(!projected.contains_key("legacy"));
    }

    #[test]
    fn test_project_keeps_row_ids() {
        let mut rows = RowSet::new();
        rows.insert(RowId(7), row([("id", 1i64)]));
        let projected = project(&rows, &cols(&["id"]));
        assert!(projected.contains_key(&RowId(7)));
    }

    #[test]
    fn test_value_json_is_untagged() {
        let r = row([("id", Value::Int(3)), ("note", Value::Null)]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"id":3,"note":null}"#);
    }
}
