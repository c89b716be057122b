// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Object metadata types.

use serde::{Deserialize, Serialize};

use crate::ledger::CommitId;
use crate::time::Timestamp;

/// Stable internal identifier of an object. Never reused, survives renames and undrop.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ObjectId(pub u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of catalog object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Database,
    Schema,
    Table,
    /// A table backed by a row store; excluded from statement-based container clones.
    HybridTable,
    /// Views carry a definition but no data history and are never time-travel targets.
    View,
}

impl ObjectKind {
    /// Returns true for kinds that contain other objects.
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self, ObjectKind::Database | ObjectKind::Schema)
    }

    /// Returns true for kinds that hold row data.
    #[inline]
    pub fn holds_rows(&self) -> bool {
        matches!(self, ObjectKind::Table | ObjectKind::HybridTable)
    }

    /// Returns true if an object of kind `child` may live directly under this kind.
    pub fn accepts_child(&self, child: ObjectKind) -> bool {
        match self {
            ObjectKind::Database => child == ObjectKind::Schema,
            ObjectKind::Schema => matches!(
                child,
                ObjectKind::Table | ObjectKind::HybridTable | ObjectKind::View
            ),
            ObjectKind::Table | ObjectKind::HybridTable | ObjectKind::View => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Database => "database",
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::HybridTable => "hybrid table",
            ObjectKind::View => "view",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage class of an object.
///
/// The class bounds the retention that may be configured and decides whether
/// expired history goes to the cold tier or is purged outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableClass {
    #[default]
    Permanent,
    Transient,
    Temporary,
}

impl TableClass {
    /// Maximum `retention_days` that may be set on an object of this class.
    pub fn max_retention_days(&self) -> u32 {
        match self {
            TableClass::Permanent => 90,
            TableClass::Transient | TableClass::Temporary => 1,
        }
    }

    /// Returns true if expired history moves to the cold tier instead of being purged.
    #[inline]
    pub fn has_cold_tier(&self) -> bool {
        matches!(self, TableClass::Permanent)
    }
}

/// Explicit per-object overrides. `None` inherits from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectSettings {
    pub retention_days: Option<u32>,
    pub max_extension_days: Option<u32>,
}

/// A commit id paired with its advisory wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMark {
    pub commit: CommitId,
    pub time: Timestamp,
}

/// Where a clone came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneOrigin {
    pub source: ObjectId,
    pub commit: CommitId,
}

/// Catalog metadata of one object.
///
/// The display name and lifecycle state are not stored here: they belong to the
/// object's generation in the version ledger, since rename and drop are ledger
/// operations.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub class: TableClass,
    pub parent: Option<ObjectId>,
    pub settings: ObjectSettings,
    /// Current column schema, used to project every historical read.
    pub columns: Vec<String>,
    /// View text. Only set for views.
    pub definition: Option<String>,
    pub created: CommitMark,
    /// Set while change tracking (explicit or through a stream) is on.
    pub change_tracking: Option<CommitMark>,
    pub clone_origin: Option<CloneOrigin>,
}

impl ObjectMeta {
    /// Returns true if the object is a base object that time travel may target.
    #[inline]
    pub fn is_time_travel_target(&self) -> bool {
        self.kind != ObjectKind::View
    }
}
