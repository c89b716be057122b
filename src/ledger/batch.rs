// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Multi-object ledger commits.

use crate::catalog::{ObjectId, ObjectKind};

use super::{CommitId, SnapshotRef};

/// A single operation inside a [`LedgerBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Create {
        object: ObjectId,
        kind: ObjectKind,
        name: String,
        parent: Option<ObjectId>,
        snapshot: SnapshotRef,
    },
    Mutate {
        object: ObjectId,
        snapshot: SnapshotRef,
    },
    Truncate {
        object: ObjectId,
        snapshot: SnapshotRef,
    },
    Rename {
        object: ObjectId,
        name: String,
    },
    Drop {
        object: ObjectId,
        retention_days: u32,
    },
    Undrop {
        object: ObjectId,
    },
}

impl LedgerOp {
    /// Object the operation applies to.
    pub fn object(&self) -> ObjectId {
        match self {
            LedgerOp::Create { object, .. }
            | LedgerOp::Mutate { object, .. }
            | LedgerOp::Truncate { object, .. }
            | LedgerOp::Rename { object, .. }
            | LedgerOp::Drop { object, .. }
            | LedgerOp::Undrop { object } => *object,
        }
    }
}

/// A set of operations committed atomically under one commit id.
///
/// Container drop, container undrop and container clone touch many objects
/// in one statement; they either all land or none do. Each object may appear
/// at most once per batch.
///
/// A batch may also name the entry each object is expected to end on. The
/// commit is rejected with a write conflict if any of them has moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
    expected: Vec<(ObjectId, CommitId)>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        object: ObjectId,
        kind: ObjectKind,
        name: impl Into<String>,
        parent: Option<ObjectId>,
        snapshot: SnapshotRef,
    ) -> &mut Self {
        self.ops.push(LedgerOp::Create {
            object,
            kind,
            name: name.into(),
            parent,
            snapshot,
        });
        self
    }

    pub fn mutate(&mut self, object: ObjectId, snapshot: SnapshotRef) -> &mut Self {
        self.ops.push(LedgerOp::Mutate { object, snapshot });
        self
    }

    pub fn truncate(&mut self, object: ObjectId, snapshot: SnapshotRef) -> &mut Self {
        self.ops.push(LedgerOp::Truncate { object, snapshot });
        self
    }

    pub fn rename(&mut self, object: ObjectId, name: impl Into<String>) -> &mut Self {
        self.ops.push(LedgerOp::Rename {
            object,
            name: name.into(),
        });
        self
    }

    pub fn drop_object(&mut self, object: ObjectId, retention_days: u32) -> &mut Self {
        self.ops.push(LedgerOp::Drop {
            object,
            retention_days,
        });
        self
    }

    pub fn undrop(&mut self, object: ObjectId) -> &mut Self {
        self.ops.push(LedgerOp::Undrop { object });
        self
    }

    /// Requires `base` to still be the newest entry of `object` at commit.
    pub fn expect_latest(&mut self, object: ObjectId, base: CommitId) -> &mut Self {
        self.expected.push((object, base));
        self
    }

    /// Objects whose newest entry must be unchanged at commit.
    #[inline]
    pub fn expected(&self) -> &[(ObjectId, CommitId)] {
        &self.expected
    }

    #[inline]
    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chains() {
        let mut batch = LedgerBatch::new();
        batch
            .drop_object(ObjectId(1), 7)
            .drop_object(ObjectId(2), 7);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[1].object(), ObjectId(2));
    }

    #[test]
    fn test_expectations_are_not_ops() {
        let mut batch = LedgerBatch::new();
        batch.expect_latest(ObjectId(1), CommitId(4));
        assert!(batch.is_empty());
        assert_eq!(batch.expected(), &[(ObjectId(1), CommitId(4))]);
    }
}
