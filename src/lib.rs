// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! RewindDB: temporal retention and recovery for a multi-tenant analytical store
//!
//! This crate keeps every committed state of tables, schemas and databases
//! recoverable for a configurable window. It provides point-in-time reads,
//! zero-copy clones, undrop of dropped objects, row-level change feeds and
//! background reclamation of history that has left the window.

pub mod catalog;
pub mod changes;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod ledger;
pub mod resolve;
pub mod retention;
pub mod snapshot;
pub mod time;
pub mod watermark;

pub use catalog::{Catalog, ObjectId, ObjectKind, ObjectMeta, ObjectSettings, TableClass};
pub use changes::{ChangeAction, ChangeMode, ChangeRecord, Stream};
pub use config::{AccountSettings, EngineConfig, Setting};
pub use engine::{CloneOptions, HistoricalRead, Inserted, RetentionEngine, TableDef};
pub use error::{Error, Result};
pub use history::HistoryRecord;
pub use ledger::{CommitId, Generation, GenerationState, Ledger, OpKind, SnapshotRef, StatementId};
pub use resolve::{Anchor, PointInTime, TimeRef};
pub use snapshot::{MemorySnapshotStore, Row, RowId, RowSet, SnapshotStore, Value};
pub use time::{Clock, HlcClock, ManualClock, Timestamp};
pub use watermark::{ReclaimStats, WatermarkGate};
