// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Object catalog: kinds, classes, explicit settings and current column schema.

mod object;
mod registry;

pub use object::{
    CloneOrigin, CommitMark, ObjectId, ObjectKind, ObjectMeta, ObjectSettings, TableClass,
};
pub use registry::Catalog;
