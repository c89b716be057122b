// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Effective retention resolution.
//!
//! Retention is inherited along the parent chain: the nearest explicit
//! override wins, falling back to the account default. The result is capped
//! by the object's table class and the account floor is applied last:
//!
//! ```text
//! effective_retention(o) = max(min(explicit(o) ?? inherited(o), class_max(o)), account_min_floor)
//! ```
//!
//! Explicit overrides are validated against the class on write, so the cap
//! only ever lowers inherited values.

use crate::catalog::{Catalog, ObjectId, ObjectMeta, TableClass};
use crate::config::AccountSettings;
use crate::error::{Error, Result};
use crate::ledger::{Generation, GenerationState};

/// Effective retention of the first object in `lineage` (object first, then ancestors).
pub fn effective_retention(lineage: &[ObjectMeta], account: &AccountSettings) -> u32 {
    let class_max = lineage
        .first()
        .map_or(u32::MAX, |m| m.class.max_retention_days());
    lineage
        .iter()
        .find_map(|m| m.settings.retention_days)
        .unwrap_or(account.retention_days)
        .min(class_max)
        .max(account.min_retention_days)
}

/// Effective max extension of the first object in `lineage`.
pub fn effective_max_extension(lineage: &[ObjectMeta], account: &AccountSettings) -> u32 {
    lineage
        .iter()
        .find_map(|m| m.settings.max_extension_days)
        .unwrap_or(account.max_extension_days)
}

/// Rejects a `retention_days` override the object's class cannot hold.
pub fn validate_retention(class: TableClass, days: u32) -> Result<()> {
    let max = class.max_retention_days();
    if days > max {
        return Err(Error::InvalidSetting(format!(
            "retention_days {days} exceeds the {class:?} maximum of {max}"
        )));
    }
    Ok(())
}

/// Resolves retention for objects registered in a catalog.
#[derive(Debug, Clone, Copy)]
pub struct RetentionResolver<'a> {
    catalog: &'a Catalog,
    account: AccountSettings,
}

impl<'a> RetentionResolver<'a> {
    pub fn new(catalog: &'a Catalog, account: AccountSettings) -> Self {
        Self { catalog, account }
    }

    /// Current effective retention in days.
    pub fn effective_retention(&self, object: ObjectId) -> Result<u32> {
        let lineage = self.catalog.lineage(object)?;
        Ok(effective_retention(&lineage, &self.account))
    }

    /// Current effective max extension in days.
    pub fn effective_max_extension(&self, object: ObjectId) -> Result<u32> {
        let lineage = self.catalog.lineage(object)?;
        Ok(effective_max_extension(&lineage, &self.account))
    }

    /// Days a stream on `object` may lag before going stale.
    pub fn staleness_window(&self, object: ObjectId) -> Result<u32> {
        let lineage = self.catalog.lineage(object)?;
        Ok(effective_retention(&lineage, &self.account)
            .max(effective_max_extension(&lineage, &self.account)))
    }

    /// Retention governing the history of a generation.
    ///
    /// Dropped generations keep the retention frozen at drop time; later
    /// changes on the object or its ancestors do not reach them.
    pub fn for_generation(&self, generation: &Generation) -> Result<u32> {
        match generation.state {
            GenerationState::Dropped { retention_days, .. } => Ok(retention_days),
            GenerationState::Reclaimed { .. } => Ok(0),
            GenerationState::Active => self.effective_retention(generation.object),
        }
    }
}
