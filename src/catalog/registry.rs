// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! In-memory catalog of object metadata.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::object::{ObjectId, ObjectMeta};

/// Registry of object metadata keyed by object id.
///
/// Readers get cloned snapshots of metadata so no lock is held across a
/// resolution or a data read.
#[derive(Debug)]
pub struct Catalog {
    objects: RwLock<HashMap<ObjectId, ObjectMeta>>,
    next_id: AtomicU64,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates a fresh object id.
    pub fn allocate_id(&self) -> ObjectId {
        ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers metadata for a newly created object.
    pub fn insert(&self, meta: ObjectMeta) {
        self.objects.write().insert(meta.id, meta);
    }

    /// Returns a copy of an object's metadata.
    pub fn get(&self, id: ObjectId) -> Result<ObjectMeta> {
        self.objects
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound(id.to_string()))
    }

    /// Returns true if the catalog knows the object.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.read().contains_key(&id)
    }

    /// Applies `f` to an object's metadata in place.
    pub fn update<F>(&self, id: ObjectId, f: F) -> Result<()>
    where
        F: FnOnce(&mut ObjectMeta) -> Result<()>,
    {
        let mut objects = self.objects.write();
        let meta = objects
            .get_mut(&id)
            .ok_or_else(|| Error::ObjectNotFound(id.to_string()))?;
        f(meta)
    }

    /// Removes a purged object.
    pub fn remove(&self, id: ObjectId) -> Option<ObjectMeta> {
        self.objects.write().remove(&id)
    }

    /// Returns the ids of every object whose parent is `id`, in id order.
    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut children: Vec<_> = self
            .objects
            .read()
            .values()
            .filter(|m| m.parent == Some(id))
            .map(|m| m.id)
            .collect();
        children.sort();
        children
    }

    /// Returns every transitive descendant of `id`, parents before children.
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut frontier = self.children(id);
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for child in frontier {
                next.extend(self.children(child));
                out.push(child);
            }
            frontier = next;
        }
        out
    }

    /// Returns the object followed by its ancestors, nearest first.
    pub fn lineage(&self, id: ObjectId) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read();
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let meta = objects
                .get(&current)
                .ok_or_else(|| Error::ObjectNotFound(current.to_string()))?;
            cursor = meta.parent;
            chain.push(meta.clone());
        }
        Ok(chain)
    }

    /// Returns a copy of every object's metadata.
    pub fn all(&self) -> Vec<ObjectMeta> {
        let mut all: Vec<_> = self.objects.read().values().cloned().collect();
        all.sort_by_key(|m| m.id);
        all
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
