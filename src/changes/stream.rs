// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Change-tracking streams.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::catalog::ObjectId;
use crate::error::{Error, Result};
use crate::ledger::CommitId;
use crate::time::Timestamp;

/// A named change-tracking cursor over one object.
///
/// A stream has no ledger of its own: it is only an offset into the
/// object's ledger, moved forward by explicit consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub name: String,
    pub object: ObjectId,
    pub offset: CommitId,
    pub offset_time: Timestamp,
    pub created_at: Timestamp,
}

impl Stream {
    /// Returns true if the stream can no longer be read.
    ///
    /// A stream goes stale when its offset falls outside the object's
    /// staleness window, or when the ledger has been reclaimed past it.
    pub fn is_stale(&self, staleness_days: u32, reclaimed_below: CommitId, now: Timestamp) -> bool {
        self.offset_time < now.days_before(staleness_days) || self.offset < reclaimed_below
    }
}

/// Registry of streams keyed by name.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: RwLock<HashMap<String, Stream>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new stream. Names are unique per tenant.
    pub fn create(&self, stream: Stream) -> Result<()> {
        let mut streams = self.streams.write();
        if streams.contains_key(&stream.name) {
            return Err(Error::NameConflict { name: stream.name });
        }
        streams.insert(stream.name.clone(), stream);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Stream> {
        self.streams
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownStream(name.to_string()))
    }

    /// Moves a stream's offset forward. Offsets never move backwards;
    /// consuming at an unchanged offset still refreshes its time.
    pub fn advance(&self, name: &str, offset: CommitId, offset_time: Timestamp) -> Result<Stream> {
        let mut streams = self.streams.write();
        let stream = streams
            .get_mut(name)
            .ok_or_else(|| Error::UnknownStream(name.to_string()))?;
        if offset >= stream.offset {
            stream.offset = offset;
            stream.offset_time = stream.offset_time.max(offset_time);
        }
        Ok(stream.clone())
    }

    pub fn remove(&self, name: &str) -> Result<Stream> {
        self.streams
            .write()
            .remove(name)
            .ok_or_else(|| Error::UnknownStream(name.to_string()))
    }

    /// Returns every stream reading `object`.
    pub fn for_object(&self, object: ObjectId) -> Vec<Stream> {
        let mut out: Vec<_> = self
            .streams
            .read()
            .values()
            .filter(|s| s.object == object)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(name: &str, offset: u64, offset_secs: u64) -> Stream {
        Stream {
            name: name.to_string(),
            object: ObjectId(1),
            offset: CommitId(offset),
            offset_time: Timestamp::from_secs(offset_secs),
            created_at: Timestamp::from_secs(offset_secs),
        }
    }

    #[test]
    fn test_create_duplicate() {
        let registry = StreamRegistry::new();
        registry.create(stream("s", 1, 0)).unwrap();
        assert!(matches!(
            registry.create(stream("s", 2, 0)),
            Err(Error::NameConflict { .. })
        ));
    }

    #[test]
    fn test_advance_is_forward_only() {
        let registry = StreamRegistry::new();
        registry.create(stream("s", 5, 0)).unwrap();

        let s = registry.advance("s", CommitId(3), Timestamp::from_secs(9)).unwrap();
        assert_eq!(s.offset, CommitId(5));
        assert_eq!(s.offset_time, Timestamp::from_secs(0));

        let s = registry.advance("s", CommitId(5), Timestamp::from_secs(4)).unwrap();
        assert_eq!(s.offset_time, Timestamp::from_secs(4));

        let s = registry.advance("s", CommitId(8), Timestamp::from_secs(9)).unwrap();
        assert_eq!(s.offset, CommitId(8));
        assert_eq!(s.offset_time, Timestamp::from_secs(9));
    }

    #[test]
    fn test_unknown_stream() {
        let registry = StreamRegistry::new();
        assert!(matches!(registry.get("nope"), Err(Error::UnknownStream(_))));
    }

    #[test]
    fn test_staleness() {
        let day = 86_400;
        let s = stream("s", 5, 10 * day);
        let now = Timestamp::from_secs(20 * day);
        assert!(!s.is_stale(14, CommitId::ZERO, now));
        assert!(s.is_stale(7, CommitId::ZERO, now));
        assert!(s.is_stale(14, CommitId(6), now));
    }
}
