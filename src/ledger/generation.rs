// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Generation lifecycle.

use serde::{Deserialize, Serialize};

use crate::catalog::{ObjectId, ObjectKind};
use crate::time::Timestamp;

use super::CommitId;

/// Lifecycle state of a generation.
///
/// ```text
///   Active --drop--> Dropped --undrop--> Active
///                       |
///                       +--watermark--> Reclaimed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationState {
    Active,
    Dropped {
        drop_commit: CommitId,
        drop_time: Timestamp,
        /// Retention frozen at drop time. A container drop stamps the
        /// container's retention on every descendant it closes.
        retention_days: u32,
    },
    Reclaimed {
        drop_commit: CommitId,
    },
}

/// One lifespan of an object under a name.
///
/// A rename keeps the generation open and carries its whole history to the
/// new name; `renamed` marks the commit where the current name begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub object: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
    pub parent: Option<ObjectId>,
    pub created: CommitId,
    pub created_time: Timestamp,
    pub renamed: Option<CommitId>,
    pub state: GenerationState,
}

impl Generation {
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.state, GenerationState::Active)
    }

    #[inline]
    pub fn is_dropped(&self) -> bool {
        matches!(self.state, GenerationState::Dropped { .. })
    }

    #[inline]
    pub fn is_reclaimed(&self) -> bool {
        matches!(self.state, GenerationState::Reclaimed { .. })
    }

    /// Commit that closed the generation, if it is closed.
    pub fn drop_commit(&self) -> Option<CommitId> {
        match self.state {
            GenerationState::Active => None,
            GenerationState::Dropped { drop_commit, .. }
            | GenerationState::Reclaimed { drop_commit } => Some(drop_commit),
        }
    }

    /// Retention frozen at drop time, if dropped and not yet reclaimed.
    pub fn retention_at_drop(&self) -> Option<u32> {
        match self.state {
            GenerationState::Dropped { retention_days, .. } => Some(retention_days),
            _ => None,
        }
    }

    /// Instant after which the dropped generation can no longer be undropped.
    pub fn expires_at(&self) -> Option<Timestamp> {
        match self.state {
            GenerationState::Dropped {
                drop_time,
                retention_days,
                ..
            } => Some(drop_time.days_after(retention_days)),
            _ => None,
        }
    }

    /// Returns true if the generation is dropped and still inside its frozen
    /// retention window at `now`. A zero-day window is never recoverable.
    pub fn is_recoverable(&self, now: Timestamp) -> bool {
        self.expires_at().is_some_and(|expiry| expiry > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation(state: GenerationState) -> Generation {
        Generation {
            object: ObjectId(1),
            kind: ObjectKind::Table,
            name: "orders".to_string(),
            parent: None,
            created: CommitId(1),
            created_time: Timestamp::from_secs(0),
            renamed: None,
            state,
        }
    }

    #[test]
    fn test_active_has_no_drop_commit() {
        let g = generation(GenerationState::Active);
        assert!(g.is_active());
        assert_eq!(g.drop_commit(), None);
        assert!(!g.is_recoverable(Timestamp::from_secs(1)));
    }

    #[test]
    fn test_dropped_recoverable_inside_window() {
        let g = generation(GenerationState::Dropped {
            drop_commit: CommitId(5),
            drop_time: Timestamp::from_secs(1_000),
            retention_days: 1,
        });
        assert_eq!(g.drop_commit(), Some(CommitId(5)));
        assert!(g.is_recoverable(Timestamp::from_secs(1_000)));
        assert!(g.is_recoverable(Timestamp::from_secs(1_000 + 86_399)));
        assert!(!g.is_recoverable(Timestamp::from_secs(1_000 + 86_400)));
    }

    #[test]
    fn test_zero_retention_never_recoverable() {
        let g = generation(GenerationState::Dropped {
            drop_commit: CommitId(5),
            drop_time: Timestamp::from_secs(1_000),
            retention_days: 0,
        });
        assert!(!g.is_recoverable(Timestamp::from_secs(1_000)));
    }

    #[test]
    fn test_reclaimed_keeps_drop_commit() {
        let g = generation(GenerationState::Reclaimed {
            drop_commit: CommitId(9),
        });
        assert!(g.is_reclaimed());
        assert_eq!(g.drop_commit(), Some(CommitId(9)));
        assert_eq!(g.retention_at_drop(), None);
    }
}
