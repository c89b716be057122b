// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Read tickets and the safe watermark.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ledger::CommitId;

/// Per-tenant reclamation gate.
///
/// Outstanding reads register a ticket at the commit they depend on. The safe
/// watermark only moves forward and never past the oldest ticket, so nothing
/// at or above a held ticket's commit becomes eligible for reclamation.
///
/// A ticket acquired below the current watermark does not move it back, but
/// still caps what removal may reach through
/// [`WatermarkGate::with_reclaim_limit`]. Readers re-validate against the
/// ledger after acquiring.
#[derive(Debug, Default)]
pub struct WatermarkGate {
    /// Multiset of outstanding ticket commits.
    tickets: Mutex<BTreeMap<CommitId, usize>>,
    safe: AtomicU64,
}

impl WatermarkGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a read ticket at `commit`.
    pub fn acquire(self: &Arc<Self>, commit: CommitId) -> ReadTicket {
        *self.tickets.lock().entry(commit).or_insert(0) += 1;
        ReadTicket {
            gate: Arc::clone(self),
            commit,
        }
    }

    /// Current safe watermark. Entries with a commit id below it may be
    /// reclaimed.
    #[inline]
    pub fn safe_watermark(&self) -> CommitId {
        CommitId(self.safe.load(Ordering::Acquire))
    }

    /// Oldest commit pinned by an outstanding ticket.
    pub fn oldest_ticket(&self) -> Option<CommitId> {
        self.tickets.lock().keys().next().copied()
    }

    /// Number of outstanding tickets.
    pub fn outstanding(&self) -> usize {
        self.tickets.lock().values().sum()
    }

    /// Moves the watermark towards `candidate`, clamped to the oldest ticket.
    ///
    /// Returns the watermark after the update, which may be unchanged.
    pub fn advance(&self, candidate: CommitId) -> CommitId {
        // Held across the update so no ticket can slip in between the clamp
        // and the store.
        let tickets = self.tickets.lock();
        let target = match tickets.keys().next() {
            Some(oldest) => candidate.min(*oldest),
            None => candidate,
        };
        let prev = self.safe.fetch_max(target.0, Ordering::AcqRel);
        CommitId(prev.max(target.0))
    }

    /// Runs `f` with the highest commit removal may reach: the safe watermark
    /// clamped to the oldest outstanding ticket.
    ///
    /// No ticket can be acquired or released while `f` runs, so a reader
    /// that validates after acquiring either sees the removal or is covered
    /// by the limit.
    pub fn with_reclaim_limit<T>(&self, f: impl FnOnce(CommitId) -> T) -> T {
        let tickets = self.tickets.lock();
        let safe = self.safe_watermark();
        let limit = match tickets.keys().next() {
            Some(oldest) => safe.min(*oldest),
            None => safe,
        };
        f(limit)
    }

    fn release(&self, commit: CommitId) {
        let mut tickets = self.tickets.lock();
        if let Some(count) = tickets.get_mut(&commit) {
            *count -= 1;
            if *count == 0 {
                tickets.remove(&commit);
            }
        }
    }
}

/// RAII read ticket. Dropping it, including on cancellation, releases the
/// watermark hold.
#[derive(Debug)]
pub struct ReadTicket {
    gate: Arc<WatermarkGate>,
    commit: CommitId,
}

impl ReadTicket {
    #[inline]
    pub fn commit(&self) -> CommitId {
        self.commit
    }
}

impl Drop for ReadTicket {
    fn drop(&mut self) {
        self.gate.release(self.commit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_advance_without_tickets() {
        let gate = Arc::new(WatermarkGate::new());
        assert_eq!(gate.advance(CommitId(10)), CommitId(10));
        assert_eq!(gate.safe_watermark(), CommitId(10));
    }

    #[test]
    fn test_advance_is_monotonic() {
        let gate = Arc::new(WatermarkGate::new());
        gate.advance(CommitId(10));
        assert_eq!(gate.advance(CommitId(4)), CommitId(10));
        assert_eq!(gate.safe_watermark(), CommitId(10));
    }

    #[test]
    fn test_ticket_holds_watermark() {
        let gate = Arc::new(WatermarkGate::new());
        let ticket = gate.acquire(CommitId(3));

        assert_eq!(gate.advance(CommitId(10)), CommitId(3));
        assert_eq!(gate.outstanding(), 1);

        drop(ticket);
        assert_eq!(gate.outstanding(), 0);
        assert_eq!(gate.advance(CommitId(10)), CommitId(10));
    }

    #[test]
    fn test_late_ticket_clamps_reclaim_limit() {
        let gate = Arc::new(WatermarkGate::new());
        gate.advance(CommitId(10));
        assert_eq!(gate.with_reclaim_limit(|limit| limit), CommitId(10));

        // Acquired after the watermark moved past it.
        let ticket = gate.acquire(CommitId(4));
        assert_eq!(gate.safe_watermark(), CommitId(10));
        assert_eq!(gate.with_reclaim_limit(|limit| limit), CommitId(4));

        drop(ticket);
        assert_eq!(gate.with_reclaim_limit(|limit| limit), CommitId(10));
    }

    #[test]
    fn test_duplicate_tickets_counted() {
        let gate = Arc::new(WatermarkGate::new());
        let a = gate.acquire(CommitId(5));
        let b = gate.acquire(CommitId(5));
        let c = gate.acquire(CommitId(7));

        drop(a);
        assert_eq!(gate.oldest_ticket(), Some(CommitId(5)));
        drop(b);
        assert_eq!(gate.oldest_ticket(), Some(CommitId(7)));
        assert_eq!(c.commit(), CommitId(7));
    }

    #[test]
    fn test_concurrent_tickets() {
        let gate = Arc::new(WatermarkGate::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for j in 0..1000u64 {
                        let _ticket = gate.acquire(CommitId(i * 1000 + j + 1));
                        gate.advance(CommitId(i * 1000 + j));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(gate.outstanding(), 0);
        assert_eq!(gate.oldest_ticket(), None);
    }
}
