//! # Per-member waiting-list store.
//!
//! [`QueueStore`] owns the ordered collection of [`QueueEntry`] records for
//! one member. It lives inside the member's serialized state, so none of its
//! methods take a lock — the arbiter already holds the member's mutex when it
//! calls in.
//!
//! ## Rules
//! - Ordering is strict FIFO by `joined_at`, ties broken by insertion order;
//!   no priority tiers.
//! - Position is the 0-indexed rank among pending entries; `queue_length`
//!   counts pending entries.
//! - Terminal entries are retained for audit, excluded from ordering, and
//!   pruned after a retention window.

use chrono::{DateTime, Utc};

use crate::error::ArbiterError;

use super::entry::{EntryStatus, QueueEntry};

/// Ordered waiting list for one member.
#[derive(Debug, Default)]
pub struct QueueStore {
    entries: Vec<QueueEntry>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new entry for the citizen.
    ///
    /// Fails with [`ArbiterError::AlreadyQueued`] if the citizen already has
    /// a pending or active entry. Returns the new entry's position and the
    /// pending queue length.
    pub fn join(
        &mut self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(QueueEntry, usize, usize), ArbiterError> {
        if self
            .entries
            .iter()
            .any(|e| e.citizen_id == citizen_id && !e.status.is_terminal())
        {
            return Err(ArbiterError::AlreadyQueued);
        }

        let entry = QueueEntry::new(member_id, citizen_id, citizen_name, citizen_avatar, now);
        self.entries.push(entry.clone());
        let position = self.position_of(citizen_id).unwrap_or(0);
        Ok((entry, position, self.pending_len()))
    }

    /// Upsert-style join used by the fast-path fallback: a citizen who is
    /// already pending gets their current position back instead of an error.
    pub fn join_or_position(
        &mut self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        now: DateTime<Utc>,
    ) -> (usize, usize) {
        if let Some(entry) = self.find_pending_mut(citizen_id) {
            entry.last_heartbeat_at = Some(now);
        } else {
            let entry = QueueEntry::new(member_id, citizen_id, citizen_name, citizen_avatar, now);
            self.entries.push(entry);
        }
        let position = self.position_of(citizen_id).unwrap_or(0);
        (position, self.pending_len())
    }

    /// Marks the citizen's pending entries `Skipped`. Idempotent; returns the
    /// pending queue length afterwards.
    pub fn leave(&mut self, citizen_id: &str, now: DateTime<Utc>) -> usize {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.citizen_id == citizen_id && e.is_pending())
        {
            entry.skip(now);
        }
        self.pending_len()
    }

    /// Refreshes the citizen's liveness stamp; returns their position, or
    /// `None` if they have no pending entry. Does not change ordering.
    pub fn heartbeat(&mut self, citizen_id: &str, now: DateTime<Utc>) -> Option<usize> {
        self.find_pending_mut(citizen_id)?.last_heartbeat_at = Some(now);
        self.position_of(citizen_id)
    }

    /// The earliest pending entry, by `joined_at` then insertion order.
    pub fn head_mut(&mut self) -> Option<&mut QueueEntry> {
        let idx = self.head_index()?;
        self.entries.get_mut(idx)
    }

    pub fn head(&self) -> Option<&QueueEntry> {
        let idx = self.head_index()?;
        self.entries.get(idx)
    }

    fn head_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_pending())
            .min_by_key(|(idx, e)| (e.joined_at, *idx))
            .map(|(idx, _)| idx)
    }

    /// 0-indexed rank among pending entries, or `None` if not pending.
    pub fn position_of(&self, citizen_id: &str) -> Option<usize> {
        let mut pending: Vec<(usize, &QueueEntry)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_pending())
            .collect();
        pending.sort_by_key(|(idx, e)| (e.joined_at, *idx));
        pending.iter().position(|(_, e)| e.citizen_id == citizen_id)
    }

    /// Count of pending entries.
    pub fn pending_len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    pub fn find_pending(&self, citizen_id: &str) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|e| e.citizen_id == citizen_id && e.is_pending())
    }

    pub fn find_pending_mut(&mut self, citizen_id: &str) -> Option<&mut QueueEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.citizen_id == citizen_id && e.is_pending())
    }

    /// The citizen's `Active` entry, if their turn is in progress.
    pub fn find_active_mut(&mut self, citizen_id: &str) -> Option<&mut QueueEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.citizen_id == citizen_id && e.status == EntryStatus::Active)
    }

    /// Marks stale pending entries `Skipped`; returns how many were evicted.
    pub fn evict_stale(
        &mut self,
        now: DateTime<Utc>,
        stale_after: std::time::Duration,
        grace: std::time::Duration,
    ) -> usize {
        let mut evicted = 0;
        for entry in self.entries.iter_mut().filter(|e| e.is_pending()) {
            if entry.is_stale(now, stale_after, grace) {
                entry.skip(now);
                evicted += 1;
            }
        }
        evicted
    }

    /// Marks every pending entry `Skipped` (the office closed); returns how
    /// many were skipped.
    pub fn skip_all_pending(&mut self, now: DateTime<Utc>) -> usize {
        let mut skipped = 0;
        for entry in self.entries.iter_mut().filter(|e| e.is_pending()) {
            entry.skip(now);
            skipped += 1;
        }
        skipped
    }

    /// Drops terminal entries older than `retention`; returns how many were
    /// pruned.
    pub fn prune_terminal(&mut self, now: DateTime<Utc>, retention: std::time::Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|e| {
            !e.status.is_terminal() || e.resolved_at.map_or(true, |at| now - at < retention)
        });
        before - self.entries.len()
    }

    /// All entries, audit tail included.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap()
    }

    fn sec(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    #[test]
    fn test_join_orders_fifo() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        q.join("m", "b", "B", None, t0() + sec(1)).unwrap();
        let (_, pos, len) = q.join("m", "c", "C", None, t0() + sec(2)).unwrap();
        assert_eq!(pos, 2);
        assert_eq!(len, 3);
        assert_eq!(q.head().unwrap().citizen_id, "a");
    }

    #[test]
    fn test_join_rejects_duplicate() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        assert_eq!(
            q.join("m", "a", "A", None, t0() + sec(1)).unwrap_err(),
            ArbiterError::AlreadyQueued
        );
    }

    #[test]
    fn test_rejoin_allowed_after_terminal() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        q.leave("a", t0() + sec(1));
        assert!(q.join("m", "a", "A", None, t0() + sec(2)).is_ok());
    }

    #[test]
    fn test_leave_is_idempotent() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        assert_eq!(q.leave("a", t0() + sec(1)), 0);
        assert_eq!(q.leave("a", t0() + sec(2)), 0);
        assert_eq!(q.leave("ghost", t0() + sec(3)), 0);
    }

    #[test]
    fn test_heartbeat_does_not_reorder() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        q.join("m", "b", "B", None, t0() + sec(1)).unwrap();
        assert_eq!(q.heartbeat("b", t0() + sec(5)), Some(1));
        assert_eq!(q.head().unwrap().citizen_id, "a");
        assert_eq!(q.heartbeat("ghost", t0() + sec(5)), None);
    }

    #[test]
    fn test_terminal_entries_excluded_from_ordering() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        q.join("m", "b", "B", None, t0() + sec(1)).unwrap();
        q.leave("a", t0() + sec(2));
        assert_eq!(q.head().unwrap().citizen_id, "b");
        assert_eq!(q.position_of("b"), Some(0));
        assert_eq!(q.pending_len(), 1);
    }

    #[test]
    fn test_evict_stale_skips_lapsed_entries() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        q.join("m", "b", "B", None, t0() + sec(1)).unwrap();
        q.heartbeat("b", t0() + sec(170));
        let evicted = q.evict_stale(
            t0() + sec(181),
            Duration::from_secs(180),
            Duration::from_secs(60),
        );
        // "a" never heartbeated and is past grace; "b" beat recently.
        assert_eq!(evicted, 1);
        assert_eq!(q.head().unwrap().citizen_id, "b");
    }

    #[test]
    fn test_prune_terminal_respects_retention() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        q.leave("a", t0() + sec(1));
        assert_eq!(q.prune_terminal(t0() + sec(2), Duration::from_secs(600)), 0);
        assert_eq!(q.prune_terminal(t0() + sec(700), Duration::from_secs(600)), 1);
        assert!(q.entries().is_empty());
    }

    #[test]
    fn test_upsert_returns_existing_position() {
        let mut q = QueueStore::new();
        q.join("m", "a", "A", None, t0()).unwrap();
        q.join("m", "b", "B", None, t0() + sec(1)).unwrap();
        let (pos, len) = q.join_or_position("m", "b", "B", None, t0() + sec(2));
        assert_eq!((pos, len), (1, 2));
        let (pos, len) = q.join_or_position("m", "c", "C", None, t0() + sec(3));
        assert_eq!((pos, len), (2, 3));
    }
}
