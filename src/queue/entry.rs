//! # Queue entries.
//!
//! A [`QueueEntry`] is a citizen's waiting-list record for one member. It is
//! created on join, mutated by heartbeats and the ready-check handshake, and
//! parked in a terminal state (`Completed`/`Skipped`) rather than deleted, so
//! the recent past stays auditable until the sweep prunes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a queue entry.
///
/// `Waiting → (ReadyCheck →) Confirmed → Active → Completed` is the happy
/// path; `Skipped` is the terminal state for every other exit (leave, stale
/// heartbeat, lapsed ready-check, office close).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Waiting,
    ReadyCheck,
    Confirmed,
    Active,
    Completed,
    Skipped,
}

impl EntryStatus {
    /// Pending entries participate in queue ordering and counting.
    #[inline]
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            EntryStatus::Waiting | EntryStatus::ReadyCheck | EntryStatus::Confirmed
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Skipped)
    }
}

/// A citizen's waiting-list record for one member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub member_id: String,
    pub citizen_id: String,
    pub citizen_name: String,
    pub citizen_avatar: Option<String>,
    pub joined_at: DateTime<Utc>,
    /// Refreshed by the heartbeat action; `None` until the first beat.
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub status: EntryStatus,
    /// Set when a ready-check is sent; the check expires a fixed timeout
    /// after this instant.
    pub ready_check_sent_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the entry reached a terminal state; drives audit pruning.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    pub fn new(
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id: member_id.to_string(),
            citizen_id: citizen_id.to_string(),
            citizen_name: citizen_name.to_string(),
            citizen_avatar: citizen_avatar.map(str::to_string),
            joined_at: now,
            last_heartbeat_at: None,
            status: EntryStatus::Waiting,
            ready_check_sent_at: None,
            confirmed_at: None,
            resolved_at: None,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// True when the liveness heartbeat has lapsed: the last beat is older
    /// than `stale_after`, or no beat ever arrived and the entry has been
    /// queued longer than `grace`.
    pub fn is_stale(
        &self,
        now: DateTime<Utc>,
        stale_after: std::time::Duration,
        grace: std::time::Duration,
    ) -> bool {
        match self.last_heartbeat_at {
            Some(beat) => age_exceeds(beat, now, stale_after),
            None => age_exceeds(self.joined_at, now, grace),
        }
    }

    /// True when a sent ready-check has outlived `timeout` unanswered.
    pub fn ready_check_lapsed(&self, now: DateTime<Utc>, timeout: std::time::Duration) -> bool {
        self.status == EntryStatus::ReadyCheck
            && self
                .ready_check_sent_at
                .is_some_and(|sent| age_exceeds(sent, now, timeout))
    }

    pub fn begin_ready_check(&mut self, now: DateTime<Utc>) {
        self.status = EntryStatus::ReadyCheck;
        self.ready_check_sent_at = Some(now);
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) {
        self.status = EntryStatus::Confirmed;
        self.confirmed_at = Some(now);
    }

    pub fn activate(&mut self) {
        self.status = EntryStatus::Active;
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = EntryStatus::Completed;
        self.resolved_at = Some(now);
    }

    pub fn skip(&mut self, now: DateTime<Utc>) {
        self.status = EntryStatus::Skipped;
        self.resolved_at = Some(now);
    }
}

#[inline]
fn age_exceeds(since: DateTime<Utc>, now: DateTime<Utc>, limit: std::time::Duration) -> bool {
    match chrono::Duration::from_std(limit) {
        Ok(limit) => now - since >= limit,
        Err(_) => false,
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

    #[test]
    fn test_stale_by_heartbeat_age() {
        let mut e = QueueEntry::new("m", "c", "C", None, t0());
        e.last_heartbeat_at = Some(t0());
        let stale = Duration::from_secs(180);
        let grace = Duration::from_secs(60);
        assert!(!e.is_stale(t0() + chrono::Duration::seconds(179), stale, grace));
        assert!(e.is_stale(t0() + chrono::Duration::seconds(180), stale, grace));
    }

    #[test]
    fn test_never_heartbeated_uses_grace() {
        let e = QueueEntry::new("m", "c", "C", None, t0());
        let stale = Duration::from_secs(180);
        let grace = Duration::from_secs(60);
        assert!(!e.is_stale(t0() + chrono::Duration::seconds(59), stale, grace));
        assert!(e.is_stale(t0() + chrono::Duration::seconds(60), stale, grace));
    }

    #[test]
    fn test_ready_check_lapse() {
        let mut e = QueueEntry::new("m", "c", "C", None, t0());
        e.begin_ready_check(t0());
        let timeout = Duration::from_secs(30);
        assert!(!e.ready_check_lapsed(t0() + chrono::Duration::seconds(29), timeout));
        assert!(e.ready_check_lapsed(t0() + chrono::Duration::seconds(30), timeout));
    }
}
