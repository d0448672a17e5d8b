//! # Violation sink contract.
//!
//! Violation records are owned by the external moderation collaborator; the
//! core touches them in two places only — it appends a record when an unsafe
//! verdict force-ends a turn, and it asks for the citizen's ban status before
//! admitting a message. A sink failure never blocks the product: the handler
//! logs it and proceeds.
//!
//! [`MemoryViolationLog`] is a reference implementation (demo/tests): an
//! append-only in-memory log with rolling-window ban escalation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One recorded conduct violation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub citizen_id: String,
    pub occurred_at: DateTime<Utc>,
    /// Classifier category that triggered the record.
    pub violation_type: String,
    /// Bounded excerpt of the offending message.
    pub excerpt: String,
    pub turn_id: Uuid,
}

/// Characters of the offending message retained on a record.
const EXCERPT_MAX_CHARS: usize = 256;

impl ViolationRecord {
    pub fn new(
        citizen_id: &str,
        violation_type: &str,
        message: &str,
        turn_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            citizen_id: citizen_id.to_string(),
            occurred_at: now,
            violation_type: violation_type.to_string(),
            excerpt: message.chars().take(EXCERPT_MAX_CHARS).collect(),
            turn_id,
        }
    }
}

/// Ban state reported back by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BanStatus {
    pub banned: bool,
    /// When the ban lifts, if the sink tracks one.
    pub until: Option<DateTime<Utc>>,
}

/// Contract for the violation sink.
#[async_trait]
pub trait ViolationSink: Send + Sync + 'static {
    /// Appends a record and returns the citizen's resulting ban status.
    async fn record(&self, record: ViolationRecord) -> anyhow::Result<BanStatus>;

    /// Current ban status for the citizen.
    async fn ban_status(&self, citizen_id: &str, now: DateTime<Utc>) -> anyhow::Result<BanStatus>;
}

/// Reference in-memory sink: bans a citizen for `ban_duration` once
/// `ban_threshold` violations land inside the rolling `window`.
pub struct MemoryViolationLog {
    records: Mutex<HashMap<String, Vec<ViolationRecord>>>,
    pub window: Duration,
    pub ban_threshold: usize,
    pub ban_duration: Duration,
}

impl Default for MemoryViolationLog {
    /// 3 violations inside a rolling 24h window ban for 24h.
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            window: Duration::from_secs(24 * 3600),
            ban_threshold: 3,
            ban_duration: Duration::from_secs(24 * 3600),
        }
    }
}

impl MemoryViolationLog {
    pub fn new(window: Duration, ban_threshold: usize, ban_duration: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            window,
            ban_threshold: ban_threshold.max(1),
            ban_duration,
        }
    }

    fn status_of(&self, records: &[ViolationRecord], now: DateTime<Utc>) -> BanStatus {
        let window = chrono::Duration::from_std(self.window)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let recent: Vec<&ViolationRecord> = records
            .iter()
            .filter(|r| now - r.occurred_at < window)
            .collect();
        if recent.len() < self.ban_threshold {
            return BanStatus::default();
        }
        // The ban runs from the most recent violation.
        let last = recent.last().map(|r| r.occurred_at).unwrap_or(now);
        let until = last
            + chrono::Duration::from_std(self.ban_duration)
                .unwrap_or_else(|_| chrono::Duration::hours(24));
        BanStatus {
            banned: now < until,
            until: Some(until),
        }
    }
}

#[async_trait]
impl ViolationSink for MemoryViolationLog {
    async fn record(&self, record: ViolationRecord) -> anyhow::Result<BanStatus> {
        let now = record.occurred_at;
        let citizen = record.citizen_id.clone();
        let mut records = self.records.lock().await;
        let list = records.entry(citizen).or_default();
        list.push(record);
        Ok(self.status_of(list, now))
    }

    async fn ban_status(&self, citizen_id: &str, now: DateTime<Utc>) -> anyhow::Result<BanStatus> {
        let records = self.records.lock().await;
        Ok(records
            .get(citizen_id)
            .map(|list| self.status_of(list, now))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap()
    }

    fn violation(at: DateTime<Utc>) -> ViolationRecord {
        ViolationRecord::new("cit-1", "spam", "offending text", Uuid::new_v4(), at)
    }

    #[tokio::test]
    async fn test_ban_after_threshold_in_window() {
        let log = MemoryViolationLog::default();
        assert!(!log.record(violation(t0())).await.unwrap().banned);
        assert!(
            !log.record(violation(t0() + chrono::Duration::minutes(1)))
                .await
                .unwrap()
                .banned
        );
        let status = log
            .record(violation(t0() + chrono::Duration::minutes(2)))
            .await
            .unwrap();
        assert!(status.banned);
        assert!(status.until.unwrap() > t0() + chrono::Duration::hours(23));
    }

    #[tokio::test]
    async fn test_old_violations_age_out() {
        let log = MemoryViolationLog::default();
        log.record(violation(t0())).await.unwrap();
        log.record(violation(t0() + chrono::Duration::minutes(1)))
            .await
            .unwrap();
        // Third lands past the window; only two are recent.
        let status = log
            .record(violation(t0() + chrono::Duration::hours(25)))
            .await
            .unwrap();
        assert!(!status.banned);
    }

    #[tokio::test]
    async fn test_unknown_citizen_is_clean() {
        let log = MemoryViolationLog::default();
        let status = log.ban_status("nobody", t0()).await.unwrap();
        assert_eq!(status, BanStatus::default());
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        let record = ViolationRecord::new("c", "spam", &long, Uuid::new_v4(), t0());
        assert_eq!(record.excerpt.chars().count(), EXCERPT_MAX_CHARS);
    }
}
