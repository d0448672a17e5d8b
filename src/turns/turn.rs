//! # Turn records.
//!
//! A [`Turn`] is an exclusive conversation slot granted to one citizen for
//! one member, bounded three ways by its [`TurnBudget`]: characters,
//! messages, and elapsed wall-clock time. At most one turn per member is
//! `Active` at any instant — the central invariant of the crate, enforced by
//! the arbiter under per-member serialization.
//!
//! ## Rules
//! - Turns are created only by the arbiter (promotion or the fast path).
//! - Elapsed time is tracked as a fixed `expires_at` deadline; expiry is
//!   evaluated lazily by whichever code path touches the turn next.
//! - Terminal transitions keep the [`EndReason`] for audit.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed allowances granted to a turn at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnBudget {
    /// Total characters the citizen may spend across their messages.
    pub char_budget: u32,
    /// Messages the citizen may send before the turn completes.
    pub message_limit: u32,
    /// Wall-clock allowance from `started_at`.
    pub time_budget: Duration,
}

impl TurnBudget {
    /// The general speak-flow preset: 256 characters, 1 message, 10 seconds.
    pub fn speak() -> Self {
        Self {
            char_budget: 256,
            message_limit: 1,
            time_budget: Duration::from_secs(10),
        }
    }

    /// The richer chat-flow preset: 500 characters, 2 messages, 20 seconds.
    pub fn chat() -> Self {
        Self {
            char_budget: 500,
            message_limit: 2,
            time_budget: Duration::from_secs(20),
        }
    }
}

impl Default for TurnBudget {
    fn default() -> Self {
        Self::speak()
    }
}

/// Lifecycle state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Turn in progress; its citizen may send messages.
    Active,
    /// Ended by use: budget spent, message limit hit, explicit end, or a
    /// moderation violation.
    Completed,
    /// Ended because the time budget ran out (or the office closed).
    Expired,
}

/// Why a turn reached its terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Normal completion.
    Completed,
    /// Time budget elapsed, or the member went offline mid-turn.
    TimedOut,
    /// Force-ended after a moderation violation.
    Violation,
}

impl EndReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::TimedOut => "timed_out",
            EndReason::Violation => "violation",
        }
    }

    /// The terminal [`TurnStatus`] this reason maps to.
    pub fn terminal_status(&self) -> TurnStatus {
        match self {
            EndReason::Completed | EndReason::Violation => TurnStatus::Completed,
            EndReason::TimedOut => TurnStatus::Expired,
        }
    }
}

/// An exclusive, budgeted conversation slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub member_id: String,
    pub citizen_id: String,
    /// Citizen display info carried on the turn so spectator broadcasts need
    /// no second lookup.
    pub citizen_name: String,
    pub citizen_avatar: Option<String>,
    pub chars_used: u32,
    pub messages_used: u32,
    pub budget: TurnBudget,
    pub started_at: DateTime<Utc>,
    /// `started_at + budget.time_budget`.
    pub expires_at: DateTime<Utc>,
    pub status: TurnStatus,
    pub end_reason: Option<EndReason>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Turn {
    /// Creates a fresh active turn starting at `now`.
    pub fn begin(
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        budget: TurnBudget,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id: member_id.to_string(),
            citizen_id: citizen_id.to_string(),
            citizen_name: citizen_name.to_string(),
            citizen_avatar: citizen_avatar.map(str::to_string),
            chars_used: 0,
            messages_used: 0,
            budget,
            started_at: now,
            expires_at: now
                + chrono::Duration::from_std(budget.time_budget)
                    .unwrap_or_else(|_| chrono::Duration::seconds(0)),
            status: TurnStatus::Active,
            end_reason: None,
            ended_at: None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == TurnStatus::Active
    }

    /// True once the wall-clock allowance has run out.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Characters still available under the budget.
    #[inline]
    pub fn remaining_chars(&self) -> u32 {
        self.budget.char_budget.saturating_sub(self.chars_used)
    }

    /// True once the citizen has used their full message allowance.
    #[inline]
    pub fn message_limit_reached(&self) -> bool {
        self.messages_used >= self.budget.message_limit
    }

    /// Charges one accepted message of `chars` characters against the budget.
    ///
    /// The caller (the arbiter, under the member lock) has already verified
    /// the charge fits; this only applies it.
    pub fn record_message(&mut self, chars: u32) {
        self.chars_used += chars;
        self.messages_used += 1;
    }

    /// Transitions the turn to its terminal status for `reason`.
    pub fn finish(&mut self, reason: EndReason, now: DateTime<Utc>) {
        self.status = reason.terminal_status();
        self.end_reason = Some(reason);
        self.ended_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap()
    }

    fn turn() -> Turn {
        Turn::begin("mayor", "cit-1", "Ada", None, TurnBudget::speak(), t0())
    }

    #[test]
    fn test_expiry_deadline() {
        let turn = turn();
        assert_eq!(turn.expires_at, t0() + chrono::Duration::seconds(10));
        assert!(!turn.is_expired(t0() + chrono::Duration::seconds(9)));
        assert!(turn.is_expired(t0() + chrono::Duration::seconds(10)));
    }

    #[test]
    fn test_budget_charging() {
        let mut turn = turn();
        turn.record_message(100);
        assert_eq!(turn.chars_used, 100);
        assert_eq!(turn.remaining_chars(), 156);
        assert!(turn.message_limit_reached());
    }

    #[test]
    fn test_end_reason_status_mapping() {
        assert_eq!(EndReason::Completed.terminal_status(), TurnStatus::Completed);
        assert_eq!(EndReason::TimedOut.terminal_status(), TurnStatus::Expired);
        assert_eq!(EndReason::Violation.terminal_status(), TurnStatus::Completed);
    }

    #[test]
    fn test_finish_is_terminal() {
        let mut turn = turn();
        turn.finish(EndReason::TimedOut, t0() + chrono::Duration::seconds(11));
        assert_eq!(turn.status, TurnStatus::Expired);
        assert_eq!(turn.end_reason, Some(EndReason::TimedOut));
        assert!(!turn.is_active());
    }
}
