//! Error types used by the arbiter and the conversation handler.
//!
//! This module defines three enums:
//!
//! - [`ArbiterError`] — typed rejections of queue/turn actions. These are
//!   expected, recoverable, and reported to the caller; they are never
//!   retried automatically by the crate.
//! - [`Fault`] — invariant violations that indicate a locking bug. These are
//!   logged loudly and must not be translated into user-facing rejections.
//! - [`HandlerError`] — rejections raised by the conversation handler before
//!   or around arbitration (sanitization, moderation, throttle, bans).
//!
//! All types provide `as_label()` for logging/metrics, and [`ArbiterError`]
//! classifies itself via [`is_precondition`](ArbiterError::is_precondition)
//! and [`is_budget`](ArbiterError::is_budget): budget rejections are terminal
//! for the current turn — the caller must end it, not retry the message.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// # Typed rejections of queue and turn actions.
///
/// Precondition variants mean "your action had no effect because X"; budget
/// variants mean "the current turn is spent". Neither indicates an unexpected
/// system state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbiterError {
    /// No member with this id exists in the directory.
    #[error("unknown member: {member}")]
    UnknownMember {
        /// The id that failed to resolve.
        member: String,
    },

    /// The citizen already has a non-terminal queue entry for this member.
    #[error("already queued for this member")]
    AlreadyQueued,

    /// The member's schedule has them outside office hours.
    #[error("member is offline")]
    MemberOffline,

    /// No promotable entry exists in the queue.
    #[error("queue is empty")]
    QueueEmpty,

    /// The citizen has no pending queue entry for this member.
    #[error("not in queue")]
    NotQueued,

    /// The ready-check window lapsed before the citizen confirmed.
    #[error("ready-check expired")]
    ReadyCheckExpired,

    /// The turn exists but belongs to another citizen.
    #[error("not your turn")]
    NotYourTurn,

    /// The referenced turn is not the member's active turn.
    #[error("turn is not active")]
    TurnNotActive,

    /// Accepting the message would exceed the turn's character budget.
    /// The turn stays open but accepts no further messages.
    #[error("character budget exceeded; {remaining} characters remain")]
    BudgetExceeded {
        /// Characters still available under the budget.
        remaining: u32,
    },

    /// The turn's elapsed-time budget ran out; the turn has been ended as
    /// timed out.
    #[error("turn time budget elapsed")]
    TimeExceeded,

    /// The turn already used its full message allowance.
    #[error("message limit reached")]
    MessageLimitReached,
}

impl ArbiterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use podium::ArbiterError;
    ///
    /// assert_eq!(ArbiterError::AlreadyQueued.as_label(), "already_queued");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ArbiterError::UnknownMember { .. } => "unknown_member",
            ArbiterError::AlreadyQueued => "already_queued",
            ArbiterError::MemberOffline => "member_offline",
            ArbiterError::QueueEmpty => "queue_empty",
            ArbiterError::NotQueued => "not_queued",
            ArbiterError::ReadyCheckExpired => "ready_check_expired",
            ArbiterError::NotYourTurn => "not_your_turn",
            ArbiterError::TurnNotActive => "turn_not_active",
            ArbiterError::BudgetExceeded { .. } => "budget_exceeded",
            ArbiterError::TimeExceeded => "time_exceeded",
            ArbiterError::MessageLimitReached => "message_limit_reached",
        }
    }

    /// True for expected precondition rejections (not budget exhaustion).
    pub fn is_precondition(&self) -> bool {
        !self.is_budget()
    }

    /// True for budget rejections, which are terminal for the current turn.
    ///
    /// # Example
    /// ```
    /// use podium::ArbiterError;
    ///
    /// assert!(ArbiterError::TimeExceeded.is_budget());
    /// assert!(!ArbiterError::NotYourTurn.is_budget());
    /// ```
    pub fn is_budget(&self) -> bool {
        matches!(
            self,
            ArbiterError::BudgetExceeded { .. }
                | ArbiterError::TimeExceeded
                | ArbiterError::MessageLimitReached
        )
    }
}

/// # Invariant violations.
///
/// These indicate a bug in the locking discipline, not a user error. The
/// arbiter logs them at error level; callers should treat them as a
/// 5xx-equivalent rather than a rejection.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A promotion was attempted while another turn was still active.
    /// Unreachable under correct per-member serialization.
    #[error("turn already active for member {member}")]
    TurnAlreadyActive {
        /// Member whose invariant was violated.
        member: String,
    },
}

impl Fault {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Fault::TurnAlreadyActive { .. } => "turn_already_active",
        }
    }
}

/// # Rejections raised by the conversation handler.
///
/// Produced before or around arbitration: text vetting, throttling, and ban
/// enforcement. Arbiter rejections pass through via [`HandlerError::Arbiter`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The message was rejected by sanitization or moderation.
    #[error("message rejected ({category}): {reason}")]
    MessageRejected {
        /// Classifier category (e.g. `length`, `harassment`, `spam`).
        category: String,
        /// Human-readable reason handed back to the presentation layer.
        reason: String,
        /// True when the rejection also force-ended an active turn.
        turn_ended: bool,
    },

    /// The citizen is sending faster than the per-citizen cooldown allows.
    #[error("throttled; retry in {wait:?}")]
    Throttled {
        /// Time remaining until the next message is accepted.
        wait: Duration,
    },

    /// The citizen is banned from conversing.
    #[error("banned")]
    Banned {
        /// When the ban lifts, if the sink reported one.
        until: Option<DateTime<Utc>>,
    },

    /// The underlying queue/turn action was rejected.
    #[error(transparent)]
    Arbiter(#[from] ArbiterError),
}

impl HandlerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::MessageRejected { .. } => "message_rejected",
            HandlerError::Throttled { .. } => "throttled",
            HandlerError::Banned { .. } => "banned",
            HandlerError::Arbiter(e) => e.as_label(),
        }
    }
}
