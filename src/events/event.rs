//! # State-change events emitted toward spectators.
//!
//! The [`EventKind`] enum classifies the event types the subsystem emits to
//! the external notifier: turn lifecycle (`TurnStarted`, `TurnEnded`), queue
//! movement (`QueueUpdated`), the ready-check handshake (`ReadyCheck`), and
//! schedule edges (`MemberOnline`, `MemberOffline`).
//!
//! The [`Event`] struct is flat: every event carries the member id, a
//! wall-clock timestamp, and a global sequence number; kind-specific payload
//! fields are optional and set via the `with_*` builders.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use podium::events::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::QueueUpdated, "mayor").with_queue_length(3);
//! assert_eq!(ev.kind, EventKind::QueueUpdated);
//! assert_eq!(ev.queue_length, Some(3));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::turns::Turn;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of spectator-facing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A turn was created (promotion or fast path).
    ///
    /// Sets:
    /// - `turn`: the started turn
    /// - `queue_length`: pending entries after promotion
    TurnStarted,

    /// A turn reached a terminal status.
    ///
    /// Sets:
    /// - `ended_turn_id`: the terminated turn
    /// - `turn`: the chained-promotion successor, if one started
    /// - `queue_length`: pending entries after the chain
    TurnEnded,

    /// The pending queue changed without a turn transition.
    ///
    /// Sets:
    /// - `queue_length`: pending entries
    QueueUpdated,

    /// A long-waiting citizen must confirm they are still present.
    ///
    /// Sets:
    /// - `citizen`: who must confirm
    /// - `expires_at`: confirmation deadline
    ReadyCheck,

    /// The member's availability window opened.
    MemberOnline,

    /// The member's availability window closed.
    MemberOffline,
}

/// Spectator-facing event with optional kind-specific payload.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs and clients)
/// - `member`: the member every event is scoped to
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: DateTime<Utc>,
    /// Member the event is scoped to.
    pub member: Arc<str>,
    /// Event classification.
    pub kind: EventKind,

    /// Pending queue length, where applicable.
    pub queue_length: Option<usize>,
    /// Started turn (`TurnStarted`) or chained successor (`TurnEnded`).
    pub turn: Option<Turn>,
    /// Id of the turn that ended (`TurnEnded`).
    pub ended_turn_id: Option<uuid::Uuid>,
    /// Citizen a ready-check is addressed to (`ReadyCheck`).
    pub citizen: Option<Arc<str>>,
    /// Ready-check confirmation deadline (`ReadyCheck`).
    pub expires_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind, member: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: Utc::now(),
            member: member.into(),
            kind,
            queue_length: None,
            turn: None,
            ended_turn_id: None,
            citizen: None,
            expires_at: None,
        }
    }

    /// Same, with an explicit timestamp, so one arbiter operation stamps one
    /// instant across everything it emits.
    pub fn at(kind: EventKind, member: impl Into<Arc<str>>, at: DateTime<Utc>) -> Self {
        let mut ev = Self::new(kind, member);
        ev.at = at;
        ev
    }

    /// Attaches a pending queue length.
    #[inline]
    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.queue_length = Some(len);
        self
    }

    /// Attaches a turn payload.
    #[inline]
    pub fn with_turn(mut self, turn: Turn) -> Self {
        self.turn = Some(turn);
        self
    }

    /// Attaches the id of an ended turn.
    #[inline]
    pub fn with_ended_turn(mut self, id: uuid::Uuid) -> Self {
        self.ended_turn_id = Some(id);
        self
    }

    /// Attaches the citizen a ready-check is addressed to.
    #[inline]
    pub fn with_citizen(mut self, citizen: impl Into<Arc<str>>) -> Self {
        self.citizen = Some(citizen.into());
        self
    }

    /// Attaches a ready-check deadline.
    #[inline]
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::QueueUpdated, "m");
        let b = Event::new(EventKind::QueueUpdated, "m");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_payload() {
        let deadline = Utc::now();
        let ev = Event::new(EventKind::ReadyCheck, "mayor")
            .with_citizen("cit-1")
            .with_expires_at(deadline);
        assert_eq!(ev.citizen.as_deref(), Some("cit-1"));
        assert_eq!(ev.expires_at, Some(deadline));
    }
}
