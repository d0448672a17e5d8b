//! # Turn arbiter: the core state machine.
//!
//! Orchestrates queue→turn promotion, enforces "at most one active turn per
//! member," and ends turns on budget exhaustion, timeout, violation, or
//! explicit completion. The ready-check handshake and the fast-path speak
//! admission are entry points into the *same* per-member critical section,
//! so the two paths cannot drift out of sync.
//!
//! ## State machine (per member)
//! ```text
//! Idle (no active turn)
//!   │  promote: head confirmed / auto-confirmable ──► Active (one turn)
//!   │  promote: head waited > 2min ──► ready-check sent, promotion deferred
//!   │  speak:   queue empty ──► Active (fast path, no ready-check)
//!   ▼
//! Active
//!   │  message limit reached ─┐
//!   │  char/time budget out   ├──► turn terminal ──► chained promote ──► Idle/Active
//!   │  explicit end/violation ┘
//! ```
//!
//! ## Rules
//! - Every read-or-write of a member's queue/turn/ready-check state happens
//!   under that member's mutex; members never block each other.
//! - No external collaborator is called while the mutex is held.
//! - Expiries are lazy: wall-clock deltas are re-checked on the next touch
//!   (client action or sweep), never via per-entry timers.
//! - `TurnAlreadyActive` is a locking bug, not a user error: it is logged at
//!   error level and promotion is refused.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ArbiterError, Fault};
use crate::events::{Bus, Event, EventKind};
use crate::members::{Directory, Member};
use crate::queue::EntryStatus;
use crate::transcript::ChatMessage;
use crate::turns::{EndReason, Turn};

use super::registry::{MemberState, Registry};

/// Receipt handed back from a successful queue join.
#[derive(Debug, Clone)]
pub struct JoinReceipt {
    pub entry_id: Uuid,
    /// 0-indexed rank among pending entries.
    pub position: usize,
    pub queue_length: usize,
}

/// Snapshot returned by a heartbeat.
#[derive(Debug, Clone)]
pub struct HeartbeatTick {
    /// The caller's position, or `None` if they have no pending entry.
    pub position: Option<usize>,
    /// True when this tick transitioned the member onto a new turn (not
    /// necessarily the caller's).
    pub turn_started: bool,
    /// The member's current active turn, for UI state sync.
    pub current_turn: Option<Turn>,
    /// Deadline of a ready-check addressed to the caller, if one is pending.
    pub ready_check_expires_at: Option<DateTime<Utc>>,
    /// Interval the client should heartbeat at.
    pub next_heartbeat: Duration,
}

/// Outcome of the fast-path speak admission.
#[derive(Debug, Clone)]
pub enum SpeakAdmission {
    /// The caller won the empty queue and holds the turn; the message may be
    /// sent against it.
    TurnStarted(Turn),
    /// The queue was not empty (or a turn was active); the caller was
    /// enqueued and their message was NOT sent.
    Queued { position: usize, queue_length: usize },
}

/// Receipt for one accepted turn message.
#[derive(Debug, Clone)]
pub struct MessageReceipt {
    /// Turn snapshot after charging the message.
    pub turn: Turn,
    /// True when this message consumed the turn's last allowance and the
    /// turn completed (the next head was chain-promoted already).
    pub should_end: bool,
}

/// Coordinates all queue/turn state transitions under per-member locks.
pub struct Arbiter {
    directory: Arc<Directory>,
    registry: Registry,
    bus: Bus,
    cfg: Config,
}

impl Arbiter {
    pub fn new(directory: Arc<Directory>, cfg: Config) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity);
        let registry = Registry::new(&directory, &cfg);
        Arc::new(Self {
            directory,
            registry,
            bus,
            cfg,
        })
    }

    /// The event bus state changes are published on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    // ---- Inbound actions ----------------------------------------------

    /// Adds the citizen to the member's queue.
    pub async fn join_queue(
        &self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
    ) -> Result<JoinReceipt, ArbiterError> {
        self.join_queue_at(member_id, citizen_id, citizen_name, citizen_avatar, Utc::now())
            .await
    }

    /// [`join_queue`](Self::join_queue) with an explicit timestamp.
    pub async fn join_queue_at(
        &self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<JoinReceipt, ArbiterError> {
        let (member, state) = self.lookup(member_id)?;
        if !member.is_online(now) {
            return Err(ArbiterError::MemberOffline);
        }

        let mut state = state.lock().await;
        let (entry, position, queue_length) =
            state
                .queue
                .join(member_id, citizen_id, citizen_name, citizen_avatar, now)?;
        self.bus.publish(
            Event::at(EventKind::QueueUpdated, member_id, now).with_queue_length(queue_length),
        );
        Ok(JoinReceipt {
            entry_id: entry.id,
            position,
            queue_length,
        })
    }

    /// Removes the citizen's pending entries. Idempotent.
    pub async fn leave_queue(
        &self,
        member_id: &str,
        citizen_id: &str,
    ) -> Result<usize, ArbiterError> {
        self.leave_queue_at(member_id, citizen_id, Utc::now()).await
    }

    /// [`leave_queue`](Self::leave_queue) with an explicit timestamp.
    pub async fn leave_queue_at(
        &self,
        member_id: &str,
        citizen_id: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, ArbiterError> {
        let (_, state) = self.lookup(member_id)?;
        let mut state = state.lock().await;
        let queue_length = state.queue.leave(citizen_id, now);
        self.bus.publish(
            Event::at(EventKind::QueueUpdated, member_id, now).with_queue_length(queue_length),
        );
        Ok(queue_length)
    }

    /// Refreshes the citizen's liveness and drives queue progression.
    ///
    /// This is the workhorse tick: it expires an overdue turn, evicts stale
    /// waiters, attempts promotion, and reports the caller's view of the
    /// queue (position, pending ready-check deadline, current turn).
    pub async fn heartbeat(
        &self,
        member_id: &str,
        citizen_id: &str,
    ) -> Result<HeartbeatTick, ArbiterError> {
        self.heartbeat_at(member_id, citizen_id, Utc::now()).await
    }

    /// [`heartbeat`](Self::heartbeat) with an explicit timestamp.
    pub async fn heartbeat_at(
        &self,
        member_id: &str,
        citizen_id: &str,
        now: DateTime<Utc>,
    ) -> Result<HeartbeatTick, ArbiterError> {
        let (member, state) = self.lookup(member_id)?;
        let mut state = state.lock().await;

        // Zero-trust: the schedule is re-checked on every tick. An offline
        // member closes the office no matter what the client believed.
        if !member.is_online(now) {
            self.close_office(&mut state, &member, now);
            return Err(ArbiterError::MemberOffline);
        }
        self.note_online(&mut state, &member, now);

        let turn_before = state.turn.as_ref().map(|t| t.id);
        self.expire_overdue_turn(&mut state, &member, now);
        state.queue.heartbeat(citizen_id, now);
        self.evict_stale(&mut state, &member, now);
        if state.turn.is_none() {
            self.promote(&mut state, &member, now);
        }
        let turn_started = state
            .turn
            .as_ref()
            .is_some_and(|t| Some(t.id) != turn_before);

        let ready_check_expires_at = state
            .queue
            .find_pending(citizen_id)
            .filter(|e| e.status == EntryStatus::ReadyCheck)
            .and_then(|e| e.ready_check_sent_at)
            .and_then(|sent| {
                chrono::Duration::from_std(self.cfg.ready_check_timeout)
                    .ok()
                    .map(|t| sent + t)
            });

        Ok(HeartbeatTick {
            position: state.queue.position_of(citizen_id),
            turn_started,
            current_turn: state.turn.clone(),
            ready_check_expires_at,
            next_heartbeat: self.cfg.heartbeat_interval,
        })
    }

    /// Confirms a pending ready-check for the citizen.
    pub async fn confirm_ready(
        &self,
        member_id: &str,
        citizen_id: &str,
    ) -> Result<(), ArbiterError> {
        self.confirm_ready_at(member_id, citizen_id, Utc::now()).await
    }

    /// [`confirm_ready`](Self::confirm_ready) with an explicit timestamp.
    ///
    /// Confirming from `Waiting` (before any check was sent) is accepted and
    /// simply pre-confirms the entry. A lapsed check skips the entry,
    /// promotes the next head, and reports
    /// [`ReadyCheckExpired`](ArbiterError::ReadyCheckExpired).
    pub async fn confirm_ready_at(
        &self,
        member_id: &str,
        citizen_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ArbiterError> {
        let (member, state) = self.lookup(member_id)?;
        if !member.is_online(now) {
            return Err(ArbiterError::MemberOffline);
        }

        let mut state = state.lock().await;
        let timeout = self.cfg.ready_check_timeout;

        let lapsed = {
            let entry = state
                .queue
                .find_pending_mut(citizen_id)
                .ok_or(ArbiterError::NotQueued)?;
            if entry.ready_check_lapsed(now, timeout) {
                entry.skip(now);
                true
            } else {
                entry.confirm(now);
                false
            }
        };

        if lapsed {
            let queue_length = state.queue.pending_len();
            self.bus.publish(
                Event::at(EventKind::QueueUpdated, member_id, now).with_queue_length(queue_length),
            );
        }
        if state.turn.is_none() {
            self.promote(&mut state, &member, now);
        }

        if lapsed {
            Err(ArbiterError::ReadyCheckExpired)
        } else {
            Ok(())
        }
    }

    /// Fast-path speak admission: try-promote-direct-or-enqueue, one
    /// critical section.
    ///
    /// When the member is idle and the queue is empty, the caller goes
    /// straight to `Active` — no ready-check, they are self-evidently present
    /// — and the returned turn accepts their message. Otherwise the caller is
    /// enqueued (upsert: an already-pending caller gets their position back)
    /// and the message must be resubmitted once promoted. Two simultaneous
    /// calls against an empty queue resolve to exactly one winner because the
    /// check-then-create sequence never leaves the member's mutex.
    pub async fn try_speak(
        &self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
    ) -> Result<SpeakAdmission, ArbiterError> {
        self.try_speak_at(member_id, citizen_id, citizen_name, citizen_avatar, Utc::now())
            .await
    }

    /// [`try_speak`](Self::try_speak) with an explicit timestamp.
    pub async fn try_speak_at(
        &self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SpeakAdmission, ArbiterError> {
        let (member, state) = self.lookup(member_id)?;
        if !member.is_online(now) {
            return Err(ArbiterError::MemberOffline);
        }

        let mut state = state.lock().await;
        self.note_online(&mut state, &member, now);

        // Reconcile before judging emptiness, so a dead turn or stale
        // waiters cannot hold the fast path hostage.
        self.expire_overdue_turn(&mut state, &member, now);
        self.evict_stale(&mut state, &member, now);

        if state.turn.is_none() && state.queue.pending_len() == 0 {
            state
                .queue
                .join(member_id, citizen_id, citizen_name, citizen_avatar, now)?;
            if let Some(entry) = state.queue.find_pending_mut(citizen_id) {
                entry.last_heartbeat_at = Some(now);
                entry.confirm(now);
            }
            if let Some(turn) = self.start_turn(&mut state, &member, citizen_id, now) {
                return Ok(SpeakAdmission::TurnStarted(turn));
            }
        }

        let (position, queue_length) =
            state
                .queue
                .join_or_position(member_id, citizen_id, citizen_name, citizen_avatar, now);
        self.bus.publish(
            Event::at(EventKind::QueueUpdated, member_id, now).with_queue_length(queue_length),
        );
        Ok(SpeakAdmission::Queued {
            position,
            queue_length,
        })
    }

    /// Records one accepted message against the citizen's active turn.
    ///
    /// Check order: ownership → elapsed time → message limit → character
    /// budget. Reaching the message limit completes the turn and
    /// chain-promotes the next head inside the same critical section.
    pub async fn record_message(
        &self,
        member_id: &str,
        turn_id: Uuid,
        citizen_id: &str,
        chars: u32,
    ) -> Result<MessageReceipt, ArbiterError> {
        self.record_message_at(member_id, turn_id, citizen_id, chars, Utc::now())
            .await
    }

    /// [`record_message`](Self::record_message) with an explicit timestamp.
    pub async fn record_message_at(
        &self,
        member_id: &str,
        turn_id: Uuid,
        citizen_id: &str,
        chars: u32,
        now: DateTime<Utc>,
    ) -> Result<MessageReceipt, ArbiterError> {
        let (member, state) = self.lookup(member_id)?;
        let mut state = state.lock().await;

        let receipt = {
            let turn = match state.turn.as_mut() {
                Some(t) if t.id == turn_id => t,
                _ => return Err(ArbiterError::TurnNotActive),
            };
            if turn.citizen_id != citizen_id {
                return Err(ArbiterError::NotYourTurn);
            }
            if turn.is_expired(now) {
                None
            } else {
                if turn.message_limit_reached() {
                    return Err(ArbiterError::MessageLimitReached);
                }
                if chars > turn.remaining_chars() {
                    return Err(ArbiterError::BudgetExceeded {
                        remaining: turn.remaining_chars(),
                    });
                }
                turn.record_message(chars);
                Some(MessageReceipt {
                    turn: turn.clone(),
                    should_end: turn.message_limit_reached(),
                })
            }
        };

        match receipt {
            None => {
                self.end_locked(&mut state, &member, turn_id, EndReason::TimedOut, now);
                Err(ArbiterError::TimeExceeded)
            }
            Some(receipt) => {
                if receipt.should_end {
                    self.end_locked(&mut state, &member, turn_id, EndReason::Completed, now);
                }
                Ok(receipt)
            }
        }
    }

    /// Ends a turn and chain-promotes the next head.
    ///
    /// Idempotent: ending a turn that is no longer the member's active turn
    /// is a no-op returning `None`.
    pub async fn end_turn(
        &self,
        member_id: &str,
        turn_id: Uuid,
        reason: EndReason,
    ) -> Result<Option<Turn>, ArbiterError> {
        self.end_turn_at(member_id, turn_id, reason, Utc::now()).await
    }

    /// [`end_turn`](Self::end_turn) with an explicit timestamp.
    pub async fn end_turn_at(
        &self,
        member_id: &str,
        turn_id: Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> Result<Option<Turn>, ArbiterError> {
        let (member, state) = self.lookup(member_id)?;
        let mut state = state.lock().await;
        Ok(self.end_locked(&mut state, &member, turn_id, reason, now))
    }

    /// The member's current active turn, if any.
    pub async fn active_turn(&self, member_id: &str) -> Result<Option<Turn>, ArbiterError> {
        let (_, state) = self.lookup(member_id)?;
        let state = state.lock().await;
        Ok(state.turn.clone())
    }

    // ---- Transcript access (for the handler) --------------------------

    /// Capped, oldest-first history snapshot for the reply generator.
    pub async fn history(&self, member_id: &str) -> Result<Vec<ChatMessage>, ArbiterError> {
        let (_, state) = self.lookup(member_id)?;
        let state = state.lock().await;
        Ok(state
            .transcript
            .capped_history(self.cfg.history_max_messages, self.cfg.history_max_chars))
    }

    /// Appends a message to the member's transcript.
    pub async fn append_message(
        &self,
        member_id: &str,
        message: ChatMessage,
    ) -> Result<(), ArbiterError> {
        let (_, state) = self.lookup(member_id)?;
        let mut state = state.lock().await;
        state.transcript.push(message);
        Ok(())
    }

    // ---- Internals (all called with the member's mutex held) ----------

    fn lookup(&self, member_id: &str) -> Result<(Arc<Member>, Arc<Mutex<MemberState>>), ArbiterError> {
        let member = self
            .directory
            .get(member_id)
            .cloned()
            .ok_or_else(|| ArbiterError::UnknownMember {
                member: member_id.to_string(),
            })?;
        let state = self
            .registry
            .get(member_id)
            .ok_or_else(|| ArbiterError::UnknownMember {
                member: member_id.to_string(),
            })?;
        Ok((member, state))
    }

    /// Promotion loop: vets the head (ready-check coordination), skips
    /// lapsed checks, and starts a turn for a confirmed or auto-confirmable
    /// head.
    ///
    /// Returns the started turn, or `None` when the queue is empty or the
    /// head's ready-check is still outstanding.
    fn promote(
        &self,
        state: &mut MemberState,
        member: &Member,
        now: DateTime<Utc>,
    ) -> Option<Turn> {
        if state.turn.is_some() {
            return None;
        }

        let auto_confirm = chrono::Duration::from_std(self.cfg.auto_confirm_threshold)
            .unwrap_or_else(|_| chrono::Duration::minutes(2));
        let timeout = self.cfg.ready_check_timeout;

        loop {
            let head = state.queue.head_mut()?;
            match head.status {
                EntryStatus::Confirmed => {
                    let citizen_id = head.citizen_id.clone();
                    return self.start_turn(state, member, &citizen_id, now);
                }
                EntryStatus::Waiting => {
                    if now - head.joined_at < auto_confirm {
                        // Recently joined: almost certainly still present.
                        head.confirm(now);
                        let citizen_id = head.citizen_id.clone();
                        return self.start_turn(state, member, &citizen_id, now);
                    }
                    head.begin_ready_check(now);
                    let citizen_id = head.citizen_id.clone();
                    let expires_at = now
                        + chrono::Duration::from_std(timeout)
                            .unwrap_or_else(|_| chrono::Duration::seconds(30));
                    debug!(member = %member.id, citizen = %citizen_id, "ready-check sent");
                    self.bus.publish(
                        Event::at(EventKind::ReadyCheck, member.id.as_str(), now)
                            .with_citizen(citizen_id)
                            .with_expires_at(expires_at),
                    );
                    return None;
                }
                EntryStatus::ReadyCheck => {
                    if head.ready_check_lapsed(now, timeout) {
                        head.skip(now);
                        let queue_length = state.queue.pending_len();
                        self.bus.publish(
                            Event::at(EventKind::QueueUpdated, member.id.as_str(), now)
                                .with_queue_length(queue_length),
                        );
                        // Retry with the new head.
                        continue;
                    }
                    return None;
                }
                // head_mut only yields pending entries.
                EntryStatus::Active | EntryStatus::Completed | EntryStatus::Skipped => {
                    return None;
                }
            }
        }
    }

    /// Creates the turn for `citizen_id`, marks their entry active, and
    /// emits `turn_started`. The invariant check here is the loud one.
    fn start_turn(
        &self,
        state: &mut MemberState,
        member: &Member,
        citizen_id: &str,
        now: DateTime<Utc>,
    ) -> Option<Turn> {
        if let Some(active) = &state.turn {
            let fault = Fault::TurnAlreadyActive {
                member: member.id.clone(),
            };
            error!(
                fault = fault.as_label(),
                member = %member.id,
                active_turn = %active.id,
                "refusing promotion: invariant violated"
            );
            return None;
        }

        let entry = state.queue.find_pending_mut(citizen_id)?;
        entry.activate();
        let citizen_name = entry.citizen_name.clone();
        let citizen_avatar = entry.citizen_avatar.clone();

        let turn = Turn::begin(
            &member.id,
            citizen_id,
            &citizen_name,
            citizen_avatar.as_deref(),
            self.cfg.turn_budget,
            now,
        );
        state.turn = Some(turn.clone());

        let queue_length = state.queue.pending_len();
        self.bus.publish(
            Event::at(EventKind::TurnStarted, member.id.as_str(), now)
                .with_turn(turn.clone())
                .with_queue_length(queue_length),
        );
        Some(turn)
    }

    /// Terminal transition + chained promotion + `turn_ended` event.
    /// Idempotent over `turn_id`.
    fn end_locked(
        &self,
        state: &mut MemberState,
        member: &Member,
        turn_id: Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> Option<Turn> {
        let mut ended = match state.turn.take() {
            Some(t) if t.id == turn_id => t,
            other => {
                // Not the active turn (already terminal, or a stale id):
                // restore and no-op.
                state.turn = other;
                return None;
            }
        };
        ended.finish(reason, now);
        if let Some(entry) = state.queue.find_active_mut(&ended.citizen_id) {
            entry.complete(now);
        }

        // Chained promotion keeps the queue draining without waiting for the
        // next client-driven tick; it requires the member to still be online.
        let next = if member.is_online(now) {
            self.promote(state, member, now)
        } else {
            None
        };

        let queue_length = state.queue.pending_len();
        let mut ev = Event::at(EventKind::TurnEnded, member.id.as_str(), now)
            .with_ended_turn(ended.id)
            .with_queue_length(queue_length);
        if let Some(next) = &next {
            ev = ev.with_turn(next.clone());
        }
        self.bus.publish(ev);
        next
    }

    /// Lazily expires an overdue active turn.
    fn expire_overdue_turn(&self, state: &mut MemberState, member: &Member, now: DateTime<Utc>) {
        if let Some(turn) = &state.turn {
            if turn.is_expired(now) {
                let id = turn.id;
                self.end_locked(state, member, id, EndReason::TimedOut, now);
            }
        }
    }

    /// Evicts stale pending entries; publishes a queue update if any fell.
    fn evict_stale(&self, state: &mut MemberState, member: &Member, now: DateTime<Utc>) -> usize {
        let evicted = state.queue.evict_stale(
            now,
            self.cfg.heartbeat_stale_after,
            self.cfg.heartbeat_grace,
        );
        if evicted > 0 {
            let queue_length = state.queue.pending_len();
            self.bus.publish(
                Event::at(EventKind::QueueUpdated, member.id.as_str(), now)
                    .with_queue_length(queue_length),
            );
        }
        evicted
    }

    /// Records an observed schedule-open edge.
    fn note_online(&self, state: &mut MemberState, member: &Member, now: DateTime<Utc>) {
        if !state.online {
            state.online = true;
            self.bus
                .publish(Event::at(EventKind::MemberOnline, member.id.as_str(), now));
        }
    }

    /// Closes the office: force-ends any active turn, skips all pending
    /// entries, and records the schedule-close edge. Idempotent.
    fn close_office(&self, state: &mut MemberState, member: &Member, now: DateTime<Utc>) {
        if let Some(turn) = &state.turn {
            let id = turn.id;
            self.end_locked(state, member, id, EndReason::TimedOut, now);
        }
        let skipped = state.queue.skip_all_pending(now);
        if skipped > 0 {
            let queue_length = state.queue.pending_len();
            self.bus.publish(
                Event::at(EventKind::QueueUpdated, member.id.as_str(), now)
                    .with_queue_length(queue_length),
            );
        }
        if state.online {
            state.online = false;
            self.bus
                .publish(Event::at(EventKind::MemberOffline, member.id.as_str(), now));
        }
    }

    /// One reconciliation pass over a single member. Returns counters for
    /// observability; independently idempotent.
    pub(crate) async fn sweep_member_at(
        &self,
        member: &Arc<Member>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<super::sweep::MemberSweep> {
        let state = self
            .registry
            .get(&member.id)
            .ok_or_else(|| anyhow::anyhow!("no state for member {}", member.id))?;
        let mut state = state.lock().await;
        let mut report = super::sweep::MemberSweep::default();

        if member.is_online(now) {
            self.note_online(&mut state, member, now);

            if state.turn.as_ref().is_some_and(|t| t.is_expired(now)) {
                self.expire_overdue_turn(&mut state, member, now);
                report.turns_expired += 1;
            }
            report.entries_evicted += self.evict_stale(&mut state, member, now);
            if state.turn.is_none() && self.promote(&mut state, member, now).is_some() {
                report.turns_started += 1;
            }
        } else {
            let had_work = state.turn.is_some() || state.queue.pending_len() > 0 || state.online;
            self.close_office(&mut state, member, now);
            if had_work {
                report.offices_closed += 1;
            }
        }

        report.entries_pruned += state.queue.prune_terminal(now, self.cfg.audit_retention);
        Ok(report)
    }
}
