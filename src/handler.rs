//! # Conversation handler.
//!
//! Composes the external collaborators around the arbiter for the two
//! message-bearing flows:
//!
//! - [`speak`](ConversationHandler::speak) — the optimistic fast path: vet
//!   the text, then try-promote-or-enqueue in one critical section; when the
//!   caller wins the turn, charge the message and generate the member's
//!   reply.
//! - [`send_turn_message`](ConversationHandler::send_turn_message) — a
//!   message against an already-held turn.
//!
//! ## Rules
//! - Sanitize, then moderate, in that order, before any text is attached to
//!   a turn.
//! - Sanitization **fails closed** (a sanitizer bug must not leak raw text);
//!   moderation and the violation sink **fail open** (a flaky classifier
//!   must not block the product).
//! - An unsafe verdict during an active turn records a violation and
//!   force-ends the turn.
//! - No collaborator is ever invoked while a per-member lock is held: text
//!   vetting happens before arbitration, reply generation after.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::arbiter::{Arbiter, MessageReceipt, SpeakAdmission};
use crate::collab::{
    GenerateReply, LengthSanitizer, Moderate, Sanitize, SanitizeOutcome, Verdict, ViolationRecord,
    ViolationSink,
};
use crate::error::HandlerError;
use crate::throttle::{Throttle, ThrottleDecision};
use crate::transcript::ChatMessage;
use crate::turns::{EndReason, Turn};

/// Outcome of the speak flow.
#[derive(Debug, Clone)]
pub enum SpeakOutcome {
    /// The caller held (or just won) the turn and the message was accepted.
    Sent {
        /// Turn snapshot after charging the message.
        turn: Turn,
        citizen_message: ChatMessage,
        /// The member's generated reply, if a generator is configured and it
        /// succeeded.
        reply: Option<ChatMessage>,
    },
    /// The caller was enqueued; the message was NOT sent and should be
    /// resubmitted once promoted.
    Queued { position: usize, queue_length: usize },
}

/// Outcome of a message against a held turn.
#[derive(Debug, Clone)]
pub struct MessageOutcome {
    /// Turn snapshot after charging the message.
    pub turn: Turn,
    /// True when the turn completed with this message.
    pub should_end: bool,
    pub citizen_message: ChatMessage,
    /// The member's generated reply, if any.
    pub reply: Option<ChatMessage>,
}

/// Front door for citizen messages: text vetting, throttling, ban
/// enforcement, arbitration, and reply generation.
pub struct ConversationHandler {
    arbiter: Arc<Arbiter>,
    sanitizer: Arc<dyn Sanitize>,
    moderator: Option<Arc<dyn Moderate>>,
    generator: Option<Arc<dyn GenerateReply>>,
    violations: Option<Arc<dyn ViolationSink>>,
    throttle: Throttle,
}

impl ConversationHandler {
    /// Creates a handler with the reference sanitizer and no optional
    /// collaborators; wire them in with the `with_*` methods.
    pub fn new(arbiter: Arc<Arbiter>) -> Self {
        let cooldown = arbiter.config().message_cooldown;
        Self {
            arbiter,
            sanitizer: Arc::new(LengthSanitizer::default()),
            moderator: None,
            generator: None,
            violations: None,
            throttle: Throttle::new(cooldown),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitize>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_moderator(mut self, moderator: Arc<dyn Moderate>) -> Self {
        self.moderator = Some(moderator);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn GenerateReply>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_violations(mut self, sink: Arc<dyn ViolationSink>) -> Self {
        self.violations = Some(sink);
        self
    }

    pub fn arbiter(&self) -> &Arc<Arbiter> {
        &self.arbiter
    }

    /// Optimistic speak: vet the text, then try-promote-or-enqueue.
    pub async fn speak(
        &self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        content: &str,
    ) -> Result<SpeakOutcome, HandlerError> {
        self.speak_at(member_id, citizen_id, citizen_name, citizen_avatar, content, Utc::now())
            .await
    }

    /// [`speak`](Self::speak) with an explicit timestamp.
    pub async fn speak_at(
        &self,
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        citizen_avatar: Option<&str>,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<SpeakOutcome, HandlerError> {
        let cleaned = self.vet_text(content)?;
        self.check_ban(citizen_id, now).await?;
        self.check_throttle(citizen_id, now).await?;
        if let Some(category) = self.moderate(&cleaned).await {
            return Err(HandlerError::MessageRejected {
                category,
                reason: "that message is not appropriate here".to_string(),
                turn_ended: false,
            });
        }

        let admission = self
            .arbiter
            .try_speak_at(member_id, citizen_id, citizen_name, citizen_avatar, now)
            .await?;
        let turn = match admission {
            SpeakAdmission::Queued {
                position,
                queue_length,
            } => {
                return Ok(SpeakOutcome::Queued {
                    position,
                    queue_length,
                })
            }
            SpeakAdmission::TurnStarted(turn) => turn,
        };

        let (receipt, citizen_message, reply) = self
            .deliver(member_id, turn.id, citizen_id, citizen_name, &cleaned, now)
            .await?;

        Ok(SpeakOutcome::Sent {
            turn: receipt.turn,
            citizen_message,
            reply,
        })
    }

    /// A message against an already-held turn.
    pub async fn send_turn_message(
        &self,
        member_id: &str,
        turn_id: Uuid,
        citizen_id: &str,
        content: &str,
    ) -> Result<MessageOutcome, HandlerError> {
        self.send_turn_message_at(member_id, turn_id, citizen_id, content, Utc::now())
            .await
    }

    /// [`send_turn_message`](Self::send_turn_message) with an explicit
    /// timestamp.
    pub async fn send_turn_message_at(
        &self,
        member_id: &str,
        turn_id: Uuid,
        citizen_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageOutcome, HandlerError> {
        let cleaned = self.vet_text(content)?;
        self.check_throttle(citizen_id, now).await?;

        if let Some(category) = self.moderate(&cleaned).await {
            let turn_ended = self
                .punish_violation(member_id, turn_id, citizen_id, &category, content, now)
                .await;
            return Err(HandlerError::MessageRejected {
                category,
                reason: "that message is not appropriate here".to_string(),
                turn_ended,
            });
        }

        let citizen_name = self
            .arbiter
            .active_turn(member_id)
            .await?
            .filter(|t| t.id == turn_id)
            .map(|t| t.citizen_name)
            .unwrap_or_else(|| citizen_id.to_string());

        let (receipt, citizen_message, reply) = self
            .deliver(member_id, turn_id, citizen_id, &citizen_name, &cleaned, now)
            .await?;

        Ok(MessageOutcome {
            turn: receipt.turn,
            should_end: receipt.should_end,
            citizen_message,
            reply,
        })
    }

    // ---- Shared steps -------------------------------------------------

    /// Sanitization, fail-closed.
    fn vet_text(&self, content: &str) -> Result<String, HandlerError> {
        match self.sanitizer.sanitize(content) {
            SanitizeOutcome::Clean(cleaned) => Ok(cleaned),
            SanitizeOutcome::Rejected { category, reason } => {
                Err(HandlerError::MessageRejected {
                    category,
                    reason,
                    turn_ended: false,
                })
            }
        }
    }

    /// Ban lookup, fail-open on sink failure.
    async fn check_ban(&self, citizen_id: &str, now: DateTime<Utc>) -> Result<(), HandlerError> {
        let Some(sink) = &self.violations else {
            return Ok(());
        };
        match sink.ban_status(citizen_id, now).await {
            Ok(status) if status.banned => Err(HandlerError::Banned {
                until: status.until,
            }),
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(citizen = citizen_id, error = %err, "ban lookup failed; allowing");
                Ok(())
            }
        }
    }

    async fn check_throttle(
        &self,
        citizen_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HandlerError> {
        match self.throttle.check(citizen_id, now).await {
            ThrottleDecision::Allowed => Ok(()),
            ThrottleDecision::Denied { wait } => Err(HandlerError::Throttled { wait }),
        }
    }

    /// Moderation, fail-open: returns the unsafe category, if any.
    async fn moderate(&self, text: &str) -> Option<String> {
        let moderator = self.moderator.as_ref()?;
        match moderator.moderate(text).await {
            Ok(Verdict::Safe) => None,
            Ok(Verdict::Unsafe { category }) => Some(category),
            Err(err) => {
                warn!(error = %err, "moderation failed; allowing message through");
                None
            }
        }
    }

    /// Records a violation and force-ends the turn if it is the caller's
    /// active turn. Returns whether a turn was ended.
    async fn punish_violation(
        &self,
        member_id: &str,
        turn_id: Uuid,
        citizen_id: &str,
        category: &str,
        raw_content: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let owns_turn = matches!(
            self.arbiter.active_turn(member_id).await,
            Ok(Some(ref t)) if t.id == turn_id && t.citizen_id == citizen_id
        );

        if let Some(sink) = &self.violations {
            let record = ViolationRecord::new(citizen_id, category, raw_content, turn_id, now);
            if let Err(err) = sink.record(record).await {
                warn!(citizen = citizen_id, error = %err, "violation sink failed");
            }
        }

        if owns_turn {
            let ended = self
                .arbiter
                .end_turn_at(member_id, turn_id, EndReason::Violation, now)
                .await;
            if let Err(err) = ended {
                warn!(member = member_id, error = %err, "failed to end turn after violation");
                return false;
            }
            return true;
        }
        false
    }

    /// Charges the message, updates the transcript, and generates the reply
    /// (outside every lock).
    async fn deliver(
        &self,
        member_id: &str,
        turn_id: Uuid,
        citizen_id: &str,
        citizen_name: &str,
        cleaned: &str,
        now: DateTime<Utc>,
    ) -> Result<(MessageReceipt, ChatMessage, Option<ChatMessage>), HandlerError> {
        // History excludes the message being sent, matching what the
        // generator expects alongside the standalone `message` argument.
        let history = self.arbiter.history(member_id).await?;

        let chars = cleaned.chars().count() as u32;
        let receipt = self
            .arbiter
            .record_message_at(member_id, turn_id, citizen_id, chars, now)
            .await?;

        let citizen_message = ChatMessage::citizen(member_id, citizen_id, citizen_name, cleaned, now);
        self.arbiter
            .append_message(member_id, citizen_message.clone())
            .await?;
        self.throttle.record_sent(citizen_id, now).await;

        let reply = match &self.generator {
            None => None,
            Some(generator) => {
                let persona = self
                    .arbiter
                    .directory()
                    .get(member_id)
                    .map(|m| m.persona.clone())
                    .unwrap_or_default();
                match generator
                    .generate(&persona, citizen_name, cleaned, &history)
                    .await
                {
                    Ok(text) => {
                        let message = ChatMessage::council(member_id, &text, Utc::now());
                        self.arbiter
                            .append_message(member_id, message.clone())
                            .await?;
                        Some(message)
                    }
                    Err(err) => {
                        warn!(member = member_id, error = %err, "reply generation failed");
                        None
                    }
                }
            }
        };

        Ok((receipt, citizen_message, reply))
    }
}
