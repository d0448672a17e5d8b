//! Integration tests for the conversation handler: text vetting order,
//! fail-open/fail-closed behavior, violations, throttling, and the reply
//! flow around the arbiter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use podium::{
    Arbiter, ArbiterError, AvailabilityWindow, ChatMessage, Config, ConversationHandler,
    Directory, GenerateReply, HandlerError, Member, MemoryViolationLog, Moderate, ReplyError,
    SpeakOutcome, TurnBudget, Verdict, ViolationRecord, ViolationSink,
};

/// Monday 2026-08-03, 10:00 UTC.
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap()
}

fn sec(n: i64) -> chrono::Duration {
    chrono::Duration::seconds(n)
}

fn always_open() -> Vec<AvailabilityWindow> {
    (0..7)
        .map(|d| AvailabilityWindow {
            day_of_week: d,
            start_hour: 0,
            end_hour: 0,
        })
        .collect()
}

fn arbiter(cfg: Config) -> Arc<Arbiter> {
    let directory = Arc::new(Directory::new(vec![Member {
        id: "mayor".to_string(),
        name: "The Mayor".to_string(),
        avatar: None,
        persona: "Warm, civic-minded host.".to_string(),
        schedule: always_open(),
    }]));
    Arbiter::new(directory, cfg)
}

/// Chat budget keeps turns alive across two messages.
fn chat_config() -> Config {
    let mut cfg = Config::default();
    cfg.turn_budget = TurnBudget::chat();
    cfg
}

// ---- Collaborator fakes ------------------------------------------------

/// Flags any message containing a configured word.
struct WordListModerator {
    banned_word: &'static str,
}

#[async_trait]
impl Moderate for WordListModerator {
    async fn moderate(&self, text: &str) -> anyhow::Result<Verdict> {
        if text.contains(self.banned_word) {
            Ok(Verdict::Unsafe {
                category: "harassment".to_string(),
            })
        } else {
            Ok(Verdict::Safe)
        }
    }
}

/// Always errors, as a flaky classifier would.
struct BrokenModerator;

#[async_trait]
impl Moderate for BrokenModerator {
    async fn moderate(&self, _text: &str) -> anyhow::Result<Verdict> {
        anyhow::bail!("classifier unavailable")
    }
}

/// Echo generator that records how many calls it served.
struct EchoGenerator {
    calls: AtomicUsize,
}

impl EchoGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl GenerateReply for EchoGenerator {
    async fn generate(
        &self,
        _persona: &str,
        citizen_name: &str,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, ReplyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "Noted, {citizen_name}: {message} ({} prior)",
            history.len()
        ))
    }
}

/// Generator that always fails.
struct BrokenGenerator;

#[async_trait]
impl GenerateReply for BrokenGenerator {
    async fn generate(
        &self,
        _persona: &str,
        _citizen_name: &str,
        _message: &str,
        _history: &[ChatMessage],
    ) -> Result<String, ReplyError> {
        Err(ReplyError::Timeout)
    }
}

// ---- Tests -------------------------------------------------------------

#[tokio::test]
async fn test_speak_sends_and_generates_reply() {
    let arb = arbiter(Config::default());
    let generator = EchoGenerator::new();
    let handler = ConversationHandler::new(Arc::clone(&arb)).with_generator(generator.clone());

    let outcome = handler
        .speak_at("mayor", "a", "Ada", None, "Hello there!", t0())
        .await
        .unwrap();

    match outcome {
        SpeakOutcome::Sent {
            turn,
            citizen_message,
            reply,
        } => {
            assert_eq!(turn.citizen_id, "a");
            assert_eq!(turn.messages_used, 1);
            assert_eq!(citizen_message.content, "Hello there!");
            let reply = reply.expect("generator configured");
            assert!(reply.content.contains("Ada"));
        }
        other => panic!("expected sent, got {other:?}"),
    }

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    // Citizen message + council reply both landed in the transcript.
    assert_eq!(arb.history("mayor").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_speak_queues_without_sending_when_busy() {
    let arb = arbiter(chat_config());
    let handler = ConversationHandler::new(Arc::clone(&arb)).with_generator(EchoGenerator::new());

    handler
        .speak_at("mayor", "a", "Ada", None, "First!", t0())
        .await
        .unwrap();

    let outcome = handler
        .speak_at("mayor", "b", "Bea", None, "Me too!", t0() + sec(6))
        .await
        .unwrap();
    match outcome {
        SpeakOutcome::Queued {
            position,
            queue_length,
        } => assert_eq!((position, queue_length), (0, 1)),
        other => panic!("expected queued, got {other:?}"),
    }

    // The queued message was not sent: only a's exchange is on record.
    let history = arb.history("mayor").await.unwrap();
    assert!(history.iter().all(|m| m.content != "Me too!"));
}

#[tokio::test]
async fn test_sanitizer_fails_closed() {
    let arb = arbiter(Config::default());
    let handler = ConversationHandler::new(Arc::clone(&arb));

    let long = "x".repeat(1_001);
    let err = handler
        .speak_at("mayor", "a", "Ada", None, &long, t0())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::MessageRejected { ref category, .. } if category == "length"
    ));
    // Rejected before arbitration: no turn, no queue entry.
    assert!(arb.active_turn("mayor").await.unwrap().is_none());
}

#[tokio::test]
async fn test_moderation_failure_is_fail_open() {
    let arb = arbiter(Config::default());
    let handler =
        ConversationHandler::new(Arc::clone(&arb)).with_moderator(Arc::new(BrokenModerator));

    let outcome = handler
        .speak_at("mayor", "a", "Ada", None, "Hello!", t0())
        .await
        .unwrap();
    assert!(matches!(outcome, SpeakOutcome::Sent { .. }));
}

#[tokio::test]
async fn test_unsafe_verdict_rejects_before_turn() {
    let arb = arbiter(Config::default());
    let handler = ConversationHandler::new(Arc::clone(&arb))
        .with_moderator(Arc::new(WordListModerator { banned_word: "rude" }));

    let err = handler
        .speak_at("mayor", "a", "Ada", None, "something rude", t0())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::MessageRejected {
            turn_ended: false,
            ..
        }
    ));
    assert!(arb.active_turn("mayor").await.unwrap().is_none());
}

#[tokio::test]
async fn test_violation_force_ends_active_turn() {
    let arb = arbiter(chat_config());
    let sink = Arc::new(MemoryViolationLog::default());
    let handler = ConversationHandler::new(Arc::clone(&arb))
        .with_moderator(Arc::new(WordListModerator { banned_word: "rude" }))
        .with_violations(sink.clone());

    // Clean first message wins the turn (chat budget: 2 messages).
    handler
        .speak_at("mayor", "a", "Ada", None, "Hello!", t0())
        .await
        .unwrap();
    let turn = arb.active_turn("mayor").await.unwrap().unwrap();

    // The second message trips moderation: violation recorded, turn ended.
    let err = handler
        .send_turn_message_at("mayor", turn.id, "a", "something rude", t0() + sec(6))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::MessageRejected { turn_ended: true, .. }
    ));
    assert!(arb.active_turn("mayor").await.unwrap().is_none());
}

#[tokio::test]
async fn test_repeat_violations_escalate_to_ban() {
    let arb = arbiter(chat_config());
    let sink = Arc::new(MemoryViolationLog::default());
    let handler = ConversationHandler::new(Arc::clone(&arb))
        .with_moderator(Arc::new(WordListModerator { banned_word: "rude" }))
        .with_violations(sink.clone());

    // Three violations inside the rolling window trip the ban.
    for i in 0..3 {
        let now = t0() + sec(i * 10);
        let record = ViolationRecord::new(
            "a",
            "harassment",
            "something rude",
            uuid::Uuid::new_v4(),
            now,
        );
        sink.record(record).await.unwrap();
    }

    let err = handler
        .speak_at("mayor", "a", "Ada", None, "Hello!", t0() + sec(40))
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Banned { until: Some(_) }));
    assert!(arb.active_turn("mayor").await.unwrap().is_none());
}

#[tokio::test]
async fn test_throttle_rejects_rapid_messages() {
    let arb = arbiter(chat_config());
    let handler = ConversationHandler::new(Arc::clone(&arb));

    handler
        .speak_at("mayor", "a", "Ada", None, "First", t0())
        .await
        .unwrap();
    let turn = arb.active_turn("mayor").await.unwrap().unwrap();

    // One second later is inside the 5s cooldown.
    let err = handler
        .send_turn_message_at("mayor", turn.id, "a", "Second", t0() + sec(1))
        .await
        .unwrap_err();
    match err {
        HandlerError::Throttled { wait } => assert_eq!(wait, Duration::from_secs(4)),
        other => panic!("expected throttled, got {other:?}"),
    }

    // After the cooldown the second message lands and completes the turn.
    let outcome = handler
        .send_turn_message_at("mayor", turn.id, "a", "Second", t0() + sec(6))
        .await
        .unwrap();
    assert!(outcome.should_end);
}

#[tokio::test]
async fn test_send_turn_message_enforces_ownership() {
    let arb = arbiter(chat_config());
    let handler = ConversationHandler::new(Arc::clone(&arb));

    handler
        .speak_at("mayor", "a", "Ada", None, "Mine", t0())
        .await
        .unwrap();
    let turn = arb.active_turn("mayor").await.unwrap().unwrap();

    let err = handler
        .send_turn_message_at("mayor", turn.id, "b", "Not mine", t0() + sec(6))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::Arbiter(ArbiterError::NotYourTurn)
    ));
}

#[tokio::test]
async fn test_reply_failure_still_delivers_citizen_message() {
    let arb = arbiter(Config::default());
    let handler =
        ConversationHandler::new(Arc::clone(&arb)).with_generator(Arc::new(BrokenGenerator));

    let outcome = handler
        .speak_at("mayor", "a", "Ada", None, "Hello!", t0())
        .await
        .unwrap();
    match outcome {
        SpeakOutcome::Sent { reply, .. } => assert!(reply.is_none()),
        other => panic!("expected sent, got {other:?}"),
    }
    // The citizen's message is on record even though the reply failed.
    assert_eq!(arb.history("mayor").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_history_feeds_the_generator() {
    let arb = arbiter(chat_config());
    let generator = EchoGenerator::new();
    let handler = ConversationHandler::new(Arc::clone(&arb)).with_generator(generator.clone());

    handler
        .speak_at("mayor", "a", "Ada", None, "First", t0())
        .await
        .unwrap();
    let turn = arb.active_turn("mayor").await.unwrap().unwrap();

    let outcome = handler
        .send_turn_message_at("mayor", turn.id, "a", "Second", t0() + sec(6))
        .await
        .unwrap();
    // The second reply saw the first exchange (2 messages) as history.
    let reply = outcome.reply.expect("generator configured");
    assert!(reply.content.contains("(2 prior)"), "got: {}", reply.content);
}

#[tokio::test]
async fn test_speak_budget_chains_to_next_speaker() {
    // Default speak budget: one message completes the turn, freeing the
    // member for the next fast-path caller.
    let arb = arbiter(Config::default());
    let handler = ConversationHandler::new(Arc::clone(&arb));

    handler
        .speak_at("mayor", "a", "Ada", None, "First", t0())
        .await
        .unwrap();
    assert!(arb.active_turn("mayor").await.unwrap().is_none());

    let outcome = handler
        .speak_at("mayor", "b", "Bea", None, "Second", t0() + sec(6))
        .await
        .unwrap();
    assert!(matches!(outcome, SpeakOutcome::Sent { .. }));
}
