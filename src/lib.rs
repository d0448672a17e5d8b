//! # podium
//!
//! **Podium** is a turn-queue arbitration library for Rust.
//!
//! It arbitrates many concurrent citizens competing for exclusive, time- and
//! size-bounded "turns" to converse with one of a small number of scheduled
//! hosts ("members"). The crate is designed as the conversation core for a
//! higher-level product layer: transport, rendering, persistence, and the
//! language-model collaborators stay outside and plug in at trait seams.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  join / heartbeat / leave          speak / send_turn_message
//!  confirm_ready                              │
//!        │                                    ▼
//!        │                        ┌────────────────────────┐
//!        │                        │  ConversationHandler   │
//!        │                        │  sanitize → moderate   │
//!        │                        │  throttle → ban check  │
//!        │                        └───────────┬────────────┘
//!        ▼                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Arbiter (per-member critical sections)                           │
//! │  - QueueStore   (FIFO by joined_at, liveness, audit tail)         │
//! │  - Turn         (≤ 1 active per member — the core invariant)      │
//! │  - ready-check  (auto-confirm / confirm / lapse-and-retry)        │
//! │  - fast path    (try-promote-direct-or-enqueue, one lock)         │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        │ events                                           ▲
//!        ▼                                                  │ ticks
//! ┌──────────────────┐    ┌───────────────┐        ┌────────┴────────┐
//! │  Bus (broadcast) │───►│ SubscriberSet │        │     Sweeper     │
//! └──────────────────┘    │ (fan-out)     │        │ (reconciliation)│
//!                         └───────────────┘        └─────────────────┘
//! ```
//!
//! ### Turn lifecycle
//! ```text
//! join ──► Waiting ──► (ready-check?) ──► Confirmed ──► Active ──► Completed
//!   │          │                                          ▲
//!   │          └── stale heartbeat / lapse ──► Skipped    │
//!   └───────────── speak on empty queue ─────────────────-┘  (fast path)
//!
//! Turn ends when: message limit reached │ char budget spent │ time budget
//! elapsed │ explicit end │ violation │ office closes. Every end chains a
//! promotion attempt so the queue keeps draining.
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                      |
//! |-----------------|----------------------------------------------------------|-----------------------------------------|
//! | **Arbitration** | Queue→turn promotion under per-member serialization.     | [`Arbiter`], [`Turn`], [`TurnBudget`]   |
//! | **Queueing**    | FIFO waiting lists with liveness and ready-checks.       | [`QueueEntry`], [`EntryStatus`]         |
//! | **Handling**    | Sanitize/moderate/generate composition around the core.  | [`ConversationHandler`]                 |
//! | **Sweeping**    | Periodic reconciliation independent of client traffic.   | [`Sweeper`], [`SweepReport`]            |
//! | **Events**      | Broadcast bus + non-blocking subscriber fan-out.         | [`events::Event`], [`Subscribe`]        |
//! | **Schedules**   | Pure availability-window evaluation.                     | [`AvailabilityWindow`], [`Member`]      |
//! | **Errors**      | Typed rejections vs. invariant faults.                   | [`ArbiterError`], [`Fault`]             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use podium::{Arbiter, AvailabilityWindow, Config, Directory, Member};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let directory = Arc::new(Directory::new(vec![Member {
//!         id: "mayor".into(),
//!         name: "The Mayor".into(),
//!         avatar: None,
//!         persona: "Warm, civic-minded host.".into(),
//!         // Open every day, all day.
//!         schedule: (0..7)
//!             .map(|d| AvailabilityWindow { day_of_week: d, start_hour: 0, end_hour: 0 })
//!             .collect(),
//!     }]));
//!
//!     let arbiter = Arbiter::new(directory, Config::default());
//!     let receipt = arbiter.join_queue("mayor", "cit-1", "Ada", None).await.unwrap();
//!     assert_eq!(receipt.position, 0);
//! }
//! ```

mod arbiter;
mod collab;
mod config;
mod error;
mod handler;
mod members;
mod queue;
mod schedule;
mod throttle;
mod transcript;
mod turns;

pub mod events;
pub mod subscribers;

// ---- Public re-exports ----

pub use arbiter::{Arbiter, HeartbeatTick, JoinReceipt, MessageReceipt, SpeakAdmission, SweepReport, Sweeper};
pub use collab::{
    BanStatus, GenerateReply, LengthSanitizer, MemoryViolationLog, Moderate, ReplyError, Sanitize,
    SanitizeOutcome, Verdict, ViolationRecord, ViolationSink,
};
pub use config::Config;
pub use error::{ArbiterError, Fault, HandlerError};
pub use handler::{ConversationHandler, MessageOutcome, SpeakOutcome};
pub use members::{Directory, Member};
pub use queue::{EntryStatus, QueueEntry, QueueStore};
pub use schedule::{is_online, AvailabilityWindow};
pub use subscribers::{Subscribe, SubscriberSet};
pub use throttle::{Throttle, ThrottleDecision};
pub use transcript::{ChatMessage, Role, Transcript};
pub use turns::{EndReason, Turn, TurnBudget, TurnStatus};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
