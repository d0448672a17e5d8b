//! Contracts for the external collaborators the handler composes:
//! sanitization, moderation, reply generation, and the violation sink.
//!
//! The subsystem consumes these at their interfaces only — real
//! implementations (LLM clients, databases) live with the embedder. None of
//! them is ever invoked while a per-member lock is held.

mod moderate;
mod reply;
mod sanitize;
mod violations;

pub use moderate::{Moderate, Verdict};
pub use reply::{GenerateReply, ReplyError};
pub use sanitize::{LengthSanitizer, Sanitize, SanitizeOutcome};
pub use violations::{BanStatus, MemoryViolationLog, ViolationRecord, ViolationSink};
