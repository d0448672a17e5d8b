//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] renders events through `tracing` in a compact one-line
//! format. Enabled via the `logging` feature; primarily useful for
//! development and examples — implement a custom
//! [`Subscribe`](super::Subscribe) for real notifier integrations.
//!
//! ## Output format
//! ```text
//! [turn-started] member=mayor citizen=cit-1 queue=2
//! [turn-ended] member=mayor ended=6e2c… next=none queue=1
//! [queue-updated] member=mayor queue=3
//! [ready-check] member=mayor citizen=cit-9 expires_at=…
//! [member-online] member=mayor
//! ```

use async_trait::async_trait;
use tracing::info;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Tracing-backed event logger (demo/reference only).
#[derive(Debug, Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TurnStarted => {
                let citizen = e.turn.as_ref().map(|t| t.citizen_id.as_str()).unwrap_or("?");
                info!(
                    "[turn-started] member={} citizen={} queue={:?}",
                    e.member, citizen, e.queue_length
                );
            }
            EventKind::TurnEnded => {
                let next = e
                    .turn
                    .as_ref()
                    .map(|t| t.citizen_id.as_str())
                    .unwrap_or("none");
                info!(
                    "[turn-ended] member={} ended={:?} next={} queue={:?}",
                    e.member, e.ended_turn_id, next, e.queue_length
                );
            }
            EventKind::QueueUpdated => {
                info!("[queue-updated] member={} queue={:?}", e.member, e.queue_length);
            }
            EventKind::ReadyCheck => {
                info!(
                    "[ready-check] member={} citizen={:?} expires_at={:?}",
                    e.member, e.citizen, e.expires_at
                );
            }
            EventKind::MemberOnline => {
                info!("[member-online] member={}", e.member);
            }
            EventKind::MemberOffline => {
                info!("[member-offline] member={}", e.member);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
