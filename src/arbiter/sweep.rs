//! # Reconciliation sweep.
//!
//! A periodic pass, independent of client traffic, that keeps every member's
//! state honest: expires over-budget turns, closes offices whose schedule
//! window ended, evicts citizens whose liveness heartbeat lapsed, lapses
//! unanswered ready-checks, re-attempts promotion so the queue keeps
//! draining, and prunes the audit tail.
//!
//! Runs under the same per-member mutual exclusion as client traffic, one
//! member at a time. A failure on one member is logged and the pass
//! continues; each pass is independently idempotent — running it twice with
//! no intervening activity produces no additional state change.
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use tokio_util::sync::CancellationToken;
//! # use podium::{Arbiter, Sweeper};
//! # async fn demo(arbiter: Arc<Arbiter>) {
//! let token = CancellationToken::new();
//! let handle = Sweeper::new(arbiter).run(token.clone());
//! // ... later:
//! token.cancel();
//! let _ = handle.await;
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::core::Arbiter;

/// Counters from one member's pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemberSweep {
    pub turns_expired: usize,
    pub offices_closed: usize,
    pub entries_evicted: usize,
    pub entries_pruned: usize,
    pub turns_started: usize,
}

/// Aggregated counters from one full pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Active turns ended because their time budget ran out.
    pub turns_expired: usize,
    /// Members whose office was closed (turn ended and/or queue skipped).
    pub offices_closed: usize,
    /// Queue entries evicted for lapsed heartbeats.
    pub entries_evicted: usize,
    /// Terminal entries pruned past the audit retention.
    pub entries_pruned: usize,
    /// Turns started by post-sweep promotion.
    pub turns_started: usize,
    /// Members whose pass failed (logged and skipped).
    pub failures: usize,
}

impl SweepReport {
    fn absorb(&mut self, m: MemberSweep) {
        self.turns_expired += m.turns_expired;
        self.offices_closed += m.offices_closed;
        self.entries_evicted += m.entries_evicted;
        self.entries_pruned += m.entries_pruned;
        self.turns_started += m.turns_started;
    }

    /// True when the pass changed nothing.
    pub fn is_quiet(&self) -> bool {
        *self == SweepReport::default()
    }
}

/// Periodic reconciliation driver.
pub struct Sweeper {
    arbiter: Arc<Arbiter>,
}

impl Sweeper {
    pub fn new(arbiter: Arc<Arbiter>) -> Self {
        Self { arbiter }
    }

    /// Spawns the sweep loop; it ticks every `Config::sweep_period` until the
    /// token is cancelled.
    pub fn run(self, token: CancellationToken) -> JoinHandle<()> {
        let period = self.arbiter.config().sweep_period;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {
                        let report = self.pass_at(Utc::now()).await;
                        if !report.is_quiet() {
                            debug!(?report, "sweep pass");
                        }
                    }
                }
            }
        })
    }

    /// One full pass over every member at `now`. Exposed for embedders that
    /// drive reconciliation themselves (and for tests).
    pub async fn pass_at(&self, now: DateTime<Utc>) -> SweepReport {
        self.arbiter.sweep_at(now).await
    }
}

impl Arbiter {
    /// One reconciliation pass over all members; logs and continues past any
    /// single member's failure.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let members: Vec<_> = self.directory().iter().cloned().collect();
        for member in members {
            match self.sweep_member_at(&member, now).await {
                Ok(m) => report.absorb(m),
                Err(err) => {
                    report.failures += 1;
                    warn!(member = %member.id, error = %err, "sweep pass failed for member");
                }
            }
        }
        report
    }

    /// [`sweep_at`](Self::sweep_at) stamped with the current wall clock.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }
}
