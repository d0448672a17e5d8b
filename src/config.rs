//! # Global runtime configuration.
//!
//! [`Config`] defines the arbiter's behavior: turn budgets, ready-check and
//! liveness thresholds, the sweep cadence, transcript caps, and the event-bus
//! capacity. Budgets and thresholds are read-only configuration — the only
//! mutable shared state in the crate is the per-member queue/turn records.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use podium::{Config, TurnBudget};
//!
//! let mut cfg = Config::default();
//! cfg.turn_budget = TurnBudget::chat();
//! cfg.sweep_period = Duration::from_secs(10);
//!
//! assert_eq!(cfg.turn_budget.message_limit, 2);
//! ```

use std::time::Duration;

use crate::turns::TurnBudget;

/// Global configuration for the arbiter, handler, and sweep.
#[derive(Clone, Debug)]
pub struct Config {
    /// Budget granted to every promoted or fast-path turn.
    pub turn_budget: TurnBudget,
    /// How long a citizen has to answer a ready-check.
    pub ready_check_timeout: Duration,
    /// Citizens who joined less than this long ago are promoted without a
    /// ready-check.
    pub auto_confirm_threshold: Duration,
    /// A queue entry whose last heartbeat is older than this is evicted.
    pub heartbeat_stale_after: Duration,
    /// An entry that never heartbeated is evicted once it has been queued
    /// longer than this.
    pub heartbeat_grace: Duration,
    /// Interval clients are told to heartbeat at.
    pub heartbeat_interval: Duration,
    /// Period of the reconciliation sweep.
    pub sweep_period: Duration,
    /// Terminal queue entries are kept for audit this long before the sweep
    /// prunes them.
    pub audit_retention: Duration,
    /// Per-citizen cooldown between accepted messages.
    pub message_cooldown: Duration,
    /// Maximum messages handed to the reply generator as history.
    pub history_max_messages: usize,
    /// Maximum total characters of history handed to the reply generator.
    pub history_max_chars: usize,
    /// Messages retained in a member's in-memory transcript.
    pub transcript_capacity: usize,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides the canonical defaults:
    /// - `turn_budget = TurnBudget::speak()` (256 chars / 1 message / 10s)
    /// - `ready_check_timeout = 30s`
    /// - `auto_confirm_threshold = 2min`
    /// - `heartbeat_stale_after = 3min`, `heartbeat_grace = 60s`
    /// - `heartbeat_interval = 10s`
    /// - `sweep_period = 20s`
    /// - `audit_retention = 10min`
    /// - `message_cooldown = 5s`
    /// - `history_max_messages = 20`, `history_max_chars = 8000`
    /// - `transcript_capacity = 200`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            turn_budget: TurnBudget::speak(),
            ready_check_timeout: Duration::from_secs(30),
            auto_confirm_threshold: Duration::from_secs(120),
            heartbeat_stale_after: Duration::from_secs(180),
            heartbeat_grace: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(10),
            sweep_period: Duration::from_secs(20),
            audit_retention: Duration::from_secs(600),
            message_cooldown: Duration::from_secs(5),
            history_max_messages: 20,
            history_max_chars: 8_000,
            transcript_capacity: 200,
            bus_capacity: 1024,
        }
    }
}
