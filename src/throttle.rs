//! # Per-citizen message cooldown.
//!
//! A citizen may land one accepted message per cooldown period, across all
//! members. Tracked in memory; the map is pruned opportunistically on each
//! check so it does not grow with one entry per citizen forever.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    /// Denied; retry after `wait`.
    Denied { wait: Duration },
}

/// In-memory cooldown tracker.
pub struct Throttle {
    last_sent: Mutex<HashMap<String, DateTime<Utc>>>,
    cooldown: Duration,
}

impl Throttle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_sent: Mutex::new(HashMap::new()),
            cooldown,
        }
    }

    /// Checks whether the citizen may send at `now`.
    pub async fn check(&self, citizen_id: &str, now: DateTime<Utc>) -> ThrottleDecision {
        let cooldown = match chrono::Duration::from_std(self.cooldown) {
            Ok(d) => d,
            Err(_) => return ThrottleDecision::Allowed,
        };
        let mut last_sent = self.last_sent.lock().await;
        last_sent.retain(|_, at| now - *at < cooldown);
        match last_sent.get(citizen_id) {
            Some(at) => {
                let wait = (*at + cooldown) - now;
                ThrottleDecision::Denied {
                    wait: wait.to_std().unwrap_or(Duration::ZERO),
                }
            }
            None => ThrottleDecision::Allowed,
        }
    }

    /// Records an accepted message at `now`.
    pub async fn record_sent(&self, citizen_id: &str, now: DateTime<Utc>) {
        self.last_sent
            .lock()
            .await
            .insert(citizen_id.to_string(), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_cooldown_round_trip() {
        let throttle = Throttle::new(Duration::from_secs(5));
        assert_eq!(throttle.check("c", t0()).await, ThrottleDecision::Allowed);

        throttle.record_sent("c", t0()).await;
        match throttle.check("c", t0() + chrono::Duration::seconds(2)).await {
            ThrottleDecision::Denied { wait } => assert_eq!(wait, Duration::from_secs(3)),
            other => panic!("unexpected: {other:?}"),
        }

        assert_eq!(
            throttle.check("c", t0() + chrono::Duration::seconds(5)).await,
            ThrottleDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_citizens_do_not_share_cooldowns() {
        let throttle = Throttle::new(Duration::from_secs(5));
        throttle.record_sent("a", t0()).await;
        assert_eq!(
            throttle.check("b", t0() + chrono::Duration::seconds(1)).await,
            ThrottleDecision::Allowed
        );
    }
}
