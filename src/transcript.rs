//! # In-memory conversation transcripts.
//!
//! Each member keeps a bounded transcript of recent messages. It exists for
//! one consumer: the reply generator, which receives a capped snapshot
//! (newest messages first when capping, handed over oldest-first). Durable
//! message storage belongs to the external persistence collaborator.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Council,
}

/// One message of a member's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub member_id: String,
    pub role: Role,
    /// Set for citizen messages only.
    pub citizen_id: Option<String>,
    pub citizen_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn citizen(
        member_id: &str,
        citizen_id: &str,
        citizen_name: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id: member_id.to_string(),
            role: Role::Citizen,
            citizen_id: Some(citizen_id.to_string()),
            citizen_name: Some(citizen_name.to_string()),
            content: content.to_string(),
            created_at: now,
        }
    }

    pub fn council(member_id: &str, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id: member_id.to_string(),
            role: Role::Council,
            citizen_id: None,
            citizen_name: None,
            content: content.to_string(),
            created_at: now,
        }
    }
}

/// Bounded message ring for one member.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Transcript {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a message, evicting the oldest past capacity.
    pub fn push(&mut self, message: ChatMessage) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Snapshot for the reply generator: walks from the newest message until
    /// either cap is hit, then returns the kept messages oldest-first.
    pub fn capped_history(&self, max_messages: usize, max_chars: usize) -> Vec<ChatMessage> {
        let mut total_chars = 0usize;
        let mut kept: Vec<ChatMessage> = self
            .messages
            .iter()
            .rev()
            .take(max_messages)
            .take_while(|m| {
                if total_chars >= max_chars {
                    return false;
                }
                total_chars += m.content.chars().count();
                true
            })
            .cloned()
            .collect();
        kept.reverse();
        kept
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> ChatMessage {
        ChatMessage::citizen("m", "c", "C", content, Utc::now())
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut t = Transcript::new(2);
        t.push(msg("one"));
        t.push(msg("two"));
        t.push(msg("three"));
        assert_eq!(t.len(), 2);
        let history = t.capped_history(10, 1000);
        assert_eq!(history[0].content, "two");
        assert_eq!(history[1].content, "three");
    }

    #[test]
    fn test_capped_history_message_limit() {
        let mut t = Transcript::new(10);
        for i in 0..5 {
            t.push(msg(&format!("m{i}")));
        }
        let history = t.capped_history(3, 1000);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "m2");
        assert_eq!(history[2].content, "m4");
    }

    #[test]
    fn test_capped_history_char_limit() {
        let mut t = Transcript::new(10);
        t.push(msg("aaaa"));
        t.push(msg("bbbb"));
        t.push(msg("cccc"));
        // First kept message ("cccc") crosses the cap; nothing older fits.
        let history = t.capped_history(10, 4);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "cccc");
    }
}
