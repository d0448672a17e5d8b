//! # Member directory.
//!
//! Members are the scheduled hosts citizens queue for: immutable
//! configuration, loaded once at startup and never created or destroyed at
//! runtime. The [`Directory`] is the lookup the arbiter keys all of its
//! per-member state by.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::{self, AvailabilityWindow};

/// A scheduled conversational host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Stable identifier, referenced by every queue/turn record.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar reference handed through to spectators.
    pub avatar: Option<String>,
    /// Persona text consumed by the reply generator.
    pub persona: String,
    /// Availability windows; empty means never online.
    pub schedule: Vec<AvailabilityWindow>,
}

impl Member {
    /// True iff the member's schedule has them available at `now`.
    pub fn is_online(&self, now: DateTime<Utc>) -> bool {
        schedule::is_online(&self.schedule, now)
    }
}

/// Immutable lookup of members by id.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    members: HashMap<String, Arc<Member>>,
}

impl Directory {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members: members
                .into_iter()
                .map(|m| (m.id.clone(), Arc::new(m)))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Member>> {
        self.members.get(id)
    }

    /// Iterates all members (sweep order is unspecified).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Member>> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
