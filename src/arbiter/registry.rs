//! # Per-member serialized state.
//!
//! All mutable state for one member — queue, active turn, transcript, last
//! observed online flag — lives in one [`MemberState`] behind one mutex. The
//! member set is immutable configuration, so the registry map itself needs no
//! lock: it is built once from the directory and only the per-member mutexes
//! are ever contended.
//!
//! Operations on different members never block each other; contention is
//! bounded to citizens talking to the same member.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::members::Directory;
use crate::queue::QueueStore;
use crate::transcript::Transcript;
use crate::turns::Turn;

/// Mutable state for one member; guarded by the member's mutex.
pub(crate) struct MemberState {
    pub queue: QueueStore,
    /// The at-most-one active turn.
    pub turn: Option<Turn>,
    pub transcript: Transcript,
    /// Last observed schedule state; drives online/offline edge events.
    pub online: bool,
}

impl MemberState {
    fn new(cfg: &Config) -> Self {
        Self {
            queue: QueueStore::new(),
            turn: None,
            transcript: Transcript::new(cfg.transcript_capacity),
            online: false,
        }
    }
}

/// One mutex per member, keyed by member id.
pub(crate) struct Registry {
    states: HashMap<String, Arc<Mutex<MemberState>>>,
}

impl Registry {
    pub fn new(directory: &Directory, cfg: &Config) -> Self {
        Self {
            states: directory
                .iter()
                .map(|m| (m.id.clone(), Arc::new(Mutex::new(MemberState::new(cfg)))))
                .collect(),
        }
    }

    pub fn get(&self, member_id: &str) -> Option<Arc<Mutex<MemberState>>> {
        self.states.get(member_id).cloned()
    }
}
