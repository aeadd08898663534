//! Per-user pending confirmations.
//!
//! Each user has at most one slot. The dispatcher never does a separate
//! get-then-clear: [`PendingStore::resolve`] inspects and updates the slot
//! under a single lock, so two concurrent "yes" replies cannot both observe
//! the same pending action.

use deskbot_core::intent::{Entities, Intent};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// An intent awaiting an explicit yes/no.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub intent: Intent,
    pub created_at: Instant,
}

impl PendingAction {
    pub fn entities(&self) -> Entities {
        self.intent.entities()
    }
}

/// How a reply to a pending confirmation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirm,
    Deny,
    Other,
}

impl Reply {
    /// Classify a reply. Only exact `yes`/`y`/`no`/`n` (trimmed, any case) count.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "yes" | "y" => Self::Affirm,
            "no" | "n" => Self::Deny,
            _ => Self::Other,
        }
    }
}

/// Outcome of resolving a reply against a user's slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No pending action; the text is a new command.
    Idle,
    /// The action was taken out of the slot and must now run.
    Confirmed(PendingAction),
    /// The action was dropped without running.
    Cancelled(PendingAction),
    /// The reply was neither yes nor no; the slot is untouched.
    StillPending(PendingAction),
}

/// In-memory pending-action store keyed by user id.
#[derive(Debug, Default)]
pub struct PendingStore {
    slots: Mutex<HashMap<String, PendingAction>>,
    ttl: Option<Duration>,
}

impl PendingStore {
    /// A store whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that discards entries older than `ttl`. `None` = never expire.
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, PendingAction>> {
        // A panic while holding the lock cannot leave a slot half-written:
        // every mutation is a single insert or remove.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, action: &PendingAction) -> bool {
        self.ttl
            .is_some_and(|ttl| action.created_at.elapsed() >= ttl)
    }

    /// Drop the user's entry if it has expired. Caller holds the lock.
    fn evict_expired(&self, slots: &mut HashMap<String, PendingAction>, user_id: &str) {
        if slots.get(user_id).is_some_and(|a| self.is_expired(a)) {
            slots.remove(user_id);
            debug!("pending action for {user_id} expired");
        }
    }

    /// Store a pending action, replacing any existing one for this user.
    pub fn set_pending(&self, user_id: &str, intent: Intent) {
        let action = PendingAction {
            intent,
            created_at: Instant::now(),
        };
        self.slots().insert(user_id.to_string(), action);
    }

    /// The user's pending action, if any (and not expired).
    pub fn get_pending(&self, user_id: &str) -> Option<PendingAction> {
        let mut slots = self.slots();
        self.evict_expired(&mut slots, user_id);
        slots.get(user_id).cloned()
    }

    /// Remove the user's pending action. No-op if absent.
    pub fn clear_pending(&self, user_id: &str) {
        self.slots().remove(user_id);
    }

    /// Atomically interpret `reply` against the user's slot.
    pub fn resolve(&self, user_id: &str, reply: Reply) -> Resolution {
        let mut slots = self.slots();
        self.evict_expired(&mut slots, user_id);

        match reply {
            Reply::Affirm => match slots.remove(user_id) {
                Some(action) => Resolution::Confirmed(action),
                None => Resolution::Idle,
            },
            Reply::Deny => match slots.remove(user_id) {
                Some(action) => Resolution::Cancelled(action),
                None => Resolution::Idle,
            },
            Reply::Other => match slots.get(user_id) {
                Some(action) => Resolution::StillPending(action.clone()),
                None => Resolution::Idle,
            },
        }
    }

    /// Number of users currently awaiting confirmation (expired entries included
    /// until next touched).
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
