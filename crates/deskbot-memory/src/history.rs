//! Classifier conversation history, one append-only sequence per conversation.
//!
//! Retention is explicit: `max_messages` caps each conversation (oldest
//! entries dropped first); `0` keeps everything for the life of the process.

use deskbot_core::message::HistoryEntry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct HistoryStore {
    conversations: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    max_messages: usize,
}

impl HistoryStore {
    /// Create a store. `max_messages == 0` means unbounded.
    pub fn new(max_messages: usize) -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            max_messages,
        }
    }

    fn conversations(&self) -> MutexGuard<'_, HashMap<String, Vec<HistoryEntry>>> {
        self.conversations.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an entry and return a snapshot of the conversation afterwards.
    pub fn append(&self, conversation_id: &str, entry: HistoryEntry) -> Vec<HistoryEntry> {
        let mut conversations = self.conversations();
        let history = conversations
            .entry(conversation_id.to_string())
            .or_default();
        history.push(entry);
        if self.max_messages > 0 && history.len() > self.max_messages {
            let excess = history.len() - self.max_messages;
            history.drain(..excess);
        }
        history.clone()
    }

    /// Current contents of a conversation (oldest first).
    pub fn snapshot(&self, conversation_id: &str) -> Vec<HistoryEntry> {
        self.conversations()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of conversations seen.
    pub fn conversation_count(&self) -> usize {
        self.conversations().len()
    }
}
