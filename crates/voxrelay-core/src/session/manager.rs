//! Session manager: the single owner of the in-memory conversation table.
//!
//! All reads and writes of conversation history go through this type;
//! handlers never touch the table directly. Individual operations are
//! atomic (DashMap shard locking), and whole chat turns are serialized
//! per session via [`SessionManager::turn_lock`]. Operations on different
//! session ids proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use voxrelay_types::message::{Message, MessageRole, SessionSummary};

/// Maximum retained message count per session. On overflow the oldest
/// messages are evicted first, keeping the most recent N.
pub const MAX_HISTORY_MESSAGES: usize = 100;

/// Session id used when a request omits one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Preview length (in code points) for session listings.
const PREVIEW_CHARS: usize = 100;

/// Owns the in-memory mapping from session id to message history.
pub struct SessionManager {
    conversations: DashMap<String, Vec<Message>>,
    /// One mutex per session, serializing whole chat turns. Kept separate
    /// from the conversation table so the table is never locked across
    /// model I/O.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
    cap: usize,
}

impl SessionManager {
    /// Create an empty manager with the default history cap.
    pub fn new() -> Self {
        Self::with_cap(MAX_HISTORY_MESSAGES)
    }

    /// Create an empty manager with a custom history cap.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            turn_locks: DashMap::new(),
            cap,
        }
    }

    /// Create a manager seeded from a loaded snapshot.
    ///
    /// Histories longer than the cap (e.g. written by an older build with
    /// a larger cap) are truncated to the most recent entries on load.
    pub fn from_conversations(conversations: HashMap<String, Vec<Message>>) -> Self {
        let manager = Self::new();
        for (session_id, mut history) in conversations {
            if history.len() > manager.cap {
                let excess = history.len() - manager.cap;
                history.drain(..excess);
            }
            manager.conversations.insert(session_id, history);
        }
        manager
    }

    /// Return the session's history, creating an empty session if absent.
    pub fn get_or_create(&self, session_id: &str) -> Vec<Message> {
        self.conversations
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Return the session's history, or `None` if the session was never
    /// created. Unknown ids are not materialized.
    pub fn get(&self, session_id: &str) -> Option<Vec<Message>> {
        self.conversations.get(session_id).map(|h| h.clone())
    }

    /// Append a message, evicting the oldest entries once the cap is
    /// exceeded.
    pub fn append(&self, session_id: &str, message: Message) {
        let mut history = self.conversations.entry(session_id.to_string()).or_default();
        history.push(message);
        if history.len() > self.cap {
            let excess = history.len() - self.cap;
            history.drain(..excess);
        }
    }

    /// Replace the session's history with an empty sequence, keeping the
    /// key. No-op when the session does not exist.
    pub fn clear(&self, session_id: &str) {
        if let Some(mut history) = self.conversations.get_mut(session_id) {
            history.clear();
        }
    }

    /// Remove the session entirely. No-op success when absent.
    pub fn delete(&self, session_id: &str) {
        self.conversations.remove(session_id);
        self.turn_locks.remove(session_id);
    }

    /// List all non-empty sessions, sorted by session id.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .conversations
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| SessionSummary {
                session_id: entry.key().clone(),
                message_count: entry.value().len(),
                preview: preview(entry.value()),
            })
            .collect();
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        summaries
    }

    /// Number of messages in a session (0 when absent).
    pub fn message_count(&self, session_id: &str) -> usize {
        self.conversations
            .get(session_id)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Total number of session keys, including cleared-empty ones.
    pub fn session_count(&self) -> usize {
        self.conversations.len()
    }

    /// Snapshot the full table for persistence.
    pub fn export(&self) -> HashMap<String, Vec<Message>> {
        self.conversations
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// The turn lock for a session. Holding it serializes chat exchanges
    /// on that session; it must not be confused with the table's own
    /// shard locks, which are only held for single operations.
    pub fn turn_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// First user message truncated to [`PREVIEW_CHARS`] code points, with a
/// `...` marker when truncated.
fn preview(history: &[Message]) -> String {
    history
        .iter()
        .find(|m| m.role == MessageRole::User)
        .map(|m| {
            let mut p: String = m.content.chars().take(PREVIEW_CHARS).collect();
            if m.content.chars().count() > PREVIEW_CHARS {
                p.push_str("...");
            }
            p
        })
        .unwrap_or_default()
}
