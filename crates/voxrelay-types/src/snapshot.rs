//! The persisted history snapshot.
//!
//! The entire conversation table is persisted as a single JSON document:
//!
//! ```json
//! {
//!   "last_saved": "2026-08-23T12:00:00Z",
//!   "conversations": { "default": [{"role": "user", "content": "..."}] }
//! }
//! ```
//!
//! The file is overwritten wholesale after every mutating operation and
//! once more at orderly shutdown. There is no incremental log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Full on-disk representation of all sessions at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// When this snapshot was written (ISO-8601).
    pub last_saved: DateTime<Utc>,
    /// All conversations, keyed by session id.
    pub conversations: HashMap<String, Vec<Message>>,
}

impl HistorySnapshot {
    /// Create a snapshot of the given conversations, stamped with the
    /// current time.
    pub fn now(conversations: HashMap<String, Vec<Message>>) -> Self {
        Self {
            last_saved: Utc::now(),
            conversations,
        }
    }
}
