//! In-memory session table with per-session write discipline.

mod manager;

pub use manager::{DEFAULT_SESSION_ID, MAX_HISTORY_MESSAGES, SessionManager};
