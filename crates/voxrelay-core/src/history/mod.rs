//! History persistence abstraction.
//!
//! This module defines the `HistoryStore` trait that the infrastructure
//! layer implements for whole-snapshot conversation persistence.

use std::collections::HashMap;

use voxrelay_types::error::PersistenceError;
use voxrelay_types::message::Message;

/// Port for the durable conversation snapshot.
///
/// Implementations live in `voxrelay-infra` (e.g., `JsonHistoryStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Persistence is advisory: `load` never fails (malformed or unreadable
/// state degrades to an empty mapping with a logged warning), and callers
/// of `save` log failures instead of aborting the operation that
/// triggered them.
pub trait HistoryStore: Send + Sync {
    /// Read the persisted snapshot, or an empty mapping when the file is
    /// missing, unreadable, or malformed.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = HashMap<String, Vec<Message>>> + Send;

    /// Overwrite the snapshot with the given conversations, stamped with
    /// the current time. Concurrent saves are serialized internally.
    fn save(
        &self,
        conversations: HashMap<String, Vec<Message>>,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;
}
