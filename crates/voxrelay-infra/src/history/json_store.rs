//! JsonHistoryStore -- whole-snapshot conversation persistence.
//!
//! The durable format is a single pretty-printed JSON file:
//! `{"last_saved": <ISO-8601 UTC>, "conversations": {...}}`. Every save
//! rewrites the whole file through a temp file in the same directory
//! followed by a rename, so readers never observe a torn write.
//! Concurrent saves are serialized by an internal mutex; last write wins.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use tokio::sync::Mutex;

use voxrelay_core::history::HistoryStore;
use voxrelay_types::error::PersistenceError;
use voxrelay_types::message::Message;
use voxrelay_types::snapshot::HistorySnapshot;

/// File-backed [`HistoryStore`] writing a single JSON snapshot.
pub struct JsonHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl HistoryStore for JsonHistoryStore {
    /// Load the snapshot. A missing file is normal first-run state; an
    /// unreadable or malformed file degrades to empty with a warning so a
    /// corrupt snapshot never prevents startup.
    async fn load(&self) -> HashMap<String, Vec<Message>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no history file at {}, starting empty", self.path.display());
                return HashMap::new();
            }
            Err(err) => {
                tracing::warn!(
                    "failed to read {}: {err}, starting empty",
                    self.path.display()
                );
                return HashMap::new();
            }
        };

        match serde_json::from_str::<HistorySnapshot>(&content) {
            Ok(snapshot) => {
                tracing::info!(
                    sessions = snapshot.conversations.len(),
                    "loaded conversation history from {}",
                    self.path.display()
                );
                snapshot.conversations
            }
            Err(err) => {
                tracing::warn!(
                    "failed to parse {}: {err}, starting empty",
                    self.path.display()
                );
                HashMap::new()
            }
        }
    }

    async fn save(
        &self,
        conversations: HashMap<String, Vec<Message>>,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;

        let snapshot = HistorySnapshot::now(conversations);
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let parent = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let mut tmp = tempfile::NamedTempFile::new_in(parent)
                .map_err(|e| PersistenceError::Io(e.to_string()))?;
            tmp.write_all(json.as_bytes())
                .map_err(|e| PersistenceError::Io(e.to_string()))?;
            tmp.persist(&path)
                .map_err(|e| PersistenceError::Io(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| PersistenceError::Io(format!("snapshot write task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use voxrelay_types::message::MessageRole;

    fn store_in(tmp: &TempDir) -> JsonHistoryStore {
        JsonHistoryStore::new(tmp.path().join("conversation_history.json"))
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        tokio::fs::write(store.path(), "{ not valid json !!!")
            .await
            .unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        let mut conversations = HashMap::new();
        conversations.insert(
            "s1".to_string(),
            vec![Message::user("hello"), Message::assistant("hi there")],
        );
        store.save(conversations).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["s1"].len(), 2);
        assert_eq!(loaded["s1"][0].role, MessageRole::User);
        assert_eq!(loaded["s1"][1].content, "hi there");
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        let mut first = HashMap::new();
        first.insert("s1".to_string(), vec![Message::user("one")]);
        store.save(first).await.unwrap();

        let mut second = HashMap::new();
        second.insert("s2".to_string(), vec![Message::user("two")]);
        store.save(second).await.unwrap();

        let loaded = store.load().await;
        assert!(!loaded.contains_key("s1"));
        assert_eq!(loaded["s2"][0].content, "two");
    }

    #[tokio::test]
    async fn test_snapshot_file_has_last_saved_stamp() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.save(HashMap::new()).await.unwrap();

        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["last_saved"].is_string());
        assert!(value["conversations"].is_object());
    }

    #[tokio::test]
    async fn test_save_to_unwritable_dir_returns_io_error() {
        let store = JsonHistoryStore::new(PathBuf::from(
            "/nonexistent-vox-dir/conversation_history.json",
        ));
        let err = store.save(HashMap::new()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
    }
}
