//! Application state wiring the engine and its collaborators.
//!
//! The engine is generic over store and provider traits, but AppState pins
//! it to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

use voxrelay_core::engine::ConversationEngine;
use voxrelay_core::history::HistoryStore;
use voxrelay_core::session::SessionManager;
use voxrelay_infra::config::ServerConfig;
use voxrelay_infra::history::JsonHistoryStore;
use voxrelay_infra::llm::AnthropicProvider;
use voxrelay_infra::stt::WhisperCliTranscriber;

/// Concrete engine type pinned to the infra implementations.
pub type ConcreteEngine = ConversationEngine<JsonHistoryStore, AnthropicProvider>;

/// Shared application state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConcreteEngine>,
    pub sessions: Arc<SessionManager>,
    pub transcriber: Arc<WhisperCliTranscriber>,
    pub static_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load the persisted history and
    /// wire the engine.
    pub async fn init(config: &ServerConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let store = Arc::new(JsonHistoryStore::new(config.history_path()));
        let conversations = store.load().await;
        let sessions = Arc::new(SessionManager::from_conversations(conversations));

        // An absent key becomes an empty secret: requests then fail with an
        // authentication error instead of preventing startup.
        let api_key = config
            .anthropic_api_key
            .clone()
            .unwrap_or_else(|| SecretString::from(""));
        let provider = Arc::new(AnthropicProvider::new(api_key)?);

        let engine = Arc::new(ConversationEngine::new(
            Arc::clone(&sessions),
            store,
            provider,
            config.claude_model.clone(),
        ));

        let transcriber = Arc::new(WhisperCliTranscriber::new(
            config.whisper_bin.clone(),
            config.whisper_model.clone(),
        ));

        Ok(Self {
            engine,
            sessions,
            transcriber,
            static_dir: config.static_dir.clone(),
        })
    }
}
