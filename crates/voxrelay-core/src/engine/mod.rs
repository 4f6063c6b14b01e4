//! Conversation engine orchestrating chat exchanges.
//!
//! Each exchange runs `Idle -> AwaitingModelResponse -> {Completed |
//! Failed}`: append the user message, invoke the model collaborator with
//! the full capped history plus a fixed system instruction, append the
//! assistant message on success, persist after every mutation.
//!
//! Failure policy (at-least-once input): a failed model call does not
//! roll back the user message. A retry resends the full context
//! including the unanswered turn. Streaming failures likewise keep the
//! user message but never append a partial assistant message.
//!
//! Concurrency: the per-session turn lock is held for the whole exchange
//! so that concurrent chats on one session keep their message order; the
//! session table's own locks are only taken for the discrete append/read
//! steps, never across model I/O.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use voxrelay_types::llm::{CompletionRequest, LlmError, StreamEvent};
use voxrelay_types::message::Message;

use crate::history::HistoryStore;
use crate::llm::LlmProvider;
use crate::session::SessionManager;

/// Fixed system instruction sent with every model call.
pub const SYSTEM_PROMPT: &str = "You are a helpful voice assistant. Keep your \
    responses concise and conversational since they will be displayed to a \
    user who just spoke to you. Be friendly, natural, and helpful. Use \
    markdown formatting when appropriate for readability.";

/// Response budget per model call.
const MAX_RESPONSE_TOKENS: u32 = 2048;

/// Events delivered to the consumer of a streaming exchange.
///
/// A successful turn is zero or more `Chunk`s followed by `Done`; a failed
/// turn ends with a single terminal `Error` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Chunk(String),
    Done,
    Error(String),
}

/// Orchestrates chat exchanges against the session table, the model
/// provider, and the history store.
///
/// Generic over [`HistoryStore`] and [`LlmProvider`] so the engine never
/// depends on `voxrelay-infra`; the API layer pins the concrete types.
pub struct ConversationEngine<S, L> {
    sessions: Arc<SessionManager>,
    store: Arc<S>,
    provider: Arc<L>,
    model: String,
}

impl<S, L> ConversationEngine<S, L>
where
    S: HistoryStore + 'static,
    L: LlmProvider + 'static,
{
    pub fn new(sessions: Arc<SessionManager>, store: Arc<S>, provider: Arc<L>, model: String) -> Self {
        Self {
            sessions,
            store,
            provider,
            model,
        }
    }

    /// The session table this engine mediates.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one blocking exchange and return the assistant's reply.
    ///
    /// On model failure the already-appended user message stays in the
    /// history and the error surfaces to the caller.
    pub async fn chat(&self, session_id: &str, user_text: &str) -> Result<String, LlmError> {
        let lock = self.sessions.turn_lock(session_id);
        let _turn = lock.lock().await;

        self.sessions.append(session_id, Message::user(user_text));
        persist(&self.sessions, self.store.as_ref()).await;

        let request = build_request(&self.model, self.sessions.get_or_create(session_id), false);
        let response = self.provider.complete(&request).await?;

        self.sessions
            .append(session_id, Message::assistant(&response.content));
        persist(&self.sessions, self.store.as_ref()).await;

        debug!(session_id, provider = self.provider.name(), "chat exchange completed");
        Ok(response.content)
    }

    /// Run one streaming exchange, yielding chunks as the model produces
    /// them.
    ///
    /// The assistant message is appended and persisted only after the
    /// provider stream is exhausted, followed by a final [`TurnEvent::Done`].
    /// A mid-stream failure yields one terminal [`TurnEvent::Error`] and
    /// appends nothing. If the consumer drops the stream early (client
    /// disconnect), chunks received so far are discarded and the turn lock
    /// releases with the guard.
    pub fn chat_stream(
        &self,
        session_id: String,
        user_text: String,
    ) -> Pin<Box<dyn Stream<Item = TurnEvent> + Send + 'static>> {
        let sessions = Arc::clone(&self.sessions);
        let store = Arc::clone(&self.store);
        let provider = Arc::clone(&self.provider);
        let model = self.model.clone();

        Box::pin(async_stream::stream! {
            let _turn = sessions.turn_lock(&session_id).lock_owned().await;

            sessions.append(&session_id, Message::user(user_text));
            persist(&sessions, store.as_ref()).await;

            let request = build_request(&model, sessions.get_or_create(&session_id), true);
            let mut llm_stream = provider.stream(request);

            let mut full_response = String::new();
            let mut failed = false;

            while let Some(event) = llm_stream.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        full_response.push_str(&text);
                        yield TurnEvent::Chunk(text);
                    }
                    Ok(StreamEvent::Done) => break,
                    Err(err) => {
                        warn!(%session_id, error = %err, "model stream failed mid-turn");
                        failed = true;
                        yield TurnEvent::Error(err.to_string());
                        break;
                    }
                }
            }

            if !failed {
                sessions.append(&session_id, Message::assistant(full_response));
                persist(&sessions, store.as_ref()).await;
                yield TurnEvent::Done;
            }
        })
    }

    /// Clear a session's history (key retained) and persist.
    pub async fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id);
        persist(&self.sessions, self.store.as_ref()).await;
    }

    /// Delete a session entirely and persist. Idempotent.
    pub async fn delete_session(&self, session_id: &str) {
        self.sessions.delete(session_id);
        persist(&self.sessions, self.store.as_ref()).await;
    }

    /// Final persistence flush for the shutdown hook.
    pub async fn flush(&self) {
        persist(&self.sessions, self.store.as_ref()).await;
    }
}

/// Assemble the model request: full capped history plus the fixed system
/// instruction. No windowing beyond the session cap.
fn build_request(model: &str, messages: Vec<Message>, stream: bool) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        messages,
        system: Some(SYSTEM_PROMPT.to_string()),
        max_tokens: MAX_RESPONSE_TOKENS,
        stream,
    }
}

/// Best-effort snapshot save. Failures are logged, never propagated:
/// persistence is advisory durability, not a correctness dependency of
/// the exchange.
async fn persist<S: HistoryStore>(sessions: &SessionManager, store: &S) {
    if let Err(err) = store.save(sessions.export()).await {
        warn!(error = %err, "failed to persist conversation history");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use voxrelay_types::error::PersistenceError;
    use voxrelay_types::llm::CompletionResponse;
    use voxrelay_types::message::MessageRole;

    /// In-memory store recording every save for assertions.
    #[derive(Default)]
    struct MemoryStore {
        saves: AtomicUsize,
        last: Mutex<Option<HashMap<String, Vec<Message>>>>,
    }

    impl HistoryStore for MemoryStore {
        async fn load(&self) -> HashMap<String, Vec<Message>> {
            HashMap::new()
        }

        async fn save(
            &self,
            conversations: HashMap<String, Vec<Message>>,
        ) -> Result<(), PersistenceError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(conversations);
            Ok(())
        }
    }

    /// A store that always fails, to prove persistence errors stay internal.
    struct FailingStore;

    impl HistoryStore for FailingStore {
        async fn load(&self) -> HashMap<String, Vec<Message>> {
            HashMap::new()
        }

        async fn save(
            &self,
            _conversations: HashMap<String, Vec<Message>>,
        ) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io("disk full".to_string()))
        }
    }

    type ScriptedReply = Result<CompletionResponse, LlmError>;
    type ScriptedStream = Vec<Result<StreamEvent, LlmError>>;

    /// Provider replaying scripted replies and streams in order.
    #[derive(Default)]
    struct MockProvider {
        replies: Mutex<VecDeque<ScriptedReply>>,
        streams: Mutex<VecDeque<ScriptedStream>>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        fn with_replies(replies: Vec<ScriptedReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                ..Default::default()
            }
        }

        fn with_streams(streams: Vec<ScriptedStream>) -> Self {
            Self {
                streams: Mutex::new(streams.into_iter().collect()),
                ..Default::default()
            }
        }
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted reply left")
        }

        fn stream(
            &self,
            _request: CompletionRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
            let script = self
                .streams
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted stream left");
            Box::pin(futures_util::stream::iter(script))
        }
    }

    fn reply(text: &str) -> ScriptedReply {
        Ok(CompletionResponse {
            content: text.to_string(),
            model: "mock-model".to_string(),
        })
    }

    fn engine_with(
        provider: MockProvider,
    ) -> (ConversationEngine<MemoryStore, MockProvider>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let engine = ConversationEngine::new(
            Arc::new(SessionManager::new()),
            Arc::clone(&store),
            Arc::new(provider),
            "mock-model".to_string(),
        );
        (engine, store)
    }

    #[tokio::test]
    async fn test_chat_appends_user_and_assistant() {
        let (engine, store) = engine_with(MockProvider::with_replies(vec![reply("hi there")]));

        let response = engine.chat("s1", "hello").await.unwrap();
        assert_eq!(response, "hi there");

        let history = engine.sessions().get("s1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "hi there");

        // Persisted after the user append and after the assistant append.
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
        let saved = store.last.lock().unwrap().clone().unwrap();
        assert_eq!(saved["s1"].len(), 2);
    }

    #[tokio::test]
    async fn test_chat_failure_keeps_user_message() {
        let (engine, _store) = engine_with(MockProvider::with_replies(vec![Err(
            LlmError::Provider {
                message: "overloaded".to_string(),
            },
        )]));

        let err = engine.chat("s1", "hello").await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));

        let history = engine.sessions().get("s1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_chat_survives_persistence_failure() {
        let engine = ConversationEngine::new(
            Arc::new(SessionManager::new()),
            Arc::new(FailingStore),
            Arc::new(MockProvider::with_replies(vec![reply("still works")])),
            "mock-model".to_string(),
        );

        let response = engine.chat("s1", "hello").await.unwrap();
        assert_eq!(response, "still works");
        assert_eq!(engine.sessions().message_count("s1"), 2);
    }

    #[tokio::test]
    async fn test_chat_stream_accumulates_and_persists_after_exhaustion() {
        let (engine, store) = engine_with(MockProvider::with_streams(vec![vec![
            Ok(StreamEvent::TextDelta {
                text: "Hel".to_string(),
            }),
            Ok(StreamEvent::TextDelta {
                text: "lo!".to_string(),
            }),
            Ok(StreamEvent::Done),
        ]]));

        let events: Vec<TurnEvent> = engine
            .chat_stream("s1".to_string(), "hello".to_string())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                TurnEvent::Chunk("Hel".to_string()),
                TurnEvent::Chunk("lo!".to_string()),
                TurnEvent::Done,
            ]
        );

        let history = engine.sessions().get("s1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Hello!");
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chat_stream_failure_after_two_chunks() {
        let (engine, store) = engine_with(MockProvider::with_streams(vec![vec![
            Ok(StreamEvent::TextDelta {
                text: "a".to_string(),
            }),
            Ok(StreamEvent::TextDelta {
                text: "b".to_string(),
            }),
            Err(LlmError::Stream("connection reset".to_string())),
        ]]));

        let events: Vec<TurnEvent> = engine
            .chat_stream("s1".to_string(), "hello".to_string())
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], TurnEvent::Chunk("a".to_string()));
        assert_eq!(events[1], TurnEvent::Chunk("b".to_string()));
        assert!(matches!(&events[2], TurnEvent::Error(msg) if msg.contains("connection reset")));

        // User message retained, no partial assistant message.
        let history = engine.sessions().get("s1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, MessageRole::User);

        // Only the user-append save happened.
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chat_stream_dropped_early_discards_chunks() {
        let (engine, _store) = engine_with(MockProvider::with_streams(vec![vec![
            Ok(StreamEvent::TextDelta {
                text: "a".to_string(),
            }),
            Ok(StreamEvent::TextDelta {
                text: "b".to_string(),
            }),
            Ok(StreamEvent::Done),
        ]]));

        let mut stream = engine.chat_stream("s1".to_string(), "hello".to_string());
        let first = stream.next().await;
        assert_eq!(first, Some(TurnEvent::Chunk("a".to_string())));
        drop(stream);

        // The user message stays; no assistant message was appended.
        let history = engine.sessions().get("s1").unwrap();
        assert_eq!(history.len(), 1);

        // The turn lock was released by the drop.
        let lock = engine.sessions().turn_lock("s1");
        assert!(lock.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_chats_on_same_session_keep_order() {
        let provider = MockProvider {
            replies: Mutex::new(
                vec![reply("first answer"), reply("second answer")]
                    .into_iter()
                    .collect(),
            ),
            streams: Mutex::new(VecDeque::new()),
            delay: Some(Duration::from_millis(10)),
        };
        let (engine, _store) = engine_with(provider);

        let (r1, r2) = tokio::join!(
            engine.chat("s1", "first question"),
            engine.chat("s1", "second question"),
        );
        r1.unwrap();
        r2.unwrap();

        let history = engine.sessions().get("s1").unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "first question",
                "first answer",
                "second question",
                "second answer"
            ]
        );
        let roles: Vec<MessageRole> = history.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn test_context_includes_prior_turns_and_system_prompt() {
        let (engine, _store) = engine_with(MockProvider::with_replies(vec![
            reply("one"),
            reply("two"),
        ]));

        engine.chat("s1", "q1").await.unwrap();
        engine.chat("s1", "q2").await.unwrap();

        // Second request context: q1, one, q2
        let request = build_request("m", engine.sessions().get("s1").unwrap(), false);
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.system.as_deref(), Some(SYSTEM_PROMPT));
        assert_eq!(request.max_tokens, 2048);
    }

    #[tokio::test]
    async fn test_clear_and_delete_persist() {
        let (engine, store) = engine_with(MockProvider::with_replies(vec![reply("hi")]));
        engine.chat("s1", "hello").await.unwrap();

        engine.clear_session("s1").await;
        let saved = store.last.lock().unwrap().clone().unwrap();
        assert!(saved["s1"].is_empty());

        engine.delete_session("s1").await;
        let saved = store.last.lock().unwrap().clone().unwrap();
        assert!(!saved.contains_key("s1"));
    }

    #[tokio::test]
    async fn test_empty_stream_appends_empty_assistant_message() {
        let (engine, _store) = engine_with(MockProvider::with_streams(vec![vec![Ok(
            StreamEvent::Done,
        )]]));

        let events: Vec<TurnEvent> = engine
            .chat_stream("s1".to_string(), "hello".to_string())
            .collect()
            .await;
        assert_eq!(events, vec![TurnEvent::Done]);

        let history = engine.sessions().get("s1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert!(history[1].content.is_empty());
    }
}
