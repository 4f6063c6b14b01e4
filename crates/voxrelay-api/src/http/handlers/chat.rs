//! Chat endpoints: blocking and SSE streaming.
//!
//! POST /api/chat -- full exchange, returns `{"response": "..."}`.
//! POST /api/chat/stream -- Server-Sent Events, each `data:` payload is
//! one of `{"chunk": "..."}`, `{"done": true}` or `{"error": "..."}`.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use voxrelay_core::engine::TurnEvent;
use voxrelay_core::session::DEFAULT_SESSION_ID;

use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::state::AppState;

/// Request body for both chat endpoints. `message` is validated by hand
/// so its absence maps to the fixed "No message provided" error.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
}

impl ChatRequest {
    fn into_parts(self) -> Result<(String, String), ApiError> {
        let message = self.message.ok_or(ApiError::MissingMessage)?;
        let session_id = self
            .session_id
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
        Ok((session_id, message))
    }
}

/// POST /api/chat -- run one exchange and return the full reply.
pub async fn chat(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (session_id, message) = body.into_parts()?;
    let response = state.engine.chat(&session_id, &message).await?;
    Ok(Json(json!({ "response": response })))
}

/// POST /api/chat/stream -- run one exchange, streaming chunks as SSE.
///
/// Validation failures surface as a plain 400 before any event is sent;
/// failures after the stream has started arrive as a terminal
/// `{"error": ...}` event on the open stream.
pub async fn stream_chat(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (session_id, message) = body.into_parts()?;

    let sse_stream = state.engine.chat_stream(session_id, message).map(|event| {
        let data = match event {
            TurnEvent::Chunk(text) => json!({ "chunk": text }),
            TurnEvent::Done => json!({ "done": true }),
            TurnEvent::Error(message) => json!({ "error": message }),
        };
        Ok(Event::default().data(data.to_string()))
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
