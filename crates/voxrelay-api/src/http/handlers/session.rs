//! Session management endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use voxrelay_core::session::DEFAULT_SESSION_ID;

use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    pub session_id: Option<String>,
}

/// POST /api/clear -- empty a session's history, keeping the session key.
pub async fn clear_history(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ClearRequest>,
) -> Json<serde_json::Value> {
    let session_id = body
        .session_id
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    state.engine.clear_session(&session_id).await;
    Json(json!({ "status": "cleared" }))
}

/// GET /api/sessions -- list non-empty sessions with previews.
pub async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "sessions": state.sessions.list() }))
}

/// GET /api/session/{id} -- full message history for one session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let messages = state
        .sessions
        .get(&session_id)
        .ok_or(ApiError::SessionNotFound)?;
    Ok(Json(json!({
        "session_id": session_id,
        "messages": messages,
    })))
}

/// DELETE /api/session/{id} -- remove a session entirely. Idempotent:
/// deleting an unknown session still reports success.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    state.engine.delete_session(&session_id).await;
    Json(json!({ "status": "deleted" }))
}
