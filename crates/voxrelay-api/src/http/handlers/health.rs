//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use voxrelay_core::stt::SpeechToText;

use crate::state::AppState;

/// GET /api/health -- liveness plus the active model configuration.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "whisper_model": state.transcriber.model_name(),
        "claude_model": state.engine.model(),
        "total_sessions": state.sessions.session_count(),
    }))
}
