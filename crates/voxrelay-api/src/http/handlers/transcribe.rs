//! Audio transcription endpoint.
//!
//! POST /api/transcribe -- body `{"audio": "<base64>"}`, response
//! `{"text": "<transcript>"}`.

use axum::extract::State;
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use voxrelay_core::stt::SpeechToText;
use voxrelay_types::error::TranscribeError;

use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub audio: Option<String>,
}

/// POST /api/transcribe -- decode the base64 payload and run it through
/// the speech-to-text engine.
pub async fn transcribe_audio(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<TranscribeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let encoded = body.audio.ok_or(ApiError::MissingAudio)?;

    let audio = base64::engine::general_purpose::STANDARD
        .decode(&encoded)
        .map_err(|e| TranscribeError::InvalidAudio(format!("invalid base64 audio: {e}")))?;

    let text = state.transcriber.transcribe(&audio).await?;
    Ok(Json(json!({ "text": text })))
}
