//! Application error type mapping to HTTP status codes.
//!
//! All error responses use the flat body `{"error": "<message>"}`.
//! Client mistakes (missing fields, undecodable audio) map to 400, an
//! unknown session to 404, everything else to 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use voxrelay_types::error::TranscribeError;
use voxrelay_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Chat request without a `message` field.
    MissingMessage,
    /// Transcribe request without an `audio` field.
    MissingAudio,
    /// Malformed request body.
    InvalidBody(String),
    /// Unknown session id.
    SessionNotFound,
    /// Transcription failure.
    Transcribe(TranscribeError),
    /// Model call failure.
    Llm(LlmError),
}

impl From<TranscribeError> for ApiError {
    fn from(e: TranscribeError) -> Self {
        ApiError::Transcribe(e)
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        ApiError::Llm(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingMessage => {
                (StatusCode::BAD_REQUEST, "No message provided".to_string())
            }
            ApiError::MissingAudio => (
                StatusCode::BAD_REQUEST,
                "No audio data provided".to_string(),
            ),
            ApiError::InvalidBody(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::SessionNotFound => {
                (StatusCode::NOT_FOUND, "Session not found".to_string())
            }
            ApiError::Transcribe(TranscribeError::InvalidAudio(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Transcribe(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Llm(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
