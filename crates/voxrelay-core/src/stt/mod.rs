//! Speech-to-text abstraction.
//!
//! The transcription engine is an external collaborator: raw audio bytes
//! in, trimmed text out. Implementations own all temporary-resource
//! handling and must release scratch state on every exit path.

use voxrelay_types::error::TranscribeError;

/// Trait for speech-to-text backends.
///
/// Implementations live in `voxrelay-infra` (e.g., `WhisperCliTranscriber`).
pub trait SpeechToText: Send + Sync {
    /// Transcribe decoded audio bytes to text.
    fn transcribe(
        &self,
        audio: &[u8],
    ) -> impl std::future::Future<Output = Result<String, TranscribeError>> + Send;

    /// The model identifier in use (reported by the health endpoint).
    fn model_name(&self) -> &str;
}
