//! WhisperCliTranscriber -- [`SpeechToText`] backed by a whisper CLI.
//!
//! Writes the audio bytes to a scoped temp file, invokes the configured
//! whisper binary against it, and returns the trimmed stdout as the
//! transcript. The temp file is removed when the guard drops, on every
//! exit path including errors.

use tokio::process::Command;

use voxrelay_core::stt::SpeechToText;
use voxrelay_types::error::TranscribeError;

/// Speech-to-text via an external whisper executable.
pub struct WhisperCliTranscriber {
    binary: String,
    model: String,
}

impl WhisperCliTranscriber {
    pub fn new(binary: String, model: String) -> Self {
        Self { binary, model }
    }
}

impl SpeechToText for WhisperCliTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError> {
        if audio.is_empty() {
            return Err(TranscribeError::InvalidAudio(
                "empty audio payload".to_string(),
            ));
        }

        let tmp = tempfile::Builder::new()
            .prefix("voxrelay-audio-")
            .suffix(".webm")
            .tempfile()
            .map_err(|e| TranscribeError::Io(e.to_string()))?;

        tokio::fs::write(tmp.path(), audio)
            .await
            .map_err(|e| TranscribeError::Io(e.to_string()))?;

        let output = Command::new(&self.binary)
            .arg("--model")
            .arg(&self.model)
            .arg(tmp.path())
            .output()
            .await
            .map_err(|e| {
                TranscribeError::Io(format!("failed to run {}: {e}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::Engine(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(chars = transcript.len(), "transcription completed");
        Ok(transcript)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_audio_is_invalid() {
        let t = WhisperCliTranscriber::new("whisper".to_string(), "base".to_string());
        let err = t.transcribe(&[]).await.unwrap_err();
        assert!(matches!(err, TranscribeError::InvalidAudio(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_trimmed_transcript() {
        // `echo` stands in for the whisper binary: it prints its arguments
        // followed by a newline, which the transcriber must trim.
        let t = WhisperCliTranscriber::new("echo".to_string(), "base".to_string());
        let transcript = t.transcribe(b"fake-audio-bytes").await.unwrap();
        assert!(transcript.starts_with("--model base"));
        assert!(transcript.ends_with(".webm"));
        assert!(!transcript.ends_with('\n'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let t = WhisperCliTranscriber::new(
            "/nonexistent/voxrelay-no-such-binary".to_string(),
            "base".to_string(),
        );
        let err = t.transcribe(b"fake-audio-bytes").await.unwrap_err();
        assert!(matches!(err, TranscribeError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_engine_error() {
        let t = WhisperCliTranscriber::new("false".to_string(), "base".to_string());
        let err = t.transcribe(b"fake-audio-bytes").await.unwrap_err();
        assert!(matches!(err, TranscribeError::Engine(_)));
    }

    #[test]
    fn test_model_name() {
        let t = WhisperCliTranscriber::new("whisper".to_string(), "small".to_string());
        assert_eq!(t.model_name(), "small");
    }
}
