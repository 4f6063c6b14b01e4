use thiserror::Error;

/// Errors from history snapshot persistence.
///
/// Persistence is best-effort: callers log these and carry on, they are
/// never surfaced as request failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from audio transcription.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The inbound audio payload could not be decoded. Client input error,
    /// not a system fault.
    #[error("invalid audio payload: {0}")]
    InvalidAudio(String),

    /// The speech-to-text engine failed.
    #[error("transcription failed: {0}")]
    Engine(String),

    #[error("io error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_display() {
        let err = PersistenceError::Io("disk full".to_string());
        assert_eq!(err.to_string(), "io error: disk full");
    }

    #[test]
    fn test_transcribe_error_display() {
        let err = TranscribeError::InvalidAudio("bad base64".to_string());
        assert!(err.to_string().contains("bad base64"));
    }
}
