//! Speech-to-text implementations.

mod whisper_cli;

pub use whisper_cli::WhisperCliTranscriber;
