//! Environment-driven server configuration.
//!
//! All knobs come from the process environment. Missing or unparseable
//! values fall back to defaults with a logged warning; the only setting
//! that warrants a startup warning of its own is a missing
//! `ANTHROPIC_API_KEY`, since every chat will fail without it.

use std::path::PathBuf;

use secrecy::SecretString;

const DEFAULT_WHISPER_MODEL: &str = "base";
const DEFAULT_WHISPER_BIN: &str = "whisper";
const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_STATIC_DIR: &str = "static";

/// History snapshot filename inside the data directory.
const HISTORY_FILE: &str = "conversation_history.json";

/// Runtime configuration assembled from environment variables.
pub struct ServerConfig {
    /// Anthropic API key. `None` means chats will fail with an auth error.
    pub anthropic_api_key: Option<SecretString>,
    /// Claude model identifier sent with every completion request.
    pub claude_model: String,
    /// Whisper model name passed to the transcription binary.
    pub whisper_model: String,
    /// Path or name of the whisper executable.
    pub whisper_bin: String,
    /// Directory holding the history snapshot.
    pub data_dir: PathBuf,
    /// Directory of static assets served at `/`.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Assemble configuration from the environment.
    pub fn from_env() -> Self {
        let anthropic_api_key = match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.is_empty() => Some(SecretString::from(key)),
            _ => {
                tracing::warn!(
                    "ANTHROPIC_API_KEY is not set, chat requests will fail until it is provided"
                );
                None
            }
        };

        Self {
            anthropic_api_key,
            claude_model: env_or("CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
            whisper_model: env_or("WHISPER_MODEL", DEFAULT_WHISPER_MODEL),
            whisper_bin: env_or("WHISPER_BIN", DEFAULT_WHISPER_BIN),
            data_dir: data_dir(),
            static_dir: PathBuf::from(env_or("VOXRELAY_STATIC_DIR", DEFAULT_STATIC_DIR)),
        }
    }

    /// Full path of the history snapshot file.
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Resolve the data directory: `VOXRELAY_DATA_DIR`, else `~/.voxrelay`,
/// else the current directory.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VOXRELAY_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".voxrelay"),
        None => {
            tracing::warn!("could not determine home directory, using current directory");
            PathBuf::from(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_path_joins_data_dir() {
        let config = ServerConfig {
            anthropic_api_key: None,
            claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
            whisper_model: DEFAULT_WHISPER_MODEL.to_string(),
            whisper_bin: DEFAULT_WHISPER_BIN.to_string(),
            data_dir: PathBuf::from("/tmp/vox-test"),
            static_dir: PathBuf::from("static"),
        };
        assert_eq!(
            config.history_path(),
            PathBuf::from("/tmp/vox-test/conversation_history.json")
        );
    }

    #[test]
    fn test_env_or_falls_back_to_default() {
        assert_eq!(env_or("VOXRELAY_TEST_UNSET_VAR", "fallback"), "fallback");
    }
}
