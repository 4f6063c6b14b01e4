//! Infrastructure adapters for voxrelay.
//!
//! Concrete implementations of the ports defined in `voxrelay-core`:
//! JSON snapshot persistence, the Anthropic Messages API client, and the
//! whisper CLI transcriber, plus the environment-driven server config.

pub mod config;
pub mod history;
pub mod llm;
pub mod stt;
