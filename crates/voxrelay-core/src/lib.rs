//! Business logic and port trait definitions for Voxrelay.
//!
//! This crate defines the "ports" (history store, LLM provider,
//! speech-to-text traits) that the infrastructure layer implements, plus
//! the two stateful components at the heart of the relay: the
//! [`session::SessionManager`] and the [`engine::ConversationEngine`].
//!
//! It depends only on `voxrelay-types` -- never on `voxrelay-infra` or any
//! HTTP/IO crate.

pub mod engine;
pub mod history;
pub mod llm;
pub mod session;
pub mod stt;
