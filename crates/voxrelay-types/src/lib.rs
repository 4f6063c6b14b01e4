//! Shared domain types for Voxrelay.
//!
//! This crate contains the core domain types used across the relay:
//! conversation messages, the persisted history snapshot, LLM request and
//! stream shapes, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod error;
pub mod llm;
pub mod message;
pub mod snapshot;
