//! HTTP request handlers.

pub mod chat;
pub mod health;
pub mod session;
pub mod transcribe;
