//! Language-model provider abstraction.

mod provider;

pub use provider::LlmProvider;
