//! LlmProvider trait definition.
//!
//! The language-model backend is a black box to the engine: full
//! completions or a stream of text deltas. Uses RPITIT for `complete`;
//! `stream` returns a boxed stream so engine code can hold it without
//! naming the concrete stream type.

use std::pin::Pin;

use futures_util::Stream;

use voxrelay_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Trait for LLM provider backends.
///
/// Implementations live in `voxrelay-infra` (e.g., `AnthropicProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events,
    /// finite and not restartable.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
