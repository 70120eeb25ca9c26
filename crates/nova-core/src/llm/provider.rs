//! LlmProvider trait definition.
//!
//! This is the gateway abstraction the relay talks to. Uses RPITIT for
//! `complete`; `stream` returns a boxed stream so the relay can hold the
//! handle without naming the concrete stream type.

use std::pin::Pin;

use futures_util::Stream;

use nova_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Trait for LLM gateway backends.
///
/// Implementations live in nova-infra (e.g., `GeminiProvider`).
/// A well-behaved `stream` implementation emits [`StreamEvent::Connected`]
/// as its first item once the upstream call is established, or an `Err`
/// if establishing it failed; the relay relies on this to report gateway
/// failures before anything has been streamed to the client.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
