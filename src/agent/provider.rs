//! Pluggable model provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls, keeping the dialogue loop decoupled
//! from any particular vendor.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::message::{ChatRequest, ChatResponse, StreamEvent};
use crate::error::AgentError;

/// A boxed stream of response events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, AgentError>> + Send>>;

/// Trait for model provider backends.
///
/// Implementations handle the transport layer (HTTP, SDK calls, timeouts)
/// for a specific provider while presenting a uniform interface to the
/// orchestrator. Each call is a single request; the orchestrator never
/// issues two concurrently for the same dialogue.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, timeouts, or content the
    /// provider cannot represent.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;

    /// Executes a streaming chat completion request.
    ///
    /// Text arrives as [`StreamEvent::TextDelta`] fragments keyed by block
    /// index; tool calls arrive fully assembled. The stream ends with a
    /// single [`StreamEvent::Done`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on connection failures. Failures after the
    /// stream opens are yielded as stream items.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, AgentError>;
}
