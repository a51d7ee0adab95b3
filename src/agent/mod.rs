//! Tool-augmented dialogue with a model provider.
//!
//! A dialogue takes a caller's conversation, attaches the configured
//! documents to its last user turn, and lets the model call tools from a
//! session that stays open until the dialogue ends.
//!
//! # Architecture
//!
//! ```text
//! Conversation → Orchestrator
//!   ├── DocumentLoader (naming + document blocks on the last user turn)
//!   ├── ToolBackend::connect → ToolSession (search_pdf)
//!   └── agentic_loop
//!       ├── LlmProvider::chat / chat_stream
//!       ├── execute_call per requested tool (results in request order)
//!       └── repeat until a text-only answer or the round limit
//! ```
//!
//! # Feature Gate
//!
//! The `OpenAI` provider requires the `openai` feature (on by default).

pub mod agentic_loop;
pub mod client;
pub mod config;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
#[cfg(test)]
pub(crate) mod testing;
pub mod tool;

// Re-export key types
pub use agentic_loop::{DialogueOutcome, DialogueToken, StopReason, agentic_loop};
pub use config::AgentConfig;
pub use executor::{SearchToolBackend, ToolBackend, ToolSession, execute_call};
pub use message::{ChatMessage, ChatRequest, ChatResponse, ContentBlock, Role, TokenUsage};
pub use orchestrator::{DialogueSettings, DialogueStream, Orchestrator};
pub use provider::LlmProvider;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
