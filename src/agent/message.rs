//! Provider-agnostic message types for model communication.
//!
//! A message is an ordered list of typed content blocks. Text, documents,
//! tool calls and tool results share one sequence so a conversation can be
//! replayed to any provider without losing block order.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition, ToolResult};

/// Role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input (and tool results returned to the model).
    User,
    /// Model output.
    Assistant,
}

/// Payload of a document block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentSource {
    /// Raw file bytes, base64-encoded.
    Base64 {
        /// MIME type of the encoded bytes.
        media_type: String,
        /// Base64 payload.
        data: String,
    },
    /// Text already extracted from the file.
    Text {
        /// Extracted text.
        text: String,
    },
}

/// A typed unit of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An attached document.
    Document {
        /// Document payload.
        source: DocumentSource,
    },
    /// A tool invocation requested by the model.
    ToolUse(ToolCall),
    /// The outcome of a tool invocation.
    ToolResult(ToolResult),
}

impl ContentBlock {
    /// Creates a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the text if this is a text block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    /// Creates a message from blocks.
    #[must_use]
    pub const fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    /// Tool calls in block order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse(call) => Some(call),
            _ => None,
        })
    }
}

/// A chat completion request (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// System instruction, sent out of band from the conversation.
    pub system: Option<String>,
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0-2.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Stream the response.
    pub stream: bool,
    /// Tool definitions available to the model.
    pub tools: Vec<ToolDefinition>,
}

/// Token usage statistics from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated in the completion.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Adds another completion's usage to this one.
    pub const fn accumulate(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// A chat completion response (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated content blocks in the order the model produced them.
    pub content: Vec<ContentBlock>,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Finish reason from the model (e.g., `"stop"`, `"tool_calls"`).
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Replays this response as the event sequence a stream would have produced.
    ///
    /// Each block keeps its position as the event index, so text blocks
    /// remain distinct segments.
    #[must_use]
    pub fn into_events(self) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = self
            .content
            .into_iter()
            .enumerate()
            .filter_map(|(index, block)| match block {
                ContentBlock::Text { text } => Some(StreamEvent::TextDelta { index, text }),
                ContentBlock::ToolUse(call) => Some(StreamEvent::ToolUse { index, call }),
                ContentBlock::Document { .. } | ContentBlock::ToolResult(_) => None,
            })
            .collect();
        events.push(StreamEvent::Done {
            finish_reason: self.finish_reason,
            usage: self.usage,
        });
        events
    }
}

/// One increment of a streamed model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text appended to the content block at `index`.
    TextDelta {
        /// Content block position within the response.
        index: usize,
        /// Text fragment.
        text: String,
    },
    /// A fully assembled tool call at `index`.
    ToolUse {
        /// Content block position within the response.
        index: usize,
        /// The assembled call.
        call: ToolCall,
    },
    /// The response is complete.
    Done {
        /// Finish reason from the model.
        finish_reason: Option<String>,
        /// Usage reported for the response, zero when unknown.
        usage: TokenUsage,
    },
}

/// Creates a user message with a single text block.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage::new(Role::User, vec![ContentBlock::text(content)])
}

/// Creates an assistant message with a single text block.
#[must_use]
pub fn assistant_message(content: &str) -> ChatMessage {
    ChatMessage::new(Role::Assistant, vec![ContentBlock::text(content)])
}

/// Creates the user message carrying tool results back to the model.
#[must_use]
pub fn tool_results_message(results: Vec<ToolResult>) -> ChatMessage {
    ChatMessage::new(
        Role::User,
        results.into_iter().map(ContentBlock::ToolResult).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let msg = user_message("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.len(), 1);
        assert_eq!(msg.content[0].as_text(), Some("Hello"));
    }

    #[test]
    fn test_tool_results_message() {
        let msg = tool_results_message(vec![ToolResult {
            tool_call_id: "call_1".to_string(),
            content: "{}".to_string(),
            is_error: false,
        }]);
        assert_eq!(msg.role, Role::User);
        assert!(matches!(msg.content[0], ContentBlock::ToolResult(_)));
    }

    #[test]
    fn test_tool_calls_iterator_keeps_order() {
        let msg = ChatMessage::new(
            Role::Assistant,
            vec![
                ContentBlock::ToolUse(ToolCall::new("a", "search_pdf", "{}")),
                ContentBlock::text("between"),
                ContentBlock::ToolUse(ToolCall::new("b", "search_pdf", "{}")),
            ],
        );
        let ids: Vec<&str> = msg.tool_calls().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_into_events_preserves_block_positions() {
        let response = ChatResponse {
            content: vec![
                ContentBlock::text("first"),
                ContentBlock::ToolUse(ToolCall::new("c1", "search_pdf", "{}")),
                ContentBlock::text("second"),
            ],
            usage: TokenUsage::default(),
            finish_reason: Some("tool_calls".to_string()),
        };
        let events = response.into_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], StreamEvent::TextDelta { index: 0, text } if text == "first"));
        assert!(matches!(&events[1], StreamEvent::ToolUse { index: 1, .. }));
        assert!(matches!(&events[2], StreamEvent::TextDelta { index: 2, .. }));
        assert!(matches!(&events[3], StreamEvent::Done { .. }));
    }

    #[test]
    fn test_content_block_serialization() {
        let block = ContentBlock::Document {
            source: DocumentSource::Base64 {
                media_type: "application/pdf".to_string(),
                data: "AAAA".to_string(),
            },
        };
        let json = serde_json::to_string(&block).unwrap_or_default();
        assert!(json.contains("\"document\""));
        assert!(json.contains("application/pdf"));
    }

    #[test]
    fn test_usage_accumulate() {
        let mut total = TokenUsage::default();
        total.accumulate(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 2,
            total_tokens: 12,
        });
        total.accumulate(TokenUsage {
            prompt_tokens: 5,
            completion_tokens: 1,
            total_tokens: 6,
        });
        assert_eq!(total.total_tokens, 18);
    }
}
