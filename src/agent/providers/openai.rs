//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the base URL override in [`AgentConfig`]. Documents are sent as
//! extracted text; raw binary documents cannot be represented in a chat
//! completion and are rejected.

use std::collections::BTreeMap;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionStreamOptions, ChatCompletionTool, ChatCompletionToolType, CompletionUsage,
    CreateChatCompletionRequest, CreateChatCompletionStreamResponse, FinishReason, FunctionCall,
    FunctionObject,
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::message::{
    ChatMessage, ChatRequest, ChatResponse, ContentBlock, DocumentSource, Role, StreamEvent,
    TokenUsage,
};
use crate::agent::provider::{EventStream, LlmProvider};
use crate::agent::tool::ToolCall;
use crate::error::AgentError;

/// Event index of the single text block in a completion. Tool calls follow it.
const TEXT_INDEX: usize = 0;

/// `OpenAI`-compatible model provider.
///
/// Wraps the `async-openai` client for chat completions. Compatible
/// with any API that follows the `OpenAI` chat completion format.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            timeout: config.timeout,
        }
    }

    /// Converts one of our messages to the `OpenAI` SDK messages it maps to.
    ///
    /// A user message carrying tool results becomes one tool message per
    /// result, followed by a user message for any remaining text.
    fn convert_message(msg: &ChatMessage) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        let mut converted = Vec::new();
        let mut parts: Vec<&str> = Vec::new();
        let mut tool_calls = Vec::new();

        for block in &msg.content {
            match (msg.role, block) {
                (_, ContentBlock::Text { text }) => parts.push(text),
                (
                    Role::User,
                    ContentBlock::Document {
                        source: DocumentSource::Text { text },
                    },
                ) => parts.push(text),
                (
                    Role::User,
                    ContentBlock::Document {
                        source: DocumentSource::Base64 { media_type, .. },
                    },
                ) => {
                    return Err(AgentError::UnsupportedContent {
                        message: format!(
                            "openai chat completions cannot carry {media_type} documents; \
                             attach documents as extracted text"
                        ),
                    });
                }
                (Role::User, ContentBlock::ToolResult(result)) => {
                    converted.push(ChatCompletionRequestMessage::Tool(
                        ChatCompletionRequestToolMessage {
                            content: ChatCompletionRequestToolMessageContent::Text(
                                result.content.clone(),
                            ),
                            tool_call_id: result.tool_call_id.clone(),
                        },
                    ));
                }
                (Role::Assistant, ContentBlock::ToolUse(call)) => {
                    tool_calls.push(ChatCompletionMessageToolCall {
                        id: call.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    });
                }
                (role, other) => {
                    return Err(AgentError::UnsupportedContent {
                        message: format!("{role:?} message cannot contain {}", block_kind(other)),
                    });
                }
            }
        }

        let text = parts.join("\n\n");
        match msg.role {
            Role::User => {
                if !text.is_empty() || converted.is_empty() {
                    converted.push(ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessage {
                            content: ChatCompletionRequestUserMessageContent::Text(text),
                            name: None,
                        },
                    ));
                }
            }
            Role::Assistant => {
                let content = (!text.is_empty())
                    .then_some(ChatCompletionRequestAssistantMessageContent::Text(text));
                let tool_calls = (!tool_calls.is_empty()).then_some(tool_calls);

                #[allow(deprecated)]
                converted.push(ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessage {
                        content,
                        name: None,
                        tool_calls,
                        refusal: None,
                        audio: None,
                        function_call: None,
                    },
                ));
            }
        }
        Ok(converted)
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> Result<CreateChatCompletionRequest, AgentError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(ref system) = request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }
        for msg in &request.messages {
            messages.extend(Self::convert_message(msg)?);
        }

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|td| ChatCompletionTool {
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionObject {
                            name: td.name.clone(),
                            description: Some(td.description.clone()),
                            parameters: Some(td.parameters.clone()),
                            strict: None,
                        },
                    })
                    .collect(),
            )
        };

        let (stream, stream_options) = if request.stream {
            (
                Some(true),
                Some(ChatCompletionStreamOptions {
                    include_usage: true,
                }),
            )
        } else {
            (None, None)
        };

        Ok(CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            stream,
            stream_options,
            tools,
            ..Default::default()
        })
    }

    fn timed_out(&self) -> AgentError {
        AgentError::ApiRequest {
            message: format!("request timed out after {}s", self.timeout.as_secs()),
            status: None,
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let mut plain = request.clone();
        plain.stream = false;
        let openai_request = Self::build_request(&plain)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(openai_request))
            .await
            .map_err(|_| self.timed_out())?
            .map_err(api_error)?;

        let choice = response.choices.into_iter().next();
        let mut content = Vec::new();
        let mut finish_reason = None;

        if let Some(choice) = choice {
            finish_reason = choice.finish_reason.and_then(finish_reason_name);
            if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
                content.push(ContentBlock::Text { text });
            }
            content.extend(
                choice
                    .message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tc| {
                        ContentBlock::ToolUse(ToolCall::new(
                            tc.id,
                            tc.function.name,
                            tc.function.arguments,
                        ))
                    }),
            );
        }

        Ok(ChatResponse {
            content,
            usage: response.usage.map_or_else(TokenUsage::default, usage_from),
            finish_reason,
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, AgentError> {
        let mut stream_request = request.clone();
        stream_request.stream = true;
        let openai_request = Self::build_request(&stream_request)?;

        let chunks = tokio::time::timeout(
            self.timeout,
            self.client.chat().create_stream(openai_request),
        )
        .await
        .map_err(|_| self.timed_out())?
        .map_err(api_error)?;

        let events = stream::unfold(
            Some((chunks, StreamAssembler::default())),
            |state| async move {
                let (mut chunks, mut assembler) = state?;
                match chunks.next().await {
                    Some(Ok(chunk)) => {
                        let events: Vec<_> = assembler.push_chunk(chunk).into_iter().map(Ok).collect();
                        Some((events, Some((chunks, assembler))))
                    }
                    Some(Err(e)) => Some((
                        vec![Err(AgentError::Stream {
                            message: e.to_string(),
                        })],
                        None,
                    )),
                    None => Some((assembler.finish().into_iter().map(Ok).collect(), None)),
                }
            },
        )
        .flat_map(stream::iter);

        Ok(Box::pin(events))
    }
}

/// Reassembles streamed completion chunks into [`StreamEvent`]s.
///
/// Text is forwarded as it arrives. Tool call fragments are keyed by the
/// provider's call index and released, fully assembled, when the stream ends.
#[derive(Debug, Default)]
struct StreamAssembler {
    tool_calls: BTreeMap<u32, PartialToolCall>,
    finish_reason: Option<String>,
    usage: TokenUsage,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl StreamAssembler {
    fn push_chunk(&mut self, chunk: CreateChatCompletionStreamResponse) -> Vec<StreamEvent> {
        if let Some(usage) = chunk.usage {
            self.usage = usage_from(usage);
        }
        let mut events = Vec::new();
        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            if let Some(text) = choice.delta.content {
                events.extend(self.push_text(text));
            }
            for fragment in choice.delta.tool_calls.unwrap_or_default() {
                let (name, arguments) = fragment
                    .function
                    .map_or((None, None), |f| (f.name, f.arguments));
                self.push_tool_fragment(
                    fragment.index,
                    fragment.id.as_deref(),
                    name.as_deref(),
                    arguments.as_deref(),
                );
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = finish_reason_name(reason);
            }
        }
        events
    }

    fn push_text(&mut self, text: String) -> Option<StreamEvent> {
        (!text.is_empty()).then_some(StreamEvent::TextDelta {
            index: TEXT_INDEX,
            text,
        })
    }

    fn push_tool_fragment(
        &mut self,
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        let call = self.tool_calls.entry(index).or_default();
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            call.id = id.to_string();
        }
        if let Some(name) = name {
            call.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            call.arguments.push_str(arguments);
        }
    }

    fn finish(self) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = self
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(position, (index, call))| {
                let id = if call.id.is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                };
                debug!(tool = %call.name, id = %id, "assembled streamed tool call");
                StreamEvent::ToolUse {
                    index: TEXT_INDEX + 1 + position,
                    call: ToolCall::new(id, call.name, call.arguments),
                }
            })
            .collect();
        events.push(StreamEvent::Done {
            finish_reason: self.finish_reason,
            usage: self.usage,
        });
        events
    }
}

fn usage_from(usage: CompletionUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

fn finish_reason_name(reason: FinishReason) -> Option<String> {
    serde_json::to_value(reason)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
}

fn api_error(e: OpenAIError) -> AgentError {
    let status = match &e {
        OpenAIError::Reqwest(inner) => inner.status().map(|s| s.as_u16()),
        _ => None,
    };
    AgentError::ApiRequest {
        message: e.to_string(),
        status,
    }
}

const fn block_kind(block: &ContentBlock) -> &'static str {
    match block {
        ContentBlock::Text { .. } => "text",
        ContentBlock::Document { .. } => "documents",
        ContentBlock::ToolUse(_) => "tool calls",
        ContentBlock::ToolResult(_) => "tool results",
    }
}
