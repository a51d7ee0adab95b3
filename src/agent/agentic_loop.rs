//! The dialogue round loop.
//!
//! Drives the model ↔ tool round-trip: sends the running conversation to the
//! model, forwards text, executes any tool calls in the order they arrive,
//! appends the round to the conversation, and repeats until the model
//! answers without tools or the round limit is reached.
//!
//! Streaming and non-streaming requests share this loop. A non-streaming
//! response is replayed as the event sequence a stream would have produced,
//! so both modes build the same transcript and the same answer text.

use futures_util::StreamExt;
use futures_util::stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::executor::{ToolSession, execute_call};
use super::message::{
    ChatMessage, ChatRequest, ContentBlock, Role, StreamEvent, TokenUsage, tool_results_message,
};
use super::provider::{EventStream, LlmProvider};
use crate::error::AgentError;

/// Why a dialogue stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model answered without requesting tools.
    Completed,
    /// The model was still requesting tools when the round limit ran out.
    RoundLimit,
    /// The dialogue failed. Only reported on streams.
    Failed,
}

/// Everything a finished dialogue produced.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueOutcome {
    /// Answer text: every text segment in order, newline-separated.
    pub text: String,
    /// Why the dialogue stopped.
    pub stop_reason: StopReason,
    /// Model requests issued.
    pub rounds: usize,
    /// Tool calls executed (including unknown-tool rejections).
    pub tool_calls: usize,
    /// Usage summed over all rounds.
    pub usage: TokenUsage,
    /// The full conversation, including every round's assistant and tool messages.
    pub transcript: Vec<ChatMessage>,
}

/// One unit of streamed dialogue output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueToken {
    /// Answer text, including the newline between segments.
    Text(String),
    /// A tool call is about to run.
    ToolMarker(String),
    /// The dialogue failed with this message.
    Failed(String),
    /// The stream is over. Always the last token.
    End(StopReason),
}

/// The marker shown to the user and stored in the transcript for a tool call.
#[must_use]
pub fn tool_marker(name: &str, arguments: &str) -> String {
    format!("[Calling tool {name} with args {arguments}]")
}

/// Answer text accumulated across rounds, mirrored to an optional token sink.
struct AnswerWriter<'a> {
    text: String,
    segments: usize,
    current: Option<usize>,
    sink: Option<&'a mpsc::Sender<DialogueToken>>,
}

impl<'a> AnswerWriter<'a> {
    const fn new(sink: Option<&'a mpsc::Sender<DialogueToken>>) -> Self {
        Self {
            text: String::new(),
            segments: 0,
            current: None,
            sink,
        }
    }

    /// Ends the current segment; the next text opens a new one.
    const fn break_segment(&mut self) {
        self.current = None;
    }

    /// Appends a text fragment. Returns `true` if it opened a new segment.
    async fn push_text(&mut self, index: usize, fragment: &str) -> Result<bool, AgentError> {
        if fragment.is_empty() {
            return Ok(false);
        }
        let opened = self.current != Some(index);
        if opened {
            if self.segments > 0 {
                self.text.push('\n');
                self.emit(DialogueToken::Text("\n".to_string())).await?;
            }
            self.segments += 1;
            self.current = Some(index);
        }
        self.text.push_str(fragment);
        self.emit(DialogueToken::Text(fragment.to_string())).await?;
        Ok(opened)
    }

    async fn emit(&self, token: DialogueToken) -> Result<(), AgentError> {
        match self.sink {
            Some(tx) => tx.send(token).await.map_err(|_| AgentError::Cancelled),
            None => Ok(()),
        }
    }
}

/// Runs the dialogue loop until the model answers or `round_limit` rounds pass.
///
/// `request.messages` is the running conversation and is extended in place
/// with every round. `request.stream` selects the provider call. Tokens are
/// sent to `sink` as they are produced; a closed sink cancels the run.
///
/// # Errors
///
/// Propagates provider failures and [`AgentError::Cancelled`]. Tool failures
/// never fail the run.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    session: &mut dyn ToolSession,
    request: &mut ChatRequest,
    round_limit: usize,
    sink: Option<&mpsc::Sender<DialogueToken>>,
) -> Result<DialogueOutcome, AgentError> {
    let tools = session.tools();
    request.tools = tools.definitions().to_vec();

    let mut answer = AnswerWriter::new(sink);
    let mut usage = TokenUsage::default();
    let mut tool_calls = 0;

    for round in 0..round_limit {
        debug!(round, messages = request.messages.len(), "requesting model response");
        let mut events = open_round(provider, request).await?;

        answer.break_segment();
        let mut blocks: Vec<ContentBlock> = Vec::new();
        let mut results = Vec::new();

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::TextDelta { index, text } => {
                    if answer.push_text(index, &text).await? {
                        blocks.push(ContentBlock::text(text));
                    } else if let Some(ContentBlock::Text { text: segment }) = blocks.last_mut() {
                        segment.push_str(&text);
                    }
                }
                StreamEvent::ToolUse { call, .. } => {
                    answer.break_segment();
                    let marker = tool_marker(&call.name, &call.arguments);
                    answer.emit(DialogueToken::ToolMarker(marker.clone())).await?;
                    debug!(round, tool = %call.name, call_id = %call.id, "executing tool call");

                    let result = execute_call(session, &tools, &call).await;
                    tool_calls += 1;
                    blocks.push(ContentBlock::text(marker));
                    blocks.push(ContentBlock::ToolUse(call));
                    results.push(result);
                }
                StreamEvent::Done {
                    finish_reason,
                    usage: round_usage,
                } => {
                    usage.accumulate(round_usage);
                    debug!(round, finish_reason = ?finish_reason, "model response complete");
                    break;
                }
            }
        }

        if !blocks.is_empty() {
            request.messages.push(ChatMessage::new(Role::Assistant, blocks));
        }

        if results.is_empty() {
            return Ok(DialogueOutcome {
                text: answer.text,
                stop_reason: StopReason::Completed,
                rounds: round + 1,
                tool_calls,
                usage,
                transcript: request.messages.clone(),
            });
        }
        request.messages.push(tool_results_message(results));
    }

    warn!(round_limit, "round limit reached while the model was still requesting tools");
    Ok(DialogueOutcome {
        text: answer.text,
        stop_reason: StopReason::RoundLimit,
        rounds: round_limit,
        tool_calls,
        usage,
        transcript: request.messages.clone(),
    })
}

async fn open_round(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
) -> Result<EventStream, AgentError> {
    if request.stream {
        return provider.chat_stream(request).await;
    }
    let response = provider.chat(request).await?;
    Ok(Box::pin(stream::iter(
        response.into_events().into_iter().map(Ok),
    )))
}
