//! Scripted model and tool stubs shared by the agent tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;

use super::executor::{ToolBackend, ToolSession};
use super::message::{ChatRequest, ChatResponse, ContentBlock, StreamEvent, TokenUsage};
use super::provider::{EventStream, LlmProvider};
use super::tool::{ToolCall, ToolOutput, ToolSet};
use crate::error::AgentError;
use crate::search::PdfSearch;

/// A turn containing only text blocks.
pub fn text_turn(texts: &[&str]) -> Vec<ContentBlock> {
    texts.iter().map(|t| ContentBlock::text(*t)).collect()
}

/// A turn containing a single tool call.
pub fn tool_turn(id: &str, name: &str, arguments: &str) -> Vec<ContentBlock> {
    vec![ContentBlock::ToolUse(ToolCall::new(id, name, arguments))]
}

enum Script {
    Turns(Mutex<VecDeque<Vec<ContentBlock>>>),
    AlwaysTool { name: String, arguments: String },
    Failing(String),
}

/// Model stub that replays a fixed script in both chat and stream mode.
///
/// In stream mode every text block is delivered as two fragments so
/// fragment reassembly is exercised.
pub struct ScriptedProvider {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Vec<ContentBlock>>) -> Self {
        Self::with_script(Script::Turns(Mutex::new(turns.into())))
    }

    pub fn always_tool(name: &str, arguments: &str) -> Self {
        Self::with_script(Script::AlwaysTool {
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
    }

    pub fn failing(message: &str) -> Self {
        Self::with_script(Script::Failing(message.to_string()))
    }

    pub const fn turn(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
        blocks
    }

    const fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of model requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request received.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_turn(&self, request: &ChatRequest) -> Result<Vec<ContentBlock>, AgentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match &self.script {
            Script::Turns(turns) => turns
                .lock()
                .ok()
                .and_then(|mut t| t.pop_front())
                .ok_or_else(|| AgentError::ApiRequest {
                    message: "script exhausted".to_string(),
                    status: None,
                }),
            Script::AlwaysTool { name, arguments } => {
                Ok(tool_turn(&format!("call_{n}"), name, arguments))
            }
            Script::Failing(message) => Err(AgentError::ApiRequest {
                message: message.clone(),
                status: Some(503),
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let content = self.next_turn(request)?;
        let finish_reason = if content.iter().any(|b| matches!(b, ContentBlock::ToolUse(_))) {
            "tool_calls"
        } else {
            "stop"
        };
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: Some(finish_reason.to_string()),
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, AgentError> {
        let content = self.next_turn(request)?;
        let mut events = Vec::new();
        for (index, block) in content.into_iter().enumerate() {
            match block {
                ContentBlock::Text { text } => {
                    let mid = text
                        .char_indices()
                        .nth(text.chars().count() / 2)
                        .map_or(text.len(), |(i, _)| i);
                    let (head, tail) = text.split_at(mid);
                    for part in [head, tail] {
                        events.push(Ok(StreamEvent::TextDelta {
                            index,
                            text: part.to_string(),
                        }));
                    }
                }
                ContentBlock::ToolUse(call) => events.push(Ok(StreamEvent::ToolUse { index, call })),
                ContentBlock::Document { .. } | ContentBlock::ToolResult(_) => {}
            }
        }
        events.push(Ok(StreamEvent::Done {
            finish_reason: None,
            usage: TokenUsage::default(),
        }));
        Ok(Box::pin(stream::iter(events)))
    }
}

/// Tool backend that answers every call with a fixed payload and counts
/// sessions opened and released.
#[derive(Clone)]
pub struct StubBackend {
    content: String,
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub invocations: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubBackend {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().map(|i| i.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolBackend for StubBackend {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, AgentError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSession {
            backend: self.clone(),
        }))
    }
}

struct StubSession {
    backend: StubBackend,
}

#[async_trait]
impl ToolSession for StubSession {
    fn tools(&self) -> ToolSet {
        ToolSet::new(vec![PdfSearch::descriptor()])
    }

    async fn invoke(&mut self, name: &str, arguments: &str) -> Result<ToolOutput, AgentError> {
        if let Ok(mut invocations) = self.backend.invocations.lock() {
            invocations.push((name.to_string(), arguments.to_string()));
        }
        Ok(ToolOutput::ok(self.backend.content.clone()))
    }
}

impl Drop for StubSession {
    fn drop(&mut self) {
        self.backend.released.fetch_add(1, Ordering::SeqCst);
    }
}
