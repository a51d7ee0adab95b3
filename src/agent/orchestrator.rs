//! Dialogue orchestrator.
//!
//! Validates the caller's conversation, attaches the configured documents
//! to its last user message, opens a tool session for the length of the
//! dialogue, and hands off to [`agentic_loop`]. The same run is available
//! as a single answer ([`Orchestrator::run_once`]) or as a token stream
//! ([`Orchestrator::run_streaming`]).

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use super::agentic_loop::{DialogueOutcome, DialogueToken, StopReason, agentic_loop};
use super::client::create_provider;
use super::config::AgentConfig;
use super::executor::{SearchToolBackend, ToolBackend};
use super::message::{ChatMessage, ChatRequest, Role};
use super::prompt::load_system_prompt;
use super::provider::LlmProvider;
use crate::document::{DocumentLoader, DocumentsConfig};
use crate::error::AgentError;
use crate::search::PdfSearch;

/// Tokens buffered between the dialogue task and the consumer.
const TOKEN_BUFFER: usize = 64;

/// Per-request model settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueSettings {
    /// Model identifier.
    pub model: String,
    /// System instruction.
    pub system_prompt: Option<String>,
    /// Maximum tokens per response.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl DialogueSettings {
    /// Settings for `model` with no system prompt and provider defaults.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Settings from agent configuration, loading the system prompt.
    #[must_use]
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: Some(load_system_prompt(config.system_prompt_file.as_deref())),
            max_tokens: Some(config.max_tokens),
            temperature: config.temperature,
        }
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Runs tool-augmented dialogues against one model provider and one tool backend.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolBackend>,
    settings: DialogueSettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolBackend>,
        settings: DialogueSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
        }
    }

    /// Creates an orchestrator with the configured provider and the
    /// `search_pdf` backend over the configured documents.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let provider = create_provider(config)?;
        let search = PdfSearch::new(config.documents.clone(), config.search);
        Ok(Self::new(
            Arc::from(provider),
            Arc::new(SearchToolBackend::new(search)),
            DialogueSettings::from_config(config),
        ))
    }

    /// Runs a dialogue to completion and returns everything it produced.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidInput`] for an empty conversation, a
    /// conversation not ending in a user message, or a zero round limit.
    /// Document directory, session and provider failures are propagated.
    pub async fn run(
        &self,
        conversation: Vec<ChatMessage>,
        documents: &DocumentsConfig,
        round_limit: usize,
    ) -> Result<DialogueOutcome, AgentError> {
        self.execute(conversation, documents.clone(), round_limit, false, None)
            .await
    }

    /// Runs a dialogue and returns only the answer text.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run`].
    pub async fn run_once(
        &self,
        conversation: Vec<ChatMessage>,
        documents: &DocumentsConfig,
        round_limit: usize,
    ) -> Result<String, AgentError> {
        self.run(conversation, documents, round_limit)
            .await
            .map(|outcome| outcome.text)
    }

    /// Runs a dialogue in the background and streams its output.
    ///
    /// Must be called within a tokio runtime. Failures, including invalid
    /// input, arrive as [`DialogueToken::Failed`]. The stream always ends
    /// with one [`DialogueToken::End`]. Dropping the stream stops the
    /// dialogue and releases its tool session.
    #[must_use]
    pub fn run_streaming(
        &self,
        conversation: Vec<ChatMessage>,
        documents: DocumentsConfig,
        round_limit: usize,
    ) -> DialogueStream {
        let (tx, rx) = mpsc::channel(TOKEN_BUFFER);
        let this = self.clone();

        let task = tokio::spawn(async move {
            let result = this
                .execute(conversation, documents, round_limit, true, Some(&tx))
                .await;
            let stop_reason = match result {
                Ok(outcome) => outcome.stop_reason,
                Err(AgentError::Cancelled) => return,
                Err(e) => {
                    if tx.send(DialogueToken::Failed(e.to_string())).await.is_err() {
                        return;
                    }
                    StopReason::Failed
                }
            };
            let _ = tx.send(DialogueToken::End(stop_reason)).await;
        });

        DialogueStream {
            tokens: ReceiverStream::new(rx),
            task,
        }
    }

    async fn execute(
        &self,
        mut conversation: Vec<ChatMessage>,
        documents: DocumentsConfig,
        round_limit: usize,
        stream: bool,
        sink: Option<&mpsc::Sender<DialogueToken>>,
    ) -> Result<DialogueOutcome, AgentError> {
        validate(&conversation, round_limit)?;
        info!(
            provider = self.provider.name(),
            round_limit,
            stream,
            "starting dialogue"
        );

        let loaded = load_documents(documents).await?;
        if let Some(last) = conversation.last_mut() {
            loaded.attach_to(last);
        }

        // Released when dropped, on every exit path below
        let mut session = self.tools.connect().await?;

        let mut request = ChatRequest {
            model: self.settings.model.clone(),
            system: self.settings.system_prompt.clone(),
            messages: conversation,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream,
            tools: Vec::new(),
        };

        let outcome = agentic_loop(
            self.provider.as_ref(),
            session.as_mut(),
            &mut request,
            round_limit,
            sink,
        )
        .await;

        match &outcome {
            Ok(o) => info!(
                rounds = o.rounds,
                tool_calls = o.tool_calls,
                stop_reason = ?o.stop_reason,
                total_tokens = o.usage.total_tokens,
                "dialogue finished"
            ),
            Err(AgentError::Cancelled) => info!("dialogue cancelled by consumer"),
            Err(e) => warn!(error = %e, "dialogue failed"),
        }
        outcome
    }
}

fn validate(conversation: &[ChatMessage], round_limit: usize) -> Result<(), AgentError> {
    if round_limit == 0 {
        return Err(AgentError::InvalidInput {
            message: "round limit must be at least 1".to_string(),
        });
    }
    match conversation.last() {
        None => Err(AgentError::InvalidInput {
            message: "conversation is empty".to_string(),
        }),
        Some(last) if last.role != Role::User => Err(AgentError::InvalidInput {
            message: "the last message must come from the user".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

async fn load_documents(
    documents: DocumentsConfig,
) -> Result<crate::document::LoadedDocuments, AgentError> {
    let root = documents.root.display().to_string();
    let loaded = tokio::task::spawn_blocking(move || DocumentLoader::new(documents).load())
        .await
        .map_err(|e| AgentError::DocumentLoad {
            path: root,
            message: format!("loader task failed: {e}"),
        })??;
    info!(
        attached = loaded.attached.len(),
        skipped = loaded.warnings.len(),
        "documents loaded"
    );
    Ok(loaded)
}

/// Streamed output of a dialogue.
///
/// Yields [`DialogueToken`]s until the terminating [`DialogueToken::End`].
/// Dropping it aborts the dialogue.
#[derive(Debug)]
pub struct DialogueStream {
    tokens: ReceiverStream<DialogueToken>,
    task: JoinHandle<()>,
}

impl DialogueStream {
    /// Drains the stream, returning the answer text and how it ended.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Stream`] with the failure message if the
    /// dialogue failed.
    pub async fn into_text(mut self) -> Result<(String, StopReason), AgentError> {
        let mut text = String::new();
        let mut failure = None;
        while let Some(token) = self.next().await {
            match token {
                DialogueToken::Text(t) => text.push_str(&t),
                DialogueToken::ToolMarker(_) => {}
                DialogueToken::Failed(message) => failure = Some(message),
                DialogueToken::End(reason) => {
                    return match failure {
                        Some(message) => Err(AgentError::Stream { message }),
                        None => Ok((text, reason)),
                    };
                }
            }
        }
        Err(AgentError::Stream {
            message: failure.unwrap_or_else(|| "dialogue ended without a result".to_string()),
        })
    }
}

impl Stream for DialogueStream {
    type Item = DialogueToken;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().tokens.poll_next_unpin(cx)
    }
}

impl Drop for DialogueStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
