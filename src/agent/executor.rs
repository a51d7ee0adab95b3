//! Tool sessions and call execution.
//!
//! A [`ToolBackend`] opens one [`ToolSession`] per dialogue. The session
//! advertises its tools once, serves every call of that dialogue, and is
//! released when dropped, on every exit path.
//!
//! [`execute_call`] turns a model's tool call into a [`ToolResult`] without
//! ever failing: unknown tools, oversized arguments and tool errors all come
//! back as error results the model can read.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::search::{PdfSearch, SEARCH_TOOL_NAME, SearchArgs};

use super::tool::{ToolCall, ToolOutput, ToolResult, ToolSet};

/// Maximum raw byte length of tool argument JSON from the model.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Opens tool sessions.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Opens a session for one dialogue.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Session`] if the session cannot be established.
    async fn connect(&self) -> Result<Box<dyn ToolSession>, AgentError>;
}

/// A live tool session scoped to one dialogue.
#[async_trait]
pub trait ToolSession: Send {
    /// Tools advertised by this session.
    fn tools(&self) -> ToolSet;

    /// Invokes `name` with JSON-encoded `arguments`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] if the tool cannot run.
    async fn invoke(&mut self, name: &str, arguments: &str) -> Result<ToolOutput, AgentError>;
}

/// Executes one tool call against a session.
///
/// The call is only forwarded if `tools` advertises its name and its
/// arguments are within the size limit.
pub async fn execute_call(
    session: &mut dyn ToolSession,
    tools: &ToolSet,
    call: &ToolCall,
) -> ToolResult {
    if !tools.contains(&call.name) {
        warn!(tool = %call.name, call_id = %call.id, "model requested an unknown tool");
        return ToolOutput::error(format!(
            "[Unknown tool {}: not recognized. Available tools: {}]",
            call.name,
            tools.names()
        ))
        .into_result(&call.id);
    }

    if call.arguments.len() > MAX_TOOL_ARGS_LEN {
        return ToolOutput::error(format!(
            "[Error calling tool {}: arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})]",
            call.name,
            call.arguments.len()
        ))
        .into_result(&call.id);
    }

    let output = match session.invoke(&call.name, &call.arguments).await {
        Ok(output) => output,
        Err(e) => ToolOutput::error(format!(
            "[Error calling tool {} with args {}: {e}]",
            call.name, call.arguments
        )),
    };
    debug!(
        tool = %call.name,
        call_id = %call.id,
        is_error = output.is_error,
        "tool execution complete"
    );
    output.into_result(&call.id)
}

/// Backend serving the `search_pdf` tool from a local document directory.
#[derive(Debug, Clone)]
pub struct SearchToolBackend {
    search: Arc<PdfSearch>,
}

impl SearchToolBackend {
    /// Creates a backend over `search`.
    #[must_use]
    pub fn new(search: PdfSearch) -> Self {
        Self {
            search: Arc::new(search),
        }
    }
}

#[async_trait]
impl ToolBackend for SearchToolBackend {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, AgentError> {
        let root = self.search.root();
        if !root.is_dir() {
            return Err(AgentError::Session {
                message: format!("document directory {} is not available", root.display()),
            });
        }
        debug!(root = %root.display(), "tool session opened");
        Ok(Box::new(SearchSession {
            search: Arc::clone(&self.search),
            tools: ToolSet::new(vec![PdfSearch::descriptor()]),
        }))
    }
}

struct SearchSession {
    search: Arc<PdfSearch>,
    tools: ToolSet,
}

#[async_trait]
impl ToolSession for SearchSession {
    fn tools(&self) -> ToolSet {
        self.tools.clone()
    }

    async fn invoke(&mut self, name: &str, arguments: &str) -> Result<ToolOutput, AgentError> {
        if name != SEARCH_TOOL_NAME {
            return Err(AgentError::ToolExecution {
                name: name.to_string(),
                message: "unknown tool".to_string(),
            });
        }

        let args: SearchArgs =
            serde_json::from_str(arguments).map_err(|e| AgentError::ToolExecution {
                name: name.to_string(),
                message: format!("invalid arguments: {e}"),
            })?;

        // Extraction is CPU-bound and may read large files
        let search = Arc::clone(&self.search);
        let outcome = tokio::task::spawn_blocking(move || search.run(&args))
            .await
            .map_err(|e| AgentError::ToolExecution {
                name: name.to_string(),
                message: format!("search task failed: {e}"),
            })?;

        let content = serde_json::to_string(&outcome).map_err(|e| AgentError::ToolExecution {
            name: name.to_string(),
            message: format!("serialization failed: {e}"),
        })?;

        Ok(ToolOutput {
            content,
            is_error: outcome.error.is_some(),
        })
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        debug!("tool session released");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::document::{DocumentsConfig, ExtractorKind};
    use crate::search::{SearchConfig, SearchOutcome};
    use tempfile::TempDir;

    fn backend() -> (TempDir, SearchToolBackend) {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("paper.txt"), "The mitochondria is the powerhouse of the cell.")
            .unwrap_or_else(|e| panic!("write: {e}"));
        let documents = DocumentsConfig::builder()
            .root(dir.path())
            .extension("txt")
            .extractor(ExtractorKind::Plain)
            .build();
        let search = PdfSearch::new(documents, SearchConfig::default());
        (dir, SearchToolBackend::new(search))
    }

    async fn session(backend: &SearchToolBackend) -> Box<dyn ToolSession> {
        backend
            .connect()
            .await
            .unwrap_or_else(|e| panic!("connect: {e}"))
    }

    #[tokio::test]
    async fn test_session_advertises_search_tool() {
        let (_dir, backend) = backend();
        let session = session(&backend).await;
        let tools = session.tools();
        assert_eq!(tools.len(), 1);
        assert!(tools.contains(SEARCH_TOOL_NAME));
    }

    #[tokio::test]
    async fn test_connect_fails_without_document_directory() {
        let documents = DocumentsConfig::new("/nonexistent/pdf-dialogue-root");
        let backend = SearchToolBackend::new(PdfSearch::new(documents, SearchConfig::default()));
        let result = backend.connect().await;
        assert!(matches!(result, Err(AgentError::Session { .. })));
    }

    #[tokio::test]
    async fn test_execute_call_runs_search() {
        let (_dir, backend) = backend();
        let mut session = session(&backend).await;
        let tools = session.tools();
        let call = ToolCall::new(
            "call_1",
            SEARCH_TOOL_NAME,
            r#"{"pdf_name":"paper","query":"powerhouse of the cell","context_length":10}"#,
        );

        let result = execute_call(session.as_mut(), &tools, &call).await;
        assert_eq!(result.tool_call_id, "call_1");
        assert!(!result.is_error);
        let outcome: SearchOutcome = serde_json::from_str(&result.content)
            .unwrap_or_else(|e| panic!("bad payload: {e}"));
        assert!(outcome.query_exists);
        assert_eq!(outcome.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_call_unknown_tool() {
        let (_dir, backend) = backend();
        let mut session = session(&backend).await;
        let tools = session.tools();
        let call = ToolCall::new("call_2", "delete_files", "{}");

        let result = execute_call(session.as_mut(), &tools, &call).await;
        assert!(result.is_error);
        assert!(result.content.contains("Unknown tool delete_files"));
        assert!(result.content.contains("not recognized"));
    }

    #[tokio::test]
    async fn test_execute_call_invalid_arguments() {
        let (_dir, backend) = backend();
        let mut session = session(&backend).await;
        let tools = session.tools();
        let call = ToolCall::new("call_3", SEARCH_TOOL_NAME, r#"{"query":"x"}"#);

        let result = execute_call(session.as_mut(), &tools, &call).await;
        assert!(result.is_error);
        assert!(result.content.starts_with("[Error calling tool search_pdf with args"));
    }

    #[tokio::test]
    async fn test_execute_call_oversized_arguments() {
        let (_dir, backend) = backend();
        let mut session = session(&backend).await;
        let tools = session.tools();
        let call = ToolCall::new("call_4", SEARCH_TOOL_NAME, "x".repeat(MAX_TOOL_ARGS_LEN + 1));

        let result = execute_call(session.as_mut(), &tools, &call).await;
        assert!(result.is_error);
        assert!(result.content.contains("too large"));
    }

    #[tokio::test]
    async fn test_search_error_payload_flags_result() {
        let (dir, backend) = backend();
        std::fs::write(dir.path().join("blank.txt"), "   ").unwrap_or_else(|e| panic!("write: {e}"));
        let mut session = session(&backend).await;
        let tools = session.tools();
        let call = ToolCall::new("call_5", SEARCH_TOOL_NAME, r#"{"pdf_name":"blank","query":"x"}"#);

        let result = execute_call(session.as_mut(), &tools, &call).await;
        assert!(result.is_error);
        assert!(result.content.contains("Extracted text is empty"));
    }
}
