//! Tool type definitions for model function-calling.
//!
//! Provides provider-agnostic types for tool descriptors, calls, and results.
//! A [`ToolSet`] is obtained once per dialogue from the tool session and
//! forwarded to the model unchanged on every round.

use serde::{Deserialize, Serialize};

/// A tool descriptor that can be sent to a model for function-calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique within a session).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

impl ToolCall {
    /// Creates a call from its parts.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// The result of executing a tool call, correlated by call id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (JSON string on success, error text on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// Raw output of a tool session invocation, before correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Tool output text.
    pub content: String,
    /// The tool ran but reported a failure in its payload.
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful output.
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Output flagged as an error.
    #[must_use]
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Attaches a call id, producing the [`ToolResult`] sent back to the model.
    #[must_use]
    pub fn into_result(self, tool_call_id: &str) -> ToolResult {
        ToolResult {
            tool_call_id: tool_call_id.to_string(),
            content: self.content,
            is_error: self.is_error,
        }
    }
}

/// The set of tool descriptors advertised by a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Creates a set from descriptors.
    #[must_use]
    pub const fn new(definitions: Vec<ToolDefinition>) -> Self {
        Self { definitions }
    }

    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if a tool with this name is advertised.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// Comma-separated tool names, for diagnostics.
    #[must_use]
    pub fn names(&self) -> String {
        self.definitions
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_set() -> ToolSet {
        ToolSet::new(vec![ToolDefinition {
            name: "search_pdf".to_string(),
            description: "Search a PDF".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }])
    }

    #[test]
    fn test_toolset_lookup() {
        let ts = sample_set();
        assert_eq!(ts.len(), 1);
        assert!(ts.contains("search_pdf"));
        assert!(!ts.contains("delete_everything"));
        assert_eq!(ts.names(), "search_pdf");
    }

    #[test]
    fn test_toolset_default_is_empty() {
        let ts = ToolSet::default();
        assert!(ts.is_empty());
        assert_eq!(ts.names(), "");
    }

    #[test]
    fn test_tool_output_into_result() {
        let result = ToolOutput::error("bad").into_result("call_9");
        assert_eq!(result.tool_call_id, "call_9");
        assert_eq!(result.content, "bad");
        assert!(result.is_error);
    }

    #[test]
    fn test_tool_call_serialization() {
        let call = ToolCall::new("call_123", "search_pdf", r#"{"pdf_name":"a"}"#);
        let json = serde_json::to_string(&call).unwrap_or_default();
        assert!(json.contains("call_123"));
        assert!(json.contains("search_pdf"));
    }
}
