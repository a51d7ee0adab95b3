//! Error types for pdf-dialogue.
//!
//! [`AgentError`] covers everything that can go wrong while driving a
//! dialogue: configuration, the model boundary, tool sessions, and document
//! handling. [`CommandError`] is the CLI layer's wrapper. Both fold into the
//! crate-level [`Error`].

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Dialogue, model or tool failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem or stream I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while orchestrating a dialogue.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The caller supplied an unusable conversation or limit.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input.
        message: String,
    },

    /// No API key was configured for the model provider.
    #[error("API key missing: set OPENAI_API_KEY or PDF_DIALOGUE_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name has no implementation.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// The model request failed or was rejected.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error text.
        message: String,
        /// HTTP status when the provider reported one.
        status: Option<u16>,
    },

    /// The model event stream broke mid-response.
    #[error("stream error: {message}")]
    Stream {
        /// Provider error text.
        message: String,
    },

    /// A tool invocation failed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// The tool session could not be opened or used.
    #[error("tool session error: {message}")]
    Session {
        /// Failure detail.
        message: String,
    },

    /// The document directory could not be enumerated.
    #[error("failed to load documents from {path}: {message}")]
    DocumentLoad {
        /// Directory or file path.
        path: String,
        /// Failure detail.
        message: String,
    },

    /// Text extraction from a document failed.
    #[error("failed to extract text from {path}: {message}")]
    Extraction {
        /// Document path.
        path: String,
        /// Failure detail.
        message: String,
    },

    /// A content block cannot be sent to the configured provider.
    #[error("unsupported content: {message}")]
    UnsupportedContent {
        /// Which block was rejected and why.
        message: String,
    },

    /// The consumer stopped listening before the dialogue finished.
    #[error("dialogue cancelled by consumer")]
    Cancelled,
}

/// Errors raised by CLI command handlers.
#[derive(Debug, Error)]
pub enum CommandError {
    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The command could not run to completion.
    #[error("command failed: {0}")]
    ExecutionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_display() {
        let err = AgentError::ToolExecution {
            name: "search_pdf".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "tool 'search_pdf' failed: boom");
    }

    #[test]
    fn test_error_from_agent_error_is_transparent() {
        let err: Error = AgentError::ApiKeyMissing.into();
        assert!(err.to_string().starts_with("API key missing"));
    }

    #[test]
    fn test_error_from_io() {
        let err: Error = std::io::Error::other("disk gone").into();
        assert!(err.to_string().contains("disk gone"));
    }
}
