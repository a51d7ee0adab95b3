//! Quote search over local documents.
//!
//! [`PdfSearch`] answers one question: does this passage occur in this
//! document, and where? It backs the `search_pdf` tool exposed to the model
//! and over MCP.

pub mod normalize;

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::agent::tool::ToolDefinition;
use crate::document::{DocumentsConfig, TextExtractor, create_extractor};
use crate::error::AgentError;

pub use normalize::{collapse_whitespace, contains_quote, find_matches, letters_only, normalize};

/// Name of the search tool as advertised to the model.
pub const SEARCH_TOOL_NAME: &str = "search_pdf";
/// Default characters of context around each match.
pub const DEFAULT_CONTEXT_WINDOW: usize = 2000;
/// Default maximum number of matches returned.
pub const DEFAULT_MAX_MATCHES: usize = 10;
/// Upper bound on the context window a caller may request.
const MAX_CONTEXT_WINDOW: usize = 20_000;
/// Upper bound on the matches a caller may request.
const MAX_MATCHES: usize = 100;
/// Returned when a document yields no text.
const EMPTY_TEXT_MESSAGE: &str =
    "Extracted text is empty. The PDF might be image-based or corrupted.";

/// Default search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Characters of context around each match.
    pub context_window: usize,
    /// Maximum number of matches returned.
    pub max_matches: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }
}

impl SearchConfig {
    /// Defaults overridden by `PDF_DIALOGUE_CONTEXT_WINDOW` and
    /// `PDF_DIALOGUE_MAX_MATCHES`. Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            context_window: env_usize("PDF_DIALOGUE_CONTEXT_WINDOW")
                .unwrap_or(defaults.context_window),
            max_matches: env_usize("PDF_DIALOGUE_MAX_MATCHES").unwrap_or(defaults.max_matches),
        }
    }

    /// Replaces the limits given explicitly.
    #[must_use]
    pub fn with_overrides(self, context_window: Option<usize>, max_matches: Option<usize>) -> Self {
        Self {
            context_window: context_window.unwrap_or(self.context_window),
            max_matches: max_matches.unwrap_or(self.max_matches),
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Result of a quote search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// The document was found.
    pub file_exists: bool,
    /// The quote occurs in the document.
    pub query_exists: bool,
    /// Context snippets around each occurrence.
    pub matches: Vec<String>,
    /// Why the search could not be carried out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    fn failed(file_exists: bool, message: impl Into<String>) -> Self {
        Self {
            file_exists,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Arguments of the `search_pdf` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    /// Document id (file stem).
    pub pdf_name: String,
    /// Quote to look for.
    pub query: String,
    /// Characters of context around each match.
    #[serde(default)]
    pub context_length: Option<usize>,
    /// Maximum number of matches.
    #[serde(default)]
    pub topk: Option<usize>,
}

static SEARCH_TOOL: LazyLock<ToolDefinition> = LazyLock::new(|| ToolDefinition {
    name: SEARCH_TOOL_NAME.to_string(),
    description: "Check whether a quote occurs in one of the attached PDF documents and \
                  return the surrounding text for each occurrence. Matching ignores case, \
                  whitespace, punctuation and words broken across lines."
        .to_string(),
    parameters: json!({
        "type": "object",
        "properties": {
            "pdf_name": {
                "type": "string",
                "description": "Document name without the file extension."
            },
            "query": {
                "type": "string",
                "description": "Exact passage to look for."
            },
            "context_length": {
                "type": "integer",
                "description": "Characters of context returned around each match. Defaults to 2000.",
                "default": DEFAULT_CONTEXT_WINDOW
            },
            "topk": {
                "type": "integer",
                "description": "Maximum number of matches to return. Defaults to 10.",
                "default": DEFAULT_MAX_MATCHES
            }
        },
        "required": ["pdf_name", "query"],
        "additionalProperties": false
    }),
});

/// Quote search over the documents in one directory.
#[derive(Clone)]
pub struct PdfSearch {
    documents: DocumentsConfig,
    extractor: Arc<dyn TextExtractor>,
    defaults: SearchConfig,
}

impl std::fmt::Debug for PdfSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSearch")
            .field("root", &self.documents.root)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl PdfSearch {
    /// Creates a search over `documents` using its configured extractor.
    #[must_use]
    pub fn new(documents: DocumentsConfig, defaults: SearchConfig) -> Self {
        let extractor = create_extractor(documents.extractor);
        Self {
            documents,
            extractor,
            defaults,
        }
    }

    /// The `search_pdf` tool descriptor.
    #[must_use]
    pub fn descriptor() -> ToolDefinition {
        SEARCH_TOOL.clone()
    }

    /// Directory the documents are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.documents.root
    }

    /// Resolves a document id to its path.
    #[must_use]
    pub fn document_path(&self, document_id: &str) -> Option<PathBuf> {
        self.documents.path_for(document_id)
    }

    /// Ids of the documents available for search, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DocumentLoad`] if the directory cannot be read.
    pub fn list_documents(&self) -> Result<Vec<String>, AgentError> {
        let root = &self.documents.root;
        let entries = std::fs::read_dir(root).map_err(|e| AgentError::DocumentLoad {
            path: root.display().to_string(),
            message: e.to_string(),
        })?;
        let mut ids: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.documents.has_extension(path))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Extracts the full text of a document.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DocumentLoad`] for unknown ids and
    /// [`AgentError::Extraction`] when the text cannot be read.
    pub fn extract(&self, document_id: &str) -> Result<String, AgentError> {
        let path = self
            .document_path(document_id)
            .filter(|p| p.is_file())
            .ok_or_else(|| AgentError::DocumentLoad {
                path: document_id.to_string(),
                message: "document not found".to_string(),
            })?;
        self.extractor.extract(&path)
    }

    /// Runs a tool call with limits defaulted and clamped.
    #[must_use]
    pub fn run(&self, args: &SearchArgs) -> SearchOutcome {
        let context_window = args
            .context_length
            .unwrap_or(self.defaults.context_window)
            .min(MAX_CONTEXT_WINDOW);
        let max_matches = args.topk.unwrap_or(self.defaults.max_matches).min(MAX_MATCHES);
        self.search(&args.pdf_name, &args.query, context_window, max_matches)
    }

    /// Searches `document_id` for `query`.
    ///
    /// A missing document is reported through `file_exists`, not `error`.
    /// A blank query, an extraction failure, or a document with no text
    /// sets `error`.
    #[must_use]
    pub fn search(
        &self,
        document_id: &str,
        query: &str,
        context_window: usize,
        max_matches: usize,
    ) -> SearchOutcome {
        let Some(path) = self.document_path(document_id).filter(|p| p.is_file()) else {
            debug!(document = document_id, "search target not found");
            return SearchOutcome::default();
        };

        if query.trim().is_empty() {
            return SearchOutcome::failed(true, "query must not be empty");
        }

        let text = match self.extractor.extract(&path) {
            Ok(text) => text,
            Err(e) => return SearchOutcome::failed(true, format!("Failed to parse PDF: {e}")),
        };
        if text.trim().is_empty() {
            return SearchOutcome::failed(true, EMPTY_TEXT_MESSAGE);
        }

        let query_exists = contains_quote(&text, query);
        let matches = if query_exists {
            find_matches(&text, query, context_window, max_matches)
        } else {
            Vec::new()
        };
        debug!(
            document = document_id,
            query_exists,
            matches = matches.len(),
            "search complete"
        );

        SearchOutcome {
            file_exists: true,
            query_exists,
            matches,
            error: None,
        }
    }
}
