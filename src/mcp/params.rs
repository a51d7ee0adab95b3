//! MCP tool parameter types.
//!
//! Defines the input schemas for MCP tools using `schemars` for automatic
//! JSON Schema generation required by the MCP protocol.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::search::SearchArgs;

/// Parameters for the `search_pdf` MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchPdfParams {
    /// Document name without the file extension.
    pub pdf_name: String,

    /// Exact passage to look for.
    pub query: String,

    /// Characters of context returned around each match (default 2000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<usize>,

    /// Maximum number of matches to return (default 10).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topk: Option<usize>,
}

impl From<SearchPdfParams> for SearchArgs {
    fn from(params: SearchPdfParams) -> Self {
        Self {
            pdf_name: params.pdf_name,
            query: params.query,
            context_length: params.context_length,
            topk: params.topk,
        }
    }
}
