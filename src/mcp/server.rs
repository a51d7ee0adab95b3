//! MCP server implementation for pdf-dialogue.
//!
//! Exposes quote search as the `search_pdf` MCP tool and the documents
//! directory as MCP resources. Text extraction is synchronous, so every
//! request runs on the blocking pool.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourceTemplatesResult,
    ListResourcesResult, PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
    ReadResourceRequestParams, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use tracing::debug;

use crate::error::AgentError;
use crate::search::{PdfSearch, SearchArgs, SearchOutcome};

use super::params::SearchPdfParams;

/// URI scheme for document resources.
const URI_SCHEME: &str = "pdf-dialogue://";

/// pdf-dialogue MCP server.
///
/// Provides the `search_pdf` tool and one resource per document holding its
/// extracted text.
#[derive(Clone)]
pub struct PdfSearchMcpServer {
    tool_router: ToolRouter<Self>,
    search: Arc<PdfSearch>,
}

impl std::fmt::Debug for PdfSearchMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSearchMcpServer")
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

#[tool_router]
impl PdfSearchMcpServer {
    /// Check whether a quote occurs in a document.
    #[tool(
        name = "search_pdf",
        description = "Check whether a quote occurs in a PDF document and return the surrounding text for each occurrence. Matching ignores case, whitespace, punctuation and words broken across lines. Returns JSON with file_exists, query_exists, matches and, on failure, error."
    )]
    async fn search_pdf(
        &self,
        Parameters(params): Parameters<SearchPdfParams>,
    ) -> Result<CallToolResult, McpError> {
        let args = SearchArgs::from(params);
        let outcome = self.run_search(args).await?;

        let json = serde_json::to_string(&outcome)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        if outcome.error.is_some() {
            Ok(CallToolResult::error(vec![Content::text(json)]))
        } else {
            Ok(CallToolResult::success(vec![Content::text(json)]))
        }
    }
}

#[tool_handler]
impl ServerHandler for PdfSearchMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "pdf-dialogue".to_string(),
                title: Some("PDF Searcher".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Use `search_pdf` to confirm that a passage occurs in a document before \
                 quoting it. Documents are listed as resources; reading one returns its \
                 extracted text."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let search = self.search.clone();
        let ids = tokio::task::spawn_blocking(move || search.list_documents())
            .await
            .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))?
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let resources = ids
            .into_iter()
            .map(|id| {
                let mut raw = RawResource::new(format!("{URI_SCHEME}{id}"), id.clone());
                raw.description = Some(format!("Extracted text of {id}"));
                raw.mime_type = Some("text/plain".to_string());
                raw.no_annotation()
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParams { uri, .. }: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let id = uri
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| {
                McpError::invalid_params(
                    format!("Invalid URI scheme, expected {URI_SCHEME}: {uri}"),
                    None,
                )
            })?
            .to_string();

        let search = self.search.clone();
        let text = tokio::task::spawn_blocking(move || search.extract(&id))
            .await
            .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))?
            .map_err(|e| match e {
                AgentError::DocumentLoad { .. } => McpError::resource_not_found(e.to_string(), None),
                other => McpError::internal_error(other.to_string(), None),
            })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let template = RawResourceTemplate {
            uri_template: format!("{URI_SCHEME}{{pdf_name}}"),
            name: "Document text".to_string(),
            title: None,
            description: Some("Returns the extracted text of the named document.".to_string()),
            mime_type: Some("text/plain".to_string()),
            icons: None,
        };

        Ok(ListResourceTemplatesResult {
            resource_templates: vec![template.no_annotation()],
            next_cursor: None,
            meta: None,
        })
    }
}

impl PdfSearchMcpServer {
    /// Creates a new MCP server over `search`.
    #[must_use]
    pub fn new(search: PdfSearch) -> Self {
        Self {
            tool_router: Self::tool_router(),
            search: Arc::new(search),
        }
    }

    /// The search shared by every session of this server.
    pub(crate) fn search(&self) -> Arc<PdfSearch> {
        Arc::clone(&self.search)
    }

    async fn run_search(&self, args: SearchArgs) -> Result<SearchOutcome, McpError> {
        let search = self.search.clone();
        debug!(document = %args.pdf_name, "mcp search_pdf");
        tokio::task::spawn_blocking(move || search.run(&args))
            .await
            .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::document::{DocumentsConfig, ExtractorKind};
    use crate::search::SearchConfig;
    use tempfile::TempDir;

    fn server() -> (TempDir, PdfSearchMcpServer) {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("report.txt"), "The answer is forty-two.")
            .unwrap_or_else(|e| panic!("write: {e}"));
        let documents = DocumentsConfig::builder()
            .root(dir.path())
            .extension("txt")
            .extractor(ExtractorKind::Plain)
            .build();
        let search = PdfSearch::new(documents, SearchConfig::default());
        (dir, PdfSearchMcpServer::new(search))
    }

    fn params(pdf_name: &str, query: &str) -> Parameters<SearchPdfParams> {
        Parameters(SearchPdfParams {
            pdf_name: pdf_name.to_string(),
            query: query.to_string(),
            context_length: None,
            topk: None,
        })
    }

    #[test]
    fn test_router_lists_search_tool() {
        let (_dir, server) = server();
        let names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["search_pdf".to_string()]);
        assert_eq!(server.get_info().server_info.name, "pdf-dialogue");
    }

    #[tokio::test]
    async fn test_search_pdf_tool_finds_quote() {
        let (_dir, server) = server();
        let result = server
            .search_pdf(params("report", "answer is forty two"))
            .await
            .unwrap_or_else(|e| panic!("tool failed: {e:?}"));
        assert_ne!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_search_pdf_blank_query_is_tool_error() {
        let (_dir, server) = server();
        let result = server
            .search_pdf(params("report", "   "))
            .await
            .unwrap_or_else(|e| panic!("tool failed: {e:?}"));
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_run_search_missing_document() {
        let (_dir, server) = server();
        let outcome = server
            .run_search(SearchArgs::from(params("absent", "x").0))
            .await
            .unwrap_or_else(|e| panic!("search failed: {e:?}"));
        assert!(!outcome.file_exists);
        assert!(outcome.error.is_none());
    }
}
