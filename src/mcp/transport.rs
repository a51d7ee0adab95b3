//! Serving the search server over stdio or HTTP.
//!
//! Over HTTP the MCP endpoint lives at `/mcp` next to a `/health` route
//! that reports how many documents the server can see.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::search::PdfSearch;

use super::server::PdfSearchMcpServer;

/// Runs `server` over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the MCP handshake or the session fails.
pub async fn serve_stdio(server: PdfSearchMcpServer) -> anyhow::Result<()> {
    debug!("serving MCP over stdio");
    server.serve(stdio()).await?.waiting().await?;
    Ok(())
}

/// Runs `server` over streamable HTTP on `host:port` until Ctrl-C.
///
/// Kept under the `sse` name used by the CLI; the wire protocol is MCP's
/// streamable HTTP transport.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or serving fails.
pub async fn serve_sse(server: PdfSearchMcpServer, host: &str, port: u16) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let app = router(server, &shutdown);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Visible at the default log level
    #[allow(clippy::print_stderr)]
    {
        eprintln!("pdf-dialogue search server on http://{addr}/mcp (health: /health)");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C; stopping");
            }
            shutdown.cancel();
        })
        .await?;
    Ok(())
}

/// Builds the HTTP routes. Every MCP session shares `server`'s search.
fn router(server: PdfSearchMcpServer, shutdown: &CancellationToken) -> Router {
    let search = server.search();
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: shutdown.child_token(),
            ..Default::default()
        },
    );

    Router::new()
        .route("/health", get(health))
        .with_state(search)
        .nest_service("/mcp", mcp)
}

async fn health(State(search): State<Arc<PdfSearch>>) -> Json<Value> {
    let listed = tokio::task::spawn_blocking(move || search.list_documents()).await;
    let body = match listed {
        Ok(Ok(ids)) => json!({
            "status": "healthy",
            "service": "pdf-dialogue-mcp",
            "documents": ids.len(),
        }),
        Ok(Err(e)) => json!({
            "status": "degraded",
            "service": "pdf-dialogue-mcp",
            "error": e.to_string(),
        }),
        Err(e) => json!({
            "status": "degraded",
            "service": "pdf-dialogue-mcp",
            "error": format!("listing task failed: {e}"),
        }),
    };
    Json(body)
}
