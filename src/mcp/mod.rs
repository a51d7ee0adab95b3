//! MCP (Model Context Protocol) server for pdf-dialogue.
//!
//! Exposes the `search_pdf` tool and the documents directory to external
//! agents, so a client can verify quotations without running a dialogue.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag:
//! ```toml
//! [dependencies]
//! pdf-dialogue = { version = "...", features = ["mcp"] }
//! ```
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ search_pdf(pdf_name, query, context_length, topk)
//! PdfSearchMcpServer
//!   ↓ spawn_blocking (text extraction is synchronous)
//! PdfSearch::run
//!   ↓
//! SearchOutcome JSON → MCP Client
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::SearchPdfParams;
pub use server::PdfSearchMcpServer;
pub use transport::{serve_sse, serve_stdio};
