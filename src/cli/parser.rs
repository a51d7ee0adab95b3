//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pdf-dialogue: ask a model questions about local PDF documents.
///
/// Attaches the documents to the conversation and lets the model verify
/// quotations with the `search_pdf` tool before answering.
#[derive(Parser, Debug)]
#[command(name = "pdf-dialogue")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the documents.
    ///
    /// Defaults to `PDF_DIALOGUE_FILES_DIR`, then `FILES_DIR`, then `./files`.
    #[arg(short = 'd', long, global = true)]
    pub files_dir: Option<PathBuf>,

    /// Document file extension (default: pdf).
    #[arg(long, global = true)]
    pub extension: Option<String>,

    /// Text extractor: pdf, plain.
    #[arg(long, global = true)]
    pub extractor: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about the documents.
    ///
    /// Every document in the documents directory is attached unless `--doc`
    /// narrows the set. Requires an OpenAI-compatible API key.
    #[command(after_help = r#"Examples:
  pdf-dialogue ask "What does the report say about X?"
  pdf-dialogue ask "Summarize section 2" --doc report --stream
  pdf-dialogue -d ./papers ask "Who are the authors?" --rounds 3
  pdf-dialogue --format json ask "List the key findings" | jq '.text'
  OPENAI_API_KEY=sk-... pdf-dialogue ask "Quote the conclusion" --model gpt-4o-mini
"#)]
    Ask {
        /// The question to ask.
        query: String,

        /// Attach only this document, by id or file name. Repeatable.
        #[arg(long = "doc", value_name = "NAME")]
        docs: Vec<String>,

        /// Print tokens as they arrive.
        #[arg(short, long)]
        stream: bool,

        /// Maximum model requests for the dialogue.
        #[arg(short, long)]
        rounds: Option<usize>,

        /// How documents are attached: text, binary.
        #[arg(long)]
        mode: Option<String>,

        /// File holding a system prompt that replaces the built-in one.
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Model identifier.
        #[arg(short, long)]
        model: Option<String>,

        /// Default characters of context around each search match.
        #[arg(long)]
        context_length: Option<usize>,

        /// Default maximum number of search matches.
        #[arg(short = 'k', long)]
        topk: Option<usize>,
    },

    /// Search one document for a quote, without a model.
    #[command(after_help = r#"Examples:
  pdf-dialogue search report "X is defined as Y"
  pdf-dialogue search report "results" --context-length 200 -k 3
  pdf-dialogue --format json search report "abstract" | jq '.matches'
"#)]
    Search {
        /// Document id (file name without extension).
        pdf_name: String,

        /// Quote to look for.
        query: String,

        /// Characters of context around each match.
        #[arg(long)]
        context_length: Option<usize>,

        /// Maximum number of matches.
        #[arg(short = 'k', long)]
        topk: Option<usize>,
    },

    /// Write the built-in system prompt to a file for editing.
    ///
    /// Defaults to `~/.config/pdf-dialogue/system.md`. Existing files are
    /// left untouched.
    InitPrompt {
        /// Target file.
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Start MCP (Model Context Protocol) server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// MCP server subcommands.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  pdf-dialogue mcp stdio                   # Serve ./files over stdio
  pdf-dialogue -d ./papers mcp stdio
"#)]
    Stdio,

    /// Start MCP server with SSE/HTTP transport.
    ///
    /// Listens for incoming HTTP connections using streamable HTTP transport.
    #[command(after_help = r#"Examples:
  pdf-dialogue mcp sse                      # Listen on 127.0.0.1:3000
  pdf-dialogue mcp sse --host 0.0.0.0 --port 8080
"#)]
    Sse {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}
