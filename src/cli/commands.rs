//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

#![allow(clippy::format_push_string)]

use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;

use crate::agent::message::user_message;
use crate::agent::prompt::{default_prompt_path, write_default_prompt};
use crate::agent::{AgentConfig, DialogueToken, Orchestrator};
use crate::cli::output::{OutputFormat, format_outcome, format_search, format_token};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands};
use crate::document::{AttachMode, DocumentsConfigBuilder, ExtractorKind};
use crate::error::{CommandError, Result};
use crate::search::{PdfSearch, SearchArgs, SearchConfig};

/// Parameters for the ask command.
#[derive(Debug, Clone, Default)]
pub struct AskParams<'a> {
    /// The question.
    pub query: &'a str,
    /// Document allow-list; empty attaches everything.
    pub docs: &'a [String],
    /// Stream tokens to stdout as they arrive.
    pub stream: bool,
    /// Maximum model requests.
    pub rounds: Option<usize>,
    /// Attachment mode name.
    pub mode: Option<&'a str>,
    /// System prompt override file.
    pub prompt_file: Option<&'a Path>,
    /// Model identifier.
    pub model: Option<&'a str>,
    /// Default search context window.
    pub context_length: Option<usize>,
    /// Default search match limit.
    pub topk: Option<usize>,
}

/// Executes the CLI command.
///
/// Returns the text to print on stdout. Streaming commands write to stdout
/// themselves and return an empty string.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            query,
            docs,
            stream,
            rounds,
            mode,
            prompt_file,
            model,
            context_length,
            topk,
        } => {
            let params = AskParams {
                query,
                docs,
                stream: *stream,
                rounds: *rounds,
                mode: mode.as_deref(),
                prompt_file: prompt_file.as_deref(),
                model: model.as_deref(),
                context_length: *context_length,
                topk: *topk,
            };
            cmd_ask(cli, &params, format)
        }
        Commands::Search {
            pdf_name,
            query,
            context_length,
            topk,
        } => {
            let args = SearchArgs {
                pdf_name: pdf_name.clone(),
                query: query.clone(),
                context_length: *context_length,
                topk: *topk,
            };
            cmd_search(cli, &args, format)
        }
        Commands::InitPrompt { path } => cmd_init_prompt(path.as_deref(), format),
        #[cfg(feature = "mcp")]
        Commands::Mcp(cmd) => cmd_mcp(cmd, cli),
    }
}

/// Document settings from the environment, overridden by global flags.
fn documents_builder(cli: &Cli) -> Result<DocumentsConfigBuilder> {
    let mut builder = DocumentsConfigBuilder::default().from_env();
    if let Some(ref dir) = cli.files_dir {
        builder = builder.root(dir);
    }
    if let Some(ref extension) = cli.extension {
        builder = builder.extension(extension);
    }
    if let Some(ref extractor) = cli.extractor {
        let kind: ExtractorKind = extractor.parse().map_err(CommandError::InvalidArgument)?;
        builder = builder.extractor(kind);
    }
    Ok(builder)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn cmd_ask(cli: &Cli, params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    let mut documents = documents_builder(cli)?;
    if !params.docs.is_empty() {
        documents = documents.names(params.docs.to_vec());
    }
    if let Some(mode) = params.mode {
        let mode: AttachMode = mode.parse().map_err(CommandError::InvalidArgument)?;
        documents = documents.mode(mode);
    }

    let search = SearchConfig::from_env().with_overrides(params.context_length, params.topk);
    let mut builder = AgentConfig::builder()
        .documents(documents.build())
        .search(search)
        .from_env();
    if let Some(rounds) = params.rounds {
        builder = builder.round_limit(rounds);
    }
    if let Some(model) = params.model {
        builder = builder.model(model);
    }
    if let Some(path) = params.prompt_file {
        builder = builder.system_prompt_file(path);
    }

    let config = builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}"))
    })?;
    let orchestrator = Orchestrator::from_config(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;

    let rt = runtime()?;
    let conversation = vec![user_message(params.query)];

    if params.stream {
        return rt.block_on(async {
            let mut tokens =
                orchestrator.run_streaming(conversation, config.documents.clone(), config.round_limit);
            let stdout = io::stdout();
            let mut failure = None;
            while let Some(token) = tokens.next().await {
                if let DialogueToken::Failed(ref message) = token {
                    failure = Some(message.clone());
                    if format == OutputFormat::Text {
                        continue;
                    }
                }
                let mut handle = stdout.lock();
                handle
                    .write_all(format_token(&token, format).as_bytes())
                    .and_then(|()| handle.flush())
                    .map_err(|e| {
                        CommandError::ExecutionFailed(format!("Failed to write to stdout: {e}"))
                    })?;
            }
            match failure {
                Some(message) => {
                    Err(CommandError::ExecutionFailed(format!("Query failed: {message}")).into())
                }
                None => Ok(String::new()),
            }
        });
    }

    let outcome = rt
        .block_on(orchestrator.run(conversation, &config.documents, config.round_limit))
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;
    Ok(format_outcome(&outcome, format))
}

fn cmd_search(cli: &Cli, args: &SearchArgs, format: OutputFormat) -> Result<String> {
    let documents = documents_builder(cli)?.build();
    let search = PdfSearch::new(documents, SearchConfig::from_env());
    let outcome = search.run(args);
    Ok(format_search(&args.pdf_name, &outcome, format))
}

fn cmd_init_prompt(path: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target = path
        .map(PathBuf::from)
        .or_else(default_prompt_path)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = write_default_prompt(&target).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write system prompt: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written {
                Ok(format!(
                    "Wrote system prompt to: {}\n\nEdit this file to customize the assistant.\n",
                    target.display()
                ))
            } else {
                Ok(format!("System prompt already exists: {}\n", target.display()))
            }
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "path": target.to_string_lossy(),
                "written": written,
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the server is stopped (SSE).
#[cfg(feature = "mcp")]
fn cmd_mcp(cmd: &McpCommands, cli: &Cli) -> Result<String> {
    use crate::mcp::{PdfSearchMcpServer, serve_sse, serve_stdio};

    let documents = documents_builder(cli)?.build();
    let server = PdfSearchMcpServer::new(PdfSearch::new(documents, SearchConfig::from_env()));

    let rt = runtime()?;
    rt.block_on(async {
        match cmd {
            McpCommands::Stdio => serve_stdio(server).await,
            McpCommands::Sse { host, port } => serve_sse(server, host, *port).await,
        }
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}
