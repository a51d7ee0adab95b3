//! CLI layer for pdf-dialogue.
//!
//! Provides the command-line interface using clap, with commands for
//! asking questions, searching documents directly, and serving the search
//! tool over MCP.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "mcp")]
pub use parser::McpCommands;
pub use parser::{Cli, Commands};
