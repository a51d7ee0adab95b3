//! pdf-dialogue CLI entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use pdf_dialogue::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    // stdout carries answers and MCP messages
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                let mut stdout = std::io::stdout().lock();
                if stdout.write_all(output.as_bytes()).and_then(|()| stdout.flush()).is_err() {
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "Error: {e}");
            ExitCode::FAILURE
        }
    }
}
