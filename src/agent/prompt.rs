//! System prompt for the dialogue model.
//!
//! The prompt can be replaced by a markdown file; the compiled-in default
//! is used whenever no file is found.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Default prompt location under the user's home directory.
const DEFAULT_PROMPT_FILE: &str = ".config/pdf-dialogue/system.md";

/// Built-in system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert research assistant. The user's \
documents are attached to the conversation. When quoting or sourcing facts from a document, \
call the search_pdf tool first to confirm the passage exists before answering. Use the search \
results to provide accurate and concise answers based only on the provided document content. \
If the documents don't contain the answer, say so explicitly.";

/// Loads the system prompt, falling back to [`DEFAULT_SYSTEM_PROMPT`].
///
/// Resolution order:
/// 1. Explicit `path` (from `--prompt-file` or `PDF_DIALOGUE_PROMPT_FILE`)
/// 2. `~/.config/pdf-dialogue/system.md`
///
/// A file that exists but is blank is ignored. An explicit path that cannot
/// be read logs a warning.
#[must_use]
pub fn load_system_prompt(path: Option<&Path>) -> String {
    let content = match path {
        Some(explicit) => match std::fs::read_to_string(explicit) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(
                    path = %explicit.display(),
                    error = %e,
                    "cannot read system prompt file, using the built-in prompt"
                );
                None
            }
        },
        None => default_prompt_path().and_then(|p| std::fs::read_to_string(p).ok()),
    };
    content
        .filter(|content| !content.trim().is_empty())
        .inspect(|_| debug!("loaded system prompt from file"))
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
}

/// Returns the default prompt file path under the user's home.
///
/// Returns `None` if the home directory cannot be determined.
#[must_use]
pub fn default_prompt_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_FILE))
}

/// Writes the built-in prompt to `path` for editing.
///
/// Returns `false` without touching the file if it already exists.
///
/// # Errors
///
/// Returns an I/O error if the directory or file cannot be written.
pub fn write_default_prompt(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_SYSTEM_PROMPT)?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_default_prompt_mentions_tool() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("search_pdf"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "Be terse.").unwrap_or_else(|e| panic!("write: {e}"));
        assert_eq!(load_system_prompt(Some(&path)), "Be terse.");
    }

    #[test]
    fn test_blank_file_falls_back() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "  \n").unwrap_or_else(|e| panic!("write: {e}"));
        assert_eq!(load_system_prompt(Some(&path)), DEFAULT_SYSTEM_PROMPT);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut bytes) = self.0.lock() {
                bytes.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unreadable_explicit_file_warns_and_falls_back() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let missing = dir.path().join("absent.md");

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let prompt =
            tracing::subscriber::with_default(subscriber, || load_system_prompt(Some(&missing)));

        assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
        let logged = captured
            .0
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        assert!(logged.contains("WARN"), "log: {logged}");
        assert!(logged.contains("cannot read system prompt file"), "log: {logged}");
    }

    #[test]
    fn test_write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("nested").join("system.md");
        assert!(write_default_prompt(&path).unwrap_or_else(|e| panic!("write: {e}")));
        std::fs::write(&path, "custom").unwrap_or_else(|e| panic!("write: {e}"));
        assert!(!write_default_prompt(&path).unwrap_or_else(|e| panic!("write: {e}")));
        assert_eq!(load_system_prompt(Some(&path)), "custom");
    }
}
