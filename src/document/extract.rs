//! Text extraction from document files.

use std::path::Path;
use std::sync::Arc;

use crate::error::AgentError;

use super::ExtractorKind;

/// Pulls plain text out of a document file.
pub trait TextExtractor: Send + Sync {
    /// Extracts the full text of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Extraction`] if the file cannot be read or parsed.
    fn extract(&self, path: &Path) -> Result<String, AgentError>;
}

/// Extracts text from PDF files with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, AgentError> {
        // pdf-extract panics on some malformed inputs
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text(path));
        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(extraction_error(path, e.to_string())),
            Err(_) => Err(extraction_error(path, "PDF parser aborted on malformed input")),
        }
    }
}

/// Reads files as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, AgentError> {
        std::fs::read_to_string(path).map_err(|e| extraction_error(path, e.to_string()))
    }
}

/// Creates the extractor for `kind`.
#[must_use]
pub fn create_extractor(kind: ExtractorKind) -> Arc<dyn TextExtractor> {
    match kind {
        ExtractorKind::Pdf => Arc::new(PdfTextExtractor),
        ExtractorKind::Plain => Arc::new(PlainTextExtractor),
    }
}

fn extraction_error(path: &Path, message: impl Into<String>) -> AgentError {
    AgentError::Extraction {
        path: path.display().to_string(),
        message: message.into(),
    }
}
