//! Turns local documents into content blocks for the first user turn.
//!
//! Every attached document produces two adjacent blocks: a text block naming
//! the file, then the document block itself. Missing, oversized and
//! unreadable files are skipped with a warning; only an unreadable document
//! directory fails the load.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, warn};

use crate::agent::message::{ChatMessage, ContentBlock, DocumentSource};
use crate::error::AgentError;

use super::extract::{TextExtractor, create_extractor};
use super::{AttachMode, DocumentsConfig};

/// Blocks produced by a load, plus the warnings raised while producing them.
#[derive(Debug, Clone, Default)]
pub struct LoadedDocuments {
    /// Naming and document blocks, two per attached document.
    pub blocks: Vec<ContentBlock>,
    /// Ids of the documents that were attached, in block order.
    pub attached: Vec<String>,
    /// One entry per skipped document.
    pub warnings: Vec<String>,
}

impl LoadedDocuments {
    /// Appends the blocks to the end of `message`'s content.
    pub fn attach_to(self, message: &mut ChatMessage) {
        message.content.extend(self.blocks);
    }

    fn skip(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Loads documents according to a [`DocumentsConfig`].
#[derive(Clone)]
pub struct DocumentLoader {
    config: DocumentsConfig,
    extractor: Arc<dyn TextExtractor>,
}

impl std::fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DocumentLoader {
    /// Creates a loader using the extractor named in `config`.
    #[must_use]
    pub fn new(config: DocumentsConfig) -> Self {
        let extractor = create_extractor(config.extractor);
        Self { config, extractor }
    }

    /// Loads the configured root and name filter.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DocumentLoad`] if the document directory cannot be read.
    pub fn load(&self) -> Result<LoadedDocuments, AgentError> {
        self.load_from(&self.config.root, self.config.names.as_deref())
    }

    /// Loads documents from `root`, restricted to `names` when given.
    ///
    /// Without a filter, every file with the configured extension is attached
    /// in directory-listing order. With a filter, documents are attached in
    /// filter order and missing names are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DocumentLoad`] if `root` cannot be listed.
    pub fn load_from(
        &self,
        root: &Path,
        names: Option<&[String]>,
    ) -> Result<LoadedDocuments, AgentError> {
        let mut loaded = LoadedDocuments::default();
        let candidates = match names {
            Some(names) => self.named_candidates(root, names, &mut loaded),
            None => self.listed_candidates(root)?,
        };

        for (id, path) in candidates {
            match self.attach(&path) {
                Ok(Some(document)) => {
                    debug!(document = %id, path = %path.display(), "attached document");
                    loaded.blocks.push(ContentBlock::text(naming_line(&path)));
                    loaded.blocks.push(document);
                    loaded.attached.push(id);
                }
                Ok(None) => loaded.skip(format!(
                    "Skipping {}: larger than {} bytes",
                    path.display(),
                    self.config.max_inline_bytes
                )),
                Err(e) => loaded.skip(format!("Skipping {}: {e}", path.display())),
            }
        }

        Ok(loaded)
    }

    fn listed_candidates(&self, root: &Path) -> Result<Vec<(String, PathBuf)>, AgentError> {
        let entries = fs::read_dir(root).map_err(|e| AgentError::DocumentLoad {
            path: root.display().to_string(),
            message: e.to_string(),
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !path.is_file() || !self.config.has_extension(&path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                candidates.push((stem.to_string(), path.clone()));
            }
        }
        Ok(candidates)
    }

    fn named_candidates(
        &self,
        root: &Path,
        names: &[String],
        loaded: &mut LoadedDocuments,
    ) -> Vec<(String, PathBuf)> {
        let config = DocumentsConfig {
            root: root.to_path_buf(),
            ..self.config.clone()
        };
        let mut candidates = Vec::new();
        for name in names {
            match config.path_for(name) {
                Some(path) if path.is_file() => {
                    candidates.push((config.document_id(name).to_string(), path));
                }
                Some(path) => loaded.skip(format!("Requested document not found: {}", path.display())),
                None => loaded.skip(format!("Invalid document name: {name}")),
            }
        }
        candidates
    }

    /// Produces the document block, or `None` when the file is over the size ceiling.
    fn attach(&self, path: &Path) -> Result<Option<ContentBlock>, AgentError> {
        let size = fs::metadata(path)
            .map_err(|e| AgentError::DocumentLoad {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
            .len();
        if size > self.config.max_inline_bytes {
            return Ok(None);
        }

        let source = match self.config.mode {
            AttachMode::Binary => {
                let bytes = fs::read(path).map_err(|e| AgentError::DocumentLoad {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                DocumentSource::Base64 {
                    media_type: self.config.media_type().to_string(),
                    data: BASE64.encode(bytes),
                }
            }
            AttachMode::Text => DocumentSource::Text {
                text: self.extractor.extract(path)?,
            },
        };
        Ok(Some(ContentBlock::Document { source }))
    }
}

fn naming_line(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    format!("--- Attached document: {file_name} ---")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::Role;
    use crate::document::ExtractorKind;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &[u8]) {
        fs::write(dir.join(name), content).unwrap_or_else(|e| panic!("write {name}: {e}"));
    }

    fn text_config(root: &Path) -> DocumentsConfig {
        DocumentsConfig::builder()
            .root(root)
            .extension("txt")
            .extractor(ExtractorKind::Plain)
            .build()
    }

    #[test]
    fn test_load_all_pairs_naming_and_document_blocks() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write(dir.path(), "a.txt", b"alpha text");
        write(dir.path(), "b.txt", b"beta text");
        write(dir.path(), "ignored.md", b"not attached");

        let loaded = DocumentLoader::new(text_config(dir.path()))
            .load()
            .unwrap_or_else(|e| panic!("load: {e}"));

        assert_eq!(loaded.blocks.len(), 4);
        assert_eq!(loaded.attached.len(), 2);
        for pair in loaded.blocks.chunks(2) {
            let label = pair[0].as_text().unwrap_or_default();
            assert!(label.starts_with("--- Attached document: "));
            assert!(matches!(
                &pair[1],
                ContentBlock::Document {
                    source: DocumentSource::Text { .. }
                }
            ));
        }
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_load_named_in_filter_order_and_warns_on_missing() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write(dir.path(), "a.txt", b"alpha");
        write(dir.path(), "b.txt", b"beta");

        let names = vec!["b".to_string(), "ghost".to_string(), "a".to_string()];
        let loaded = DocumentLoader::new(text_config(dir.path()))
            .load_from(dir.path(), Some(&names))
            .unwrap_or_else(|e| panic!("load: {e}"));

        assert_eq!(loaded.attached, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(loaded.blocks[0].as_text(), Some("--- Attached document: b.txt ---"));
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("ghost"));
    }

    #[test]
    fn test_oversized_document_is_skipped() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write(dir.path(), "big.txt", &[b'x'; 64]);
        write(dir.path(), "small.txt", b"ok");

        let config = DocumentsConfig {
            max_inline_bytes: 16,
            ..text_config(dir.path())
        };
        let loaded = DocumentLoader::new(config)
            .load()
            .unwrap_or_else(|e| panic!("load: {e}"));

        assert_eq!(loaded.attached, vec!["small".to_string()]);
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn test_binary_mode_base64_encodes() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write(dir.path(), "doc.pdf", b"%PDF-1.4 fake");

        let config = DocumentsConfig::builder()
            .root(dir.path())
            .mode(AttachMode::Binary)
            .build();
        let loaded = DocumentLoader::new(config)
            .load()
            .unwrap_or_else(|e| panic!("load: {e}"));

        match &loaded.blocks[1] {
            ContentBlock::Document {
                source: DocumentSource::Base64 { media_type, data },
            } => {
                assert_eq!(media_type, "application/pdf");
                assert_eq!(data, &BASE64.encode(b"%PDF-1.4 fake"));
            }
            other => panic!("expected base64 document, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let loader = DocumentLoader::new(DocumentsConfig::new("/nonexistent/pdf-dialogue-root"));
        assert!(matches!(loader.load(), Err(AgentError::DocumentLoad { .. })));
    }

    #[test]
    fn test_named_file_name_and_uppercase_extension_resolve() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write(dir.path(), "Report.TXT", b"quarterly figures");
        write(dir.path(), "notes.txt", b"meeting notes");

        let names = vec!["Report".to_string(), "notes.txt".to_string()];
        let loaded = DocumentLoader::new(text_config(dir.path()))
            .load_from(dir.path(), Some(&names))
            .unwrap_or_else(|e| panic!("load: {e}"));

        assert_eq!(loaded.attached, vec!["Report".to_string(), "notes".to_string()]);
        assert_eq!(loaded.blocks[0].as_text(), Some("--- Attached document: Report.TXT ---"));
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_attach_to_appends_after_existing_blocks() {
        let mut message = ChatMessage::new(Role::User, vec![ContentBlock::text("question")]);
        let loaded = LoadedDocuments {
            blocks: vec![ContentBlock::text("--- Attached document: x.pdf ---")],
            attached: vec!["x".to_string()],
            warnings: Vec::new(),
        };
        loaded.attach_to(&mut message);
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.content[0].as_text(), Some("question"));
    }
}
