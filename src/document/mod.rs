//! Local document handling.
//!
//! Documents live in a single directory and are identified by file stem.
//! The [`loader`] turns them into content blocks for the first user turn;
//! [`extract`] turns them into plain text for attachment and search.

pub mod extract;
pub mod loader;

use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use extract::{PdfTextExtractor, PlainTextExtractor, TextExtractor, create_extractor};
pub use loader::{DocumentLoader, LoadedDocuments};

/// Default document directory, relative to the working directory.
pub const DEFAULT_DOCUMENTS_DIR: &str = "./files";
/// Default document file extension.
pub const DEFAULT_EXTENSION: &str = "pdf";
/// Default per-document inline size ceiling (10 MiB).
pub const DEFAULT_MAX_INLINE_BYTES: u64 = 10 * 1024 * 1024;

/// How documents are attached to the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttachMode {
    /// Extract text and attach it.
    #[default]
    Text,
    /// Attach the raw file bytes, base64-encoded.
    Binary,
}

impl FromStr for AttachMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "binary" => Ok(Self::Binary),
            other => Err(format!("unknown attach mode '{other}' (expected text or binary)")),
        }
    }
}

/// Which text extractor to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractorKind {
    /// PDF text extraction.
    #[default]
    Pdf,
    /// Read the file as UTF-8 text.
    Plain,
}

impl FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "plain" | "text" => Ok(Self::Plain),
            other => Err(format!("unknown extractor '{other}' (expected pdf or plain)")),
        }
    }
}

/// Where documents come from and how they are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentsConfig {
    /// Directory holding the documents.
    pub root: PathBuf,
    /// Restrict attachment to these document ids (file stems). `None` attaches all.
    pub names: Option<Vec<String>>,
    /// File extension, without the dot, matched case-insensitively.
    pub extension: String,
    /// Attachment mode.
    pub mode: AttachMode,
    /// Text extractor used in text mode and by the search tool.
    pub extractor: ExtractorKind,
    /// Documents larger than this are skipped with a warning.
    pub max_inline_bytes: u64,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_DOCUMENTS_DIR),
            names: None,
            extension: DEFAULT_EXTENSION.to_string(),
            mode: AttachMode::default(),
            extractor: ExtractorKind::default(),
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
        }
    }
}

impl DocumentsConfig {
    /// Creates a configuration rooted at `root` with default settings.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> DocumentsConfigBuilder {
        DocumentsConfigBuilder::default()
    }

    /// Strips a trailing configured extension from a file name, giving its id.
    #[must_use]
    pub fn document_id<'a>(&self, name: &'a str) -> &'a str {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.eq_ignore_ascii_case(&self.extension) => {
                stem
            }
            _ => name,
        }
    }

    /// Resolves a document id (or file name) to its path under the root.
    ///
    /// The file on disk wins when its extension differs in case from the
    /// configured one. Ids that could escape the root (path separators, `..`)
    /// resolve to `None`.
    #[must_use]
    pub fn path_for(&self, id: &str) -> Option<PathBuf> {
        let id = self.document_id(id);
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return None;
        }
        let exact = self.root.join(format!("{id}.{}", self.extension));
        if exact.is_file() {
            return Some(exact);
        }
        Some(self.find_on_disk(id).unwrap_or(exact))
    }

    fn find_on_disk(&self, id: &str) -> Option<PathBuf> {
        std::fs::read_dir(&self.root)
            .ok()?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .find(|path| {
                path.is_file()
                    && self.has_extension(path)
                    && path.file_stem().and_then(|s| s.to_str()) == Some(id)
            })
    }

    /// Returns `true` if `path` carries the configured extension.
    #[must_use]
    pub fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    /// MIME type used when attaching raw bytes.
    #[must_use]
    pub fn media_type(&self) -> &'static str {
        match self.extension.to_ascii_lowercase().as_str() {
            "pdf" => "application/pdf",
            "txt" | "text" | "md" => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

/// Builder for [`DocumentsConfig`].
///
/// Resolution order: explicit values, then environment variables, then defaults.
#[derive(Debug, Clone, Default)]
pub struct DocumentsConfigBuilder {
    root: Option<PathBuf>,
    names: Option<Vec<String>>,
    extension: Option<String>,
    mode: Option<AttachMode>,
    extractor: Option<ExtractorKind>,
    max_inline_bytes: Option<u64>,
}

impl DocumentsConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.root.is_none() {
            self.root = std::env::var("PDF_DIALOGUE_FILES_DIR")
                .or_else(|_| std::env::var("FILES_DIR"))
                .ok()
                .map(PathBuf::from);
        }
        if self.mode.is_none() {
            self.mode = std::env::var("PDF_DIALOGUE_ATTACH_MODE")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_inline_bytes.is_none() {
            self.max_inline_bytes = std::env::var("PDF_DIALOGUE_MAX_INLINE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        self
    }

    /// Sets the document directory.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Restricts attachment to the named documents.
    #[must_use]
    pub fn names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    /// Sets the file extension (without the dot).
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into().trim_start_matches('.').to_string());
        self
    }

    /// Sets the attachment mode.
    #[must_use]
    pub const fn mode(mut self, mode: AttachMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the text extractor.
    #[must_use]
    pub const fn extractor(mut self, extractor: ExtractorKind) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Sets the inline size ceiling in bytes.
    #[must_use]
    pub const fn max_inline_bytes(mut self, bytes: u64) -> Self {
        self.max_inline_bytes = Some(bytes);
        self
    }

    /// Builds the [`DocumentsConfig`].
    #[must_use]
    pub fn build(self) -> DocumentsConfig {
        let defaults = DocumentsConfig::default();
        DocumentsConfig {
            root: self.root.unwrap_or(defaults.root),
            names: self.names,
            extension: self.extension.unwrap_or(defaults.extension),
            mode: self.mode.unwrap_or(defaults.mode),
            extractor: self.extractor.unwrap_or(defaults.extractor),
            max_inline_bytes: self.max_inline_bytes.unwrap_or(defaults.max_inline_bytes),
        }
    }
}
