//! Core data types and error definitions for the ingestion pipeline.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Document encodings the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format, with an OCR fallback for scanned files.
    Pdf,
    /// Office Open XML word-processing package (legacy `.doc` is routed here too).
    Docx,
    /// UTF-8 plain text.
    Txt,
}

impl DocumentFormat {
    /// Lowercase label used in logs, errors, and serialized metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the ingestion core. Every failure is scoped to a single request.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Neither the declared content type nor the filename extension maps to a known format.
    #[error("Unsupported file type: {content_type}")]
    UnsupportedFormat {
        /// Content type as declared by the caller.
        content_type: String,
    },
    /// The format-specific extractor (or the OCR fallback) raised an error.
    #[error("Failed to parse {format}: {cause}")]
    ExtractionFailed {
        /// Format whose extractor failed.
        format: DocumentFormat,
        /// Message reported by the underlying library.
        cause: String,
    },
    /// Input fell outside the accepted bounds.
    #[error("{0}")]
    ValidationFailed(String),
}

impl IngestError {
    pub(crate) fn extraction(format: DocumentFormat, cause: impl fmt::Display) -> Self {
        Self::ExtractionFailed {
            format,
            cause: cause.to_string(),
        }
    }
}

/// Uploaded document as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Declared MIME type; may be empty or generic (`application/octet-stream`).
    pub content_type: String,
    /// Original filename, consulted only for its extension.
    pub filename: String,
    /// Declared size in bytes.
    pub size_bytes: u64,
}

impl RawDocument {
    /// Build a raw document, deriving the declared size from the buffer length.
    pub fn new(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            bytes,
            content_type: content_type.into(),
            filename: filename.into(),
            size_bytes,
        }
    }
}

/// Text and metadata produced by the document extractor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    /// Extracted prose, possibly empty. Not yet normalized.
    #[serde(skip)]
    pub text: String,
    /// Format the document was read as.
    #[serde(rename = "type")]
    pub format: DocumentFormat,
    /// Page count, only reported for PDFs.
    #[serde(rename = "pages", skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Whitespace-token count of `text`.
    pub word_count: usize,
    /// Declared size of the source document in bytes.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Embedded document title, when the format carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Embedded document author, when the format carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Non-fatal extraction notices in the order they were produced.
    pub warnings: Vec<String>,
    /// Whether `text` came from the OCR fallback instead of the PDF text layer.
    pub ocr_applied: bool,
}

impl ExtractedDocument {
    pub(crate) fn new(format: DocumentFormat, text: String, size_bytes: u64) -> Self {
        let word_count = super::words::count_words(&text);
        Self {
            text,
            format,
            page_count: None,
            word_count,
            size_bytes,
            title: None,
            author: None,
            warnings: Vec::new(),
            ocr_applied: false,
        }
    }
}

/// Text that has passed through [`crate::ingest::normalize`].
///
/// Only the normalizer constructs values of this type, so holders can rely on the whitespace
/// and character-set guarantees without re-checking them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    /// Borrow the normalized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the normalized text.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether normalization left nothing behind.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whitespace-token count, computed the same way as extraction metadata.
    pub fn word_count(&self) -> usize {
        super::words::count_words(&self.0)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of running a document through extraction and normalization.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Extraction metadata; `document.text` holds the raw, pre-normalization text.
    pub document: ExtractedDocument,
    /// Normalized text ready for the summarizer.
    pub text: NormalizedText,
}
