//! Format-specific text extraction.
//!
//! [`extract`] resolves the document format once and hands the bytes to the matching reader.
//! Readers either return a complete [`ExtractedDocument`] or fail; there is no partial result.

mod docx;
pub mod ocr;
pub mod pdf;
mod text;

use super::format::resolve_format;
use super::types::{DocumentFormat, ExtractedDocument, IngestError, RawDocument};
use ocr::OcrProvider;

/// Extract raw text and metadata from an uploaded document.
///
/// Blocking: PDF parsing and OCR are CPU-bound, so async callers should run this on a
/// blocking thread.
pub fn extract(
    raw: &RawDocument,
    ocr: &dyn OcrProvider,
) -> Result<ExtractedDocument, IngestError> {
    let format = resolve_format(&raw.content_type, &raw.filename)?;
    tracing::debug!(
        format = %format,
        bytes = raw.bytes.len(),
        filename = %raw.filename,
        "Extracting document"
    );

    let document = match format {
        DocumentFormat::Pdf => pdf::extract_pdf(&raw.bytes, raw.size_bytes, ocr)?,
        DocumentFormat::Docx => docx::extract_docx(&raw.bytes, raw.size_bytes)?,
        DocumentFormat::Txt => text::extract_plain_text(&raw.bytes, raw.size_bytes),
    };

    for warning in &document.warnings {
        tracing::warn!(format = %format, warning = %warning, "Extraction notice");
    }
    tracing::info!(
        format = %format,
        pages = document.page_count,
        words = document.word_count,
        ocr = document.ocr_applied,
        "Document extracted"
    );
    Ok(document)
}
