//! Format resolution from declared content type and filename.

use std::path::Path;

use super::types::{DocumentFormat, IngestError};

/// MIME type for PDF uploads.
pub const PDF_MIME: &str = "application/pdf";
/// MIME type for Office Open XML word-processing documents.
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// MIME type for legacy Word documents, routed through the DOCX extractor.
pub const DOC_MIME: &str = "application/msword";
/// MIME type for plain text.
pub const TEXT_MIME: &str = "text/plain";

/// Every content type the pipeline accepts.
pub const ACCEPTED_MIME_TYPES: [&str; 4] = [PDF_MIME, DOCX_MIME, DOC_MIME, TEXT_MIME];

/// Resolve the handling format for an upload.
///
/// The declared content type wins when it is one of [`ACCEPTED_MIME_TYPES`]; otherwise the
/// filename extension is consulted. Fails with [`IngestError::UnsupportedFormat`] rather than
/// guessing.
pub fn resolve_format(content_type: &str, filename: &str) -> Result<DocumentFormat, IngestError> {
    format_from_mime(content_type)
        .or_else(|| format_from_extension(filename))
        .ok_or_else(|| IngestError::UnsupportedFormat {
            content_type: content_type.to_string(),
        })
}

/// Map a content type to a format. Parameters such as `; charset=utf-8` are ignored.
pub fn format_from_mime(content_type: &str) -> Option<DocumentFormat> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        PDF_MIME => Some(DocumentFormat::Pdf),
        DOCX_MIME | DOC_MIME => Some(DocumentFormat::Docx),
        TEXT_MIME => Some(DocumentFormat::Txt),
        _ => None,
    }
}

/// Map a filename extension (case-insensitive) to a format.
pub fn format_from_extension(filename: &str) -> Option<DocumentFormat> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some(DocumentFormat::Pdf),
        "docx" | "doc" => Some(DocumentFormat::Docx),
        "txt" => Some(DocumentFormat::Txt),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_takes_precedence_over_extension() {
        let format = resolve_format(PDF_MIME, "report.docx").expect("resolves");
        assert_eq!(format, DocumentFormat::Pdf);
    }

    #[test]
    fn extension_used_when_content_type_is_generic() {
        assert_eq!(
            resolve_format("application/octet-stream", "notes.txt").expect("resolves"),
            DocumentFormat::Txt
        );
        assert_eq!(
            resolve_format("", "Scan.PDF").expect("resolves"),
            DocumentFormat::Pdf
        );
        assert_eq!(
            resolve_format("", "legacy.doc").expect("resolves"),
            DocumentFormat::Docx
        );
    }

    #[test]
    fn legacy_word_mime_routes_to_docx() {
        assert_eq!(format_from_mime(DOC_MIME), Some(DocumentFormat::Docx));
        assert_eq!(format_from_mime(DOCX_MIME), Some(DocumentFormat::Docx));
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(
            format_from_mime("Text/Plain; charset=utf-8"),
            Some(DocumentFormat::Txt)
        );
    }

    #[test]
    fn partial_mime_matches_are_rejected() {
        assert_eq!(format_from_mime("application/pdfx"), None);
        assert_eq!(format_from_mime("text/html"), None);
    }

    #[test]
    fn unresolvable_upload_names_content_type() {
        let err = resolve_format("image/png", "photo.png").expect_err("unsupported");
        match err {
            IngestError::UnsupportedFormat { content_type } => {
                assert_eq!(content_type, "image/png")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn filename_without_extension_does_not_resolve() {
        assert_eq!(format_from_extension("README"), None);
        assert_eq!(format_from_extension(""), None);
    }
}
