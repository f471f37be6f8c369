use std::borrow::Cow;

use crate::ingest::types::{DocumentFormat, ExtractedDocument};

/// Decode plain text. Invalid UTF-8 is replaced rather than rejected.
pub(crate) fn extract_plain_text(bytes: &[u8], size_bytes: u64) -> ExtractedDocument {
    let (text, replaced) = match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(valid) => (valid.to_string(), false),
        Cow::Owned(lossy) => (lossy, true),
    };
    let mut document = ExtractedDocument::new(DocumentFormat::Txt, text, size_bytes);
    if replaced {
        document
            .warnings
            .push("Invalid UTF-8 sequences were replaced".to_string());
    }
    document
}
