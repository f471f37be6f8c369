//! Bounds checks applied before extraction and normalization.
//!
//! Validators are pure predicates: they report a [`Validation`] instead of failing, and callers
//! decide whether to turn a rejection into [`IngestError::ValidationFailed`].

use super::format::resolve_format;
use super::types::IngestError;

/// Largest accepted upload: 50 MiB.
pub const MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;
/// Longest accepted free-form text, in characters.
pub const MAX_TEXT_CHARS: usize = 100_000;
/// Accepted range for the requested summary length.
pub const MAX_WORDS_RANGE: std::ops::RangeInclusive<u32> = 100..=5000;
/// Accepted range for the requested reading grade level.
pub const GRADE_LEVEL_RANGE: std::ops::RangeInclusive<u32> = 1..=12;

/// Outcome of a validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether the input is acceptable.
    pub valid: bool,
    /// Human-readable explanation when `valid` is false.
    pub reason: Option<String>,
}

impl Validation {
    /// An accepting outcome.
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    /// A rejecting outcome with a reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }

    /// Convert into a `Result`, mapping rejections to [`IngestError::ValidationFailed`].
    pub fn into_result(self) -> Result<(), IngestError> {
        if self.valid {
            Ok(())
        } else {
            Err(IngestError::ValidationFailed(
                self.reason.unwrap_or_else(|| "Invalid input".to_string()),
            ))
        }
    }
}

/// Accept uploads within [`MAX_FILE_BYTES`] whose format resolves.
///
/// Type acceptance uses the same content-type-then-extension policy as extraction, so an
/// upload is never accepted here and then rejected by the extractor, or the reverse.
pub fn validate_file(size_bytes: u64, content_type: &str, filename: &str) -> Validation {
    if size_bytes > MAX_FILE_BYTES {
        return Validation::rejected("File size exceeds 50MB limit");
    }
    if resolve_format(content_type, filename).is_err() {
        return Validation::rejected(
            "Invalid file type. Only PDF, DOCX, DOC, and TXT files are allowed.",
        );
    }
    Validation::ok()
}

/// Accept non-blank text of at most [`MAX_TEXT_CHARS`] characters.
pub fn validate_text(text: &str) -> Validation {
    if text.trim().is_empty() {
        return Validation::rejected("Text cannot be empty");
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Validation::rejected("Text exceeds 100,000 character limit");
    }
    Validation::ok()
}

/// Accept optional summary parameters within their documented ranges.
pub fn validate_summary_params(max_words: Option<u32>, grade_level: Option<u32>) -> Validation {
    if let Some(words) = max_words {
        if !MAX_WORDS_RANGE.contains(&words) {
            return Validation::rejected("Max words must be between 100 and 5000");
        }
    }
    if let Some(grade) = grade_level {
        if !GRADE_LEVEL_RANGE.contains(&grade) {
            return Validation::rejected("Grade level must be between 1 and 12");
        }
    }
    Validation::ok()
}
