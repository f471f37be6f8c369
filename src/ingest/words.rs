//! Word counting shared by extraction metadata, normalized text, and quality reports.

/// Count whitespace-delimited tokens, ignoring empty ones.
///
/// Every word count reported by the crate goes through this function so figures stay
/// consistent between extraction metadata and downstream reports.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
