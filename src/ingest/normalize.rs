//! Text normalization for extracted document prose.
//!
//! [`normalize`] runs a fixed chain of text-to-text stages:
//!
//! 1. Artifact cleanup: form feeds and carriage returns become newlines, bullet glyphs become
//!    dash markers, and anything outside printable ASCII (plus `\n`/`\t`) becomes a space.
//!    Accented letters and non-Latin scripts are discarded along with layout debris.
//! 2. Whitespace: runs of spaces collapse, trailing blanks are stripped, and blank-line runs are
//!    capped at one empty line.
//! 3. Header/footer stripping: `Page N of M` lines and bare page numbers are dropped.
//! 4. Dehyphenation: words split across a line-wrap hyphen are rejoined, even when blank lines
//!    sit between the halves.
//! 5. Structure hints: shouting-case lines become `## ` headings and bullet markers are unified.
//! 6. Settle and trim.
//!
//! Stages 3 and 4 repeat until neither changes the text, which keeps the whole chain
//! idempotent: `normalize(normalize(s)) == normalize(s)` for every input.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use super::types::NormalizedText;

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid space-run pattern"));
static TRAILING_BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid trailing-blank pattern"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline-run pattern"));
static PAGE_OF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^page [0-9]+ of [0-9]+$").expect("valid page pattern"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z \t]{10,}$").expect("valid heading pattern"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)[-\x{2022}][ \t]+").expect("valid bullet pattern")
});

/// Normalize extracted text for downstream summarization. Never fails.
pub fn normalize(raw: &str) -> NormalizedText {
    let mut text = normalize_whitespace(&clean_artifacts(raw));

    loop {
        let next = join_hyphenated_words(&strip_headers_footers(&text));
        if next == text {
            break;
        }
        text = next;
    }

    let structured = normalize_whitespace(&mark_structure(&text));
    NormalizedText::new(structured.trim().to_string())
}

fn clean_artifacts(text: &str) -> String {
    let unified = text
        .replace('\u{000C}', "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    for ch in unified.chars() {
        match ch {
            '\u{2022}' => out.push_str("- "),
            '\u{25E6}' | '\u{25AA}' => out.push_str("  - "),
            '\n' | '\t' | ' '..='~' => out.push(ch),
            _ => out.push(' '),
        }
    }
    out
}

fn normalize_whitespace(text: &str) -> String {
    let collapsed = MULTI_SPACE.replace_all(text, " ");
    // Blanks go before newline runs are capped, or whitespace-only lines would survive as
    // three consecutive newlines.
    let stripped = TRAILING_BLANKS.replace_all(&collapsed, "");
    EXCESS_NEWLINES.replace_all(&stripped, "\n\n").into_owned()
}

fn strip_headers_footers(text: &str) -> String {
    text.split('\n')
        .filter(|line| !is_page_marker(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

// Short lines are never dropped here, even one- or two-character debris.
fn is_page_marker(line: &str) -> bool {
    if PAGE_OF.is_match(line) {
        return true;
    }
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

fn join_hyphenated_words(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    // Blank lines after a hyphenated line, dropped if the word continues below them.
    let mut held_blanks: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        let stem_len = lines
            .last()
            .map(String::as_str)
            .and_then(hyphenated_stem)
            .map(str::len);
        if let Some(stem_len) = stem_len {
            let continuation = line.trim_start_matches([' ', '\t']);
            if continuation.is_empty() {
                held_blanks.push(line);
                continue;
            }
            if continuation.chars().next().is_some_and(is_word_char) {
                if let Some(previous) = lines.last_mut() {
                    previous.truncate(stem_len);
                    previous.push_str(continuation);
                }
                held_blanks.clear();
                continue;
            }
        }
        lines.extend(held_blanks.drain(..).map(str::to_string));
        lines.push(line.to_string());
    }
    lines.extend(held_blanks.drain(..).map(str::to_string));

    lines.join("\n")
}

/// The part of `line` before a trailing `<word char>-`, if it ends that way.
fn hyphenated_stem(line: &str) -> Option<&str> {
    let stem = line.trim_end_matches([' ', '\t']).strip_suffix('-')?;
    stem.chars()
        .next_back()
        .filter(|last| is_word_char(*last))
        .map(|_| stem)
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn mark_structure(text: &str) -> String {
    text.split('\n')
        .map(mark_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn mark_line(line: &str) -> Cow<'_, str> {
    let trimmed = line.trim();
    if HEADING.is_match(trimmed) {
        return Cow::Owned(format!("## {trimmed}"));
    }
    BULLET.replace(line, "${indent}- ")
}
