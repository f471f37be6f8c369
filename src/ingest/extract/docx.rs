use std::io::{Cursor, Read, Seek};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::ingest::types::{DocumentFormat, ExtractedDocument, IngestError};

const DOCUMENT_PART: &str = "word/document.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

pub(crate) fn extract_docx(
    bytes: &[u8],
    size_bytes: u64,
) -> Result<ExtractedDocument, IngestError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(docx_error)?;
    let xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| docx_error(format!("package has no {DOCUMENT_PART}")))?;

    let mut warnings = Vec::new();
    if archive.index_for_name(CORE_PROPERTIES_PART).is_none() {
        warnings.push(format!("Package has no {CORE_PROPERTIES_PART}"));
    }
    let text = raw_text(&xml, &mut warnings).map_err(docx_error)?;

    let mut document = ExtractedDocument::new(DocumentFormat::Docx, text, size_bytes);
    document.warnings = warnings;
    Ok(document)
}

fn docx_error(cause: impl std::fmt::Display) -> IngestError {
    IngestError::extraction(DocumentFormat::Docx, cause)
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, IngestError> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(docx_error(err)),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|err| docx_error(format!("{name}: {err}")))?;
    Ok(Some(xml))
}

/// Plain text of a WordprocessingML body.
///
/// Paragraphs end with a blank line; tabs and breaks inside runs map to `\t` and `\n`.
fn raw_text(xml: &str, warnings: &mut Vec<String>) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    // Runs nest inside text boxes, so the outer run stays open after an inner one closes.
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"r" => run_depth += 1,
                b"t" => in_text = run_depth > 0,
                b"drawing" | b"pict" => warnings.push("Skipped embedded drawing".to_string()),
                b"object" => warnings.push("Skipped embedded object".to_string()),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if run_depth > 0 => out.push('\t'),
                b"br" | b"cr" if run_depth > 0 => out.push('\n'),
                b"drawing" | b"pict" => warnings.push("Skipped embedded drawing".to_string()),
                b"object" => warnings.push("Skipped embedded object".to_string()),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => match e.unescape() {
                Ok(text) => out.push_str(&text),
                Err(err) => warnings.push(format!("Skipped undecodable text: {err}")),
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {err}",
                    reader.buffer_position()
                ));
            }
            _ => {}
        }
    }

    Ok(out)
}
