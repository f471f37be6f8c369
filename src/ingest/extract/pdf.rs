//! PDF extraction: text layer first, OCR over embedded page images when the layer is sparse.

use std::io::Cursor;
use std::panic;

use image::{DynamicImage, GrayImage, ImageOutputFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::ocr::{self, OcrProvider};
use crate::ingest::types::{DocumentFormat, ExtractedDocument, IngestError};

/// Text layers with fewer trimmed characters than this are treated as scanned pages.
pub const OCR_THRESHOLD_CHARS: usize = 50;

pub(crate) fn extract_pdf(
    bytes: &[u8],
    size_bytes: u64,
    ocr: &dyn OcrProvider,
) -> Result<ExtractedDocument, IngestError> {
    let pdf = Document::load_mem(bytes).map_err(pdf_error)?;
    let page_count = u32::try_from(pdf.get_pages().len()).unwrap_or(u32::MAX);
    let layer = read_text_layer(bytes)?;

    let mut warnings = Vec::new();
    let ocr_applied = needs_ocr(&layer);
    let text = if ocr_applied {
        tracing::info!(
            pages = page_count,
            layer_chars = layer.trim().chars().count(),
            "PDF text layer is sparse; running OCR fallback"
        );
        let images = page_images(&pdf, &mut warnings);
        if images.is_empty() {
            warnings.push("No page images found for OCR".to_string());
        }
        ocr::recognize_pages(ocr, &images).map_err(pdf_error)?
    } else {
        layer
    };

    let (title, author) = document_info(&pdf);
    let mut document = ExtractedDocument::new(DocumentFormat::Pdf, text, size_bytes);
    document.page_count = Some(page_count);
    document.title = title;
    document.author = author;
    document.warnings = warnings;
    document.ocr_applied = ocr_applied;
    Ok(document)
}

/// Whether a text layer is too thin to trust.
pub fn needs_ocr(layer: &str) -> bool {
    layer.trim().chars().count() < OCR_THRESHOLD_CHARS
}

fn pdf_error(cause: impl std::fmt::Display) -> IngestError {
    IngestError::extraction(DocumentFormat::Pdf, cause)
}

fn read_text_layer(bytes: &[u8]) -> Result<String, IngestError> {
    // pdf-extract panics on some malformed content streams.
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => Err(pdf_error(err)),
        Err(_) => Err(pdf_error("text extractor panicked on malformed input")),
    }
}

fn document_info(pdf: &Document) -> (Option<String>, Option<String>) {
    let info = pdf
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|object| pdf.dereference(object).ok())
        .and_then(|(_, object)| object.as_dict().ok());
    match info {
        Some(info) => (
            info_string(pdf, info, b"Title"),
            info_string(pdf, info, b"Author"),
        ),
        None => (None, None),
    }
}

fn info_string(pdf: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let (_, object) = pdf.dereference(info.get(key).ok()?).ok()?;
    let value = decode_text_string(object.as_str().ok()?);
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, else PDFDocEncoding.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    // PDFDocEncoding agrees with Latin-1 on every printable code point we care about.
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encoded page images in page order, one per image XObject each page draws on.
///
/// Soft masks and images no page references are never returned.
fn page_images(pdf: &Document, warnings: &mut Vec<String>) -> Vec<Vec<u8>> {
    let mut images = Vec::new();
    for (page_number, page_id) in pdf.get_pages() {
        for image_id in page_xobject_ids(pdf, page_id) {
            let Ok(stream) = pdf.get_object(image_id).and_then(Object::as_stream) else {
                continue;
            };
            if !is_image(&stream.dict) {
                continue;
            }
            let reason = match encode_image(stream) {
                Ok(Some(encoded)) => {
                    images.push(encoded);
                    continue;
                }
                Ok(None) => "unsupported image encoding".to_string(),
                Err(cause) => cause,
            };
            let (number, generation) = image_id;
            warnings.push(format!(
                "Skipped image {number} {generation} on page {page_number}: {reason}"
            ));
        }
    }
    tracing::debug!(images = images.len(), "Collected PDF page images");
    images
}

/// XObjects named in a page's resources, falling back to the nearest ancestor's resources.
fn page_xobject_ids(pdf: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Ok((own, inherited)) = pdf.get_page_resources(page_id) else {
        return Vec::new();
    };
    let resources = own.or_else(|| {
        inherited
            .first()
            .and_then(|id| pdf.get_dictionary(*id).ok())
    });
    let xobjects = resources
        .and_then(|resources| resources.get(b"XObject").ok())
        .and_then(|object| pdf.dereference(object).ok())
        .and_then(|(_, object)| object.as_dict().ok());

    let mut ids = Vec::new();
    let references = xobjects
        .into_iter()
        .flat_map(Dictionary::iter)
        .filter_map(|(_, value)| value.as_reference().ok());
    for id in references {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|name| name == b"Image")
}

fn filters(dict: &Dictionary) -> Vec<&[u8]> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(items)) => items.iter().filter_map(|item| item.as_name().ok()).collect(),
        _ => Vec::new(),
    }
}

/// Bytes an OCR engine can decode, or `None` when the encoding is not handled.
fn encode_image(stream: &Stream) -> Result<Option<Vec<u8>>, String> {
    match filters(&stream.dict).as_slice() {
        [b"DCTDecode"] | [b"JPXDecode"] => Ok(Some(stream.content.clone())),
        [] => raw_pixels_to_png(&stream.dict, stream.content.clone()).map(Some),
        [b"FlateDecode"] => {
            let pixels = stream
                .decompressed_content()
                .map_err(|err| format!("could not inflate image data: {err}"))?;
            raw_pixels_to_png(&stream.dict, pixels).map(Some)
        }
        _ => Ok(None),
    }
}

fn raw_pixels_to_png(dict: &Dictionary, mut pixels: Vec<u8>) -> Result<Vec<u8>, String> {
    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return Err(format!("{bits}-bit components are not supported"));
    }
    let channels = match dict.get(b"ColorSpace").and_then(Object::as_name) {
        Ok(b"DeviceGray") => 1,
        Ok(b"DeviceRGB") => 3,
        _ => return Err("only DeviceGray and DeviceRGB images are supported".to_string()),
    };

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels))
        .ok_or_else(|| "image dimensions overflow".to_string())?;
    if pixels.len() < expected {
        return Err(format!(
            "image data too short: {} of {expected} bytes",
            pixels.len()
        ));
    }
    pixels.truncate(expected);

    let image = if channels == 1 {
        GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
    } else {
        RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
    }
    .ok_or_else(|| "image buffer does not match its dimensions".to_string())?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|err| format!("PNG encoding failed: {err}"))?;
    Ok(png)
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32, String> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|value| u32::try_from(value).ok())
        .filter(|value| *value > 0)
        .ok_or_else(|| format!("missing or invalid {}", String::from_utf8_lossy(key)))
}
