use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use docprep::ingest::{
    self, DocumentFormat, IngestError, IngestService, OcrEngine, OcrError, OcrProvider,
    RawDocument, UnavailableOcr, count_words,
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Clone, Default)]
struct CountingOcr {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    rejects_images: bool,
}

impl CountingOcr {
    fn rejecting() -> Self {
        Self {
            rejects_images: true,
            ..Self::default()
        }
    }
}

struct CountingEngine {
    released: Arc<AtomicUsize>,
    rejects_images: bool,
}

impl OcrEngine for CountingEngine {
    fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError> {
        if self.rejects_images {
            return Err(OcrError::Recognition("unreadable scan".to_string()));
        }
        Ok(format!("Recognized scan of {} bytes", image.len()))
    }
}

impl Drop for CountingEngine {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl OcrProvider for CountingOcr {
    fn acquire(&self) -> Result<Box<dyn OcrEngine>, OcrError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingEngine {
            released: self.released.clone(),
            rejects_images: self.rejects_images,
        }))
    }
}

fn docx_package(body: &str, with_core_properties: bool) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer
        .start_file("word/document.xml", options)
        .expect("start document part");
    writer
        .write_all(document.as_bytes())
        .expect("write document part");
    if with_core_properties {
        writer
            .start_file("docProps/core.xml", options)
            .expect("start core part");
        writer
            .write_all(b"<cp:coreProperties xmlns:cp=\"urn:cp\"/>")
            .expect("write core part");
    }
    writer.finish().expect("finish package").into_inner()
}

/// One-page PDF whose text layer holds `lines`, plus one JPEG image XObject.
fn pdf_with_text(lines: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        vec![0xFF, 0xD8, 0xFF, 0xD9],
    ));
    // Inherited by the page from the page tree root.
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 10.into()]),
        Operation::new("TL", vec![12.into()]),
        Operation::new("Td", vec![20.into(), 800.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Field Survey"),
        "Author" => Object::string_literal("R. Okafor"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

#[test]
fn docx_paragraphs_and_breaks_are_normalized() {
    let body = "<w:p><w:r><w:t>EXECUTIVE SUMMARY</w:t></w:r></w:p>\
                <w:p><w:r><w:t>Revenue in-</w:t><w:br/><w:t>creased   sharply.</w:t></w:r></w:p>";
    let raw = RawDocument::new(docx_package(body, true), DOCX_MIME, "summary.docx");

    let document = ingest::extract(&raw, &CountingOcr::default()).expect("extracts");
    assert_eq!(document.format, DocumentFormat::Docx);
    assert!(document.page_count.is_none());
    assert!(document.warnings.is_empty());

    let text = ingest::normalize(&document.text);
    assert_eq!(
        text.as_str(),
        "## EXECUTIVE SUMMARY\n\nRevenue increased sharply."
    );
}

#[test]
fn docx_without_core_properties_reports_a_warning() {
    let body = "<w:p><w:r><w:t>Minutes</w:t></w:r></w:p>";
    let raw = RawDocument::new(docx_package(body, false), "", "minutes.docx");

    let document = ingest::extract(&raw, &CountingOcr::default()).expect("extracts");
    assert_eq!(document.warnings, vec!["Package has no docProps/core.xml"]);
}

#[test]
fn docx_package_without_body_fails() {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("docProps/core.xml", SimpleFileOptions::default())
        .expect("start part");
    writer.write_all(b"<x/>").expect("write part");
    let bytes = writer.finish().expect("finish").into_inner();

    let raw = RawDocument::new(bytes, DOCX_MIME, "empty.docx");
    let err = ingest::extract(&raw, &CountingOcr::default()).expect_err("fails");
    assert!(matches!(
        err,
        IngestError::ExtractionFailed {
            format: DocumentFormat::Docx,
            ..
        }
    ));
}

#[test]
fn sparse_pdf_text_layer_falls_back_to_ocr() {
    let ocr = CountingOcr::default();
    let raw = RawDocument::new(
        pdf_with_text(&["Scan 12345".to_string()]),
        "application/pdf",
        "scan.pdf",
    );

    let document = ingest::extract(&raw, &ocr).expect("extracts");
    assert!(document.ocr_applied);
    assert_eq!(document.text, "Recognized scan of 4 bytes");
    assert_eq!(document.page_count, Some(1));
    assert_eq!(document.title.as_deref(), Some("Field Survey"));
    assert_eq!(document.author.as_deref(), Some("R. Okafor"));
    assert_eq!(ocr.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(ocr.released.load(Ordering::SeqCst), 1);
}

#[test]
fn ocr_recognition_failure_fails_the_pdf_and_releases_the_engine() {
    let ocr = CountingOcr::rejecting();
    let raw = RawDocument::new(
        pdf_with_text(&["Scan 12345".to_string()]),
        "application/pdf",
        "scan.pdf",
    );

    let err = ingest::extract(&raw, &ocr).expect_err("fails");
    assert!(matches!(
        err,
        IngestError::ExtractionFailed {
            format: DocumentFormat::Pdf,
            ..
        }
    ));
    assert!(err.to_string().contains("unreadable scan"));
    assert_eq!(ocr.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(ocr.released.load(Ordering::SeqCst), 1);
}

#[test]
fn scanned_pdf_without_an_ocr_backend_fails_extraction() {
    let raw = RawDocument::new(
        pdf_with_text(&["Scan 12345".to_string()]),
        "application/pdf",
        "scan.pdf",
    );

    let err = ingest::extract(&raw, &UnavailableOcr).expect_err("fails");
    assert!(matches!(
        err,
        IngestError::ExtractionFailed {
            format: DocumentFormat::Pdf,
            ..
        }
    ));
    assert!(err.to_string().contains("OCR engine unavailable"));
}

#[test]
fn dense_pdf_text_layer_skips_ocr() {
    let ocr = CountingOcr::default();
    let lines: Vec<String> = (0..50)
        .map(|n| {
            format!(
                "Line {n:02} of the quarterly field survey covers rainfall and soil data {}",
                "x".repeat(25)
            )
        })
        .collect();
    let raw = RawDocument::new(pdf_with_text(&lines), "application/pdf", "survey.pdf");

    let document = ingest::extract(&raw, &ocr).expect("extracts");
    assert!(!document.ocr_applied);
    assert!(document.text.trim().chars().count() >= 4000);
    assert!(document.text.contains("rainfall"));
    assert_eq!(ocr.acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn word_counts_agree_with_the_shared_counter() {
    let raw = RawDocument::new(
        b"  alpha beta\n\n\ngamma\tdelta  \n12\n".to_vec(),
        "text/plain",
        "notes.txt",
    );
    let document = ingest::extract(&raw, &CountingOcr::default()).expect("extracts");
    assert_eq!(document.word_count, count_words(&document.text));
    assert_eq!(document.word_count, 5);

    let text = ingest::normalize(&document.text);
    assert_eq!(text.word_count(), count_words(text.as_str()));
    assert_eq!(text.word_count(), 4);
}

#[tokio::test]
async fn service_runs_scanned_pdf_through_ocr_and_normalization() {
    let ocr = CountingOcr::default();
    let service = IngestService::new(Arc::new(ocr.clone()));
    let raw = RawDocument::new(
        pdf_with_text(&["Scan 12345".to_string()]),
        "application/octet-stream",
        "scan.PDF",
    );

    let outcome = service.ingest_document(raw).await.expect("ingests");
    assert!(outcome.document.ocr_applied);
    assert_eq!(outcome.text.as_str(), "Recognized scan of 4 bytes");

    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.documents_extracted, 1);
    assert_eq!(metrics.ocr_fallbacks, 1);
    assert_eq!(ocr.released.load(Ordering::SeqCst), 1);
}
