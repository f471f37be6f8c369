//! Ingest service composing validation, extraction, and normalization for one request.

use std::sync::Arc;

use async_trait::async_trait;

use super::extract::{self, ocr::OcrProvider};
use super::format::resolve_format;
use super::normalize::normalize;
use super::types::{IngestError, IngestOutcome, NormalizedText, RawDocument};
use super::validation::{validate_file, validate_text};
use crate::metrics::{IngestMetrics, MetricsSnapshot};

/// Runs uploads and free-form text through the pipeline.
///
/// Holds the OCR provider and the metrics registry so the HTTP and CLI surfaces share them.
/// Construct once near process start and share it through an `Arc`.
pub struct IngestService {
    ocr: Arc<dyn OcrProvider>,
    metrics: Arc<IngestMetrics>,
}

/// Abstraction over the ingest pipeline used by external surfaces.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Validate, extract, and normalize an uploaded document.
    async fn ingest_document(&self, raw: RawDocument) -> Result<IngestOutcome, IngestError>;

    /// Validate and normalize free-form text.
    async fn ingest_text(&self, text: String) -> Result<NormalizedText, IngestError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl IngestService {
    /// Build a service around an OCR provider.
    pub fn new(ocr: Arc<dyn OcrProvider>) -> Self {
        Self {
            ocr,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Validate, extract on the blocking pool, then normalize.
    pub async fn ingest_document(&self, raw: RawDocument) -> Result<IngestOutcome, IngestError> {
        let result = self.run_document(raw).await;
        if result.is_err() {
            self.metrics.record_failure();
        }
        result
    }

    async fn run_document(&self, raw: RawDocument) -> Result<IngestOutcome, IngestError> {
        validate_file(raw.size_bytes, &raw.content_type, &raw.filename).into_result()?;
        let format = resolve_format(&raw.content_type, &raw.filename)?;

        let ocr = Arc::clone(&self.ocr);
        let document = tokio::task::spawn_blocking(move || extract::extract(&raw, ocr.as_ref()))
            .await
            .map_err(|err| {
                IngestError::extraction(format, format!("extraction task failed: {err}"))
            })??;
        self.metrics.record_document(document.ocr_applied);

        let text = normalize(&document.text);
        self.metrics.record_normalized();
        tracing::debug!(
            format = %format,
            raw_words = document.word_count,
            words = text.word_count(),
            "Document normalized"
        );
        Ok(IngestOutcome { document, text })
    }

    /// Validate and normalize free-form text.
    pub async fn ingest_text(&self, text: String) -> Result<NormalizedText, IngestError> {
        if let Err(err) = validate_text(&text).into_result() {
            self.metrics.record_failure();
            return Err(err);
        }
        let normalized = normalize(&text);
        self.metrics.record_normalized();
        tracing::debug!(
            chars = text.chars().count(),
            words = normalized.word_count(),
            "Text normalized"
        );
        Ok(normalized)
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl IngestApi for IngestService {
    async fn ingest_document(&self, raw: RawDocument) -> Result<IngestOutcome, IngestError> {
        IngestService::ingest_document(self, raw).await
    }

    async fn ingest_text(&self, text: String) -> Result<NormalizedText, IngestError> {
        IngestService::ingest_text(self, text).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        IngestService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::extract::ocr::testing::ScriptedOcr;
    use crate::ingest::types::DocumentFormat;
    use crate::ingest::validation::MAX_FILE_BYTES;

    fn service() -> IngestService {
        IngestService::new(Arc::new(ScriptedOcr::default()))
    }

    #[tokio::test]
    async fn text_upload_is_extracted_and_normalized() {
        let service = service();
        let raw = RawDocument::new(
            b"Page 1 of 2\nThe quick   brown fox\njum-\nped.\n".to_vec(),
            "text/plain",
            "story.txt",
        );
        let outcome = service.ingest_document(raw).await.expect("ingests");
        assert_eq!(outcome.document.format, DocumentFormat::Txt);
        assert_eq!(outcome.text.as_str(), "The quick brown fox\njumped.");
        assert_eq!(outcome.text.word_count(), 5);

        let metrics = service.metrics_snapshot();
        assert_eq!(metrics.documents_extracted, 1);
        assert_eq!(metrics.texts_normalized, 1);
        assert_eq!(metrics.failures, 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_before_extraction() {
        let service = service();
        let mut raw = RawDocument::new(b"tiny".to_vec(), "text/plain", "a.txt");
        raw.size_bytes = MAX_FILE_BYTES + 1;
        let err = service.ingest_document(raw).await.expect_err("too large");
        assert!(matches!(err, IngestError::ValidationFailed(_)));
        assert_eq!(service.metrics_snapshot().documents_extracted, 0);
        assert_eq!(service.metrics_snapshot().failures, 1);
    }

    #[tokio::test]
    async fn unknown_type_is_a_validation_failure() {
        let raw = RawDocument::new(vec![1, 2, 3], "image/gif", "anim.gif");
        let err = service().ingest_document(raw).await.expect_err("rejected");
        assert!(matches!(err, IngestError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn free_text_is_validated_then_normalized() {
        let service = service();
        let text = service
            .ingest_text("\u{2022} alpha\n\n\n\nBETA   GAMMA DELTA".to_string())
            .await
            .expect("normalizes");
        assert_eq!(text.as_str(), "- alpha\n\n## BETA GAMMA DELTA");

        let err = service
            .ingest_text("   ".to_string())
            .await
            .expect_err("blank");
        assert!(matches!(err, IngestError::ValidationFailed(_)));
        assert_eq!(service.metrics_snapshot().failures, 1);
    }
}
