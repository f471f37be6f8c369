use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_extracted: AtomicU64,
    ocr_fallbacks: AtomicU64,
    texts_normalized: AtomicU64,
    failures: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully extracted document and whether OCR produced its text.
    pub fn record_document(&self, ocr_applied: bool) {
        self.documents_extracted.fetch_add(1, Ordering::Relaxed);
        if ocr_applied {
            self.ocr_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a normalization run, for documents and free-form text alike.
    pub fn record_normalized(&self) {
        self.texts_normalized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request rejected by validation or failed during extraction.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_extracted: self.documents_extracted.load(Ordering::Relaxed),
            ocr_fallbacks: self.ocr_fallbacks.load(Ordering::Relaxed),
            texts_normalized: self.texts_normalized.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Documents extracted since startup.
    pub documents_extracted: u64,
    /// Extractions whose text came from the OCR fallback.
    pub ocr_fallbacks: u64,
    /// Normalization runs since startup.
    pub texts_normalized: u64,
    /// Requests that ended in an error.
    pub failures: u64,
}
