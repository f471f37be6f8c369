//! Document ingestion: format resolution, extraction, validation, and normalization.

pub mod extract;
pub mod format;
pub mod normalize;
pub mod service;
pub mod types;
pub mod validation;
pub mod words;

pub use extract::extract;
pub use extract::ocr::{OcrEngine, OcrError, OcrProvider, UnavailableOcr, default_provider};
pub use format::resolve_format;
pub use normalize::normalize;
pub use service::{IngestApi, IngestService};
pub use types::{
    DocumentFormat, ExtractedDocument, IngestError, IngestOutcome, NormalizedText, RawDocument,
};
pub use validation::{Validation, validate_file, validate_summary_params, validate_text};
pub use words::count_words;
