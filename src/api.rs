//! HTTP surface for docprep.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /extract` – Multipart upload (`file`, optional `maxWords`/`gradeLevel`). Validates,
//!   extracts, and normalizes the document, returning its metadata, the normalized text, and a
//!   quality record (`wordCount`, `processingTime`).
//! - `POST /normalize` – JSON `{ text, maxWords?, gradeLevel? }`; validates and normalizes text.
//! - `GET /health` – Liveness probe listing the available endpoints.
//! - `GET /metrics` – Ingestion counters.
//!
//! The CLI drives the same [`IngestApi`] pipeline, so behavior is identical across interfaces.

use crate::config::get_config;
use crate::ingest::validation::{MAX_FILE_BYTES, validate_summary_params};
use crate::ingest::{ExtractedDocument, IngestApi, IngestError, RawDocument};
use crate::metrics::MetricsSnapshot;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

const SERVICE_NAME: &str = "docprep";
// Room for multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_BYTES as usize + 1024 * 1024;
const ENDPOINTS: [&str; 4] = [
    "POST /extract",
    "POST /normalize",
    "GET /health",
    "GET /metrics",
];

/// Build the HTTP router exposing the ingestion API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: IngestApi + 'static,
{
    Router::new()
        .route("/extract", post(extract_document::<S>))
        .route("/normalize", post(normalize_text::<S>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_state(service)
}

/// Summary parameters echoed back after defaults are applied.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryParameters {
    max_words: u32,
    grade_level: u32,
}

impl SummaryParameters {
    fn resolve(max_words: Option<u32>, grade_level: Option<u32>) -> Result<Self, IngestError> {
        validate_summary_params(max_words, grade_level).into_result()?;
        let config = get_config();
        Ok(Self {
            max_words: max_words.unwrap_or(config.default_max_words),
            grade_level: grade_level.unwrap_or(config.default_grade_level),
        })
    }
}

/// Post-hoc record of how much text came out and how long it took.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QualityReport {
    word_count: usize,
    processing_time: u64,
}

impl QualityReport {
    fn new(word_count: usize, started: Instant) -> Self {
        Self {
            word_count,
            processing_time: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Success response for `POST /extract`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractResponse {
    success: bool,
    document: ExtractedDocument,
    original_text: String,
    parameters: SummaryParameters,
    quality: QualityReport,
}

/// Extract and normalize an uploaded document.
async fn extract_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError>
where
    S: IngestApi,
{
    let started = Instant::now();
    let mut upload = None;
    let mut max_words = None;
    let mut grade_level = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| malformed_upload(&err))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|err| malformed_upload(&err))?;
                upload = Some(RawDocument::new(bytes.to_vec(), content_type, filename));
            }
            Some("maxWords") => {
                let value = field.text().await.map_err(|err| malformed_upload(&err))?;
                max_words = parse_param(&value, "Max words must be between 100 and 5000")?;
            }
            Some("gradeLevel") => {
                let value = field.text().await.map_err(|err| malformed_upload(&err))?;
                grade_level = parse_param(&value, "Grade level must be between 1 and 12")?;
            }
            _ => {}
        }
    }

    let raw = upload.ok_or_else(|| IngestError::ValidationFailed("No file uploaded".into()))?;
    let parameters = SummaryParameters::resolve(max_words, grade_level)?;
    tracing::info!(
        filename = %raw.filename,
        content_type = %raw.content_type,
        bytes = raw.size_bytes,
        "Extract request received"
    );

    let outcome = service.ingest_document(raw).await?;
    let quality = QualityReport::new(outcome.text.word_count(), started);
    tracing::info!(
        format = %outcome.document.format,
        words = quality.word_count,
        elapsed_ms = quality.processing_time,
        "Extract request completed"
    );
    Ok(Json(ExtractResponse {
        success: true,
        document: outcome.document,
        original_text: outcome.text.into_inner(),
        parameters,
        quality,
    }))
}

fn malformed_upload(err: &dyn std::fmt::Display) -> IngestError {
    IngestError::ValidationFailed(format!("Malformed upload: {err}"))
}

fn parse_param(value: &str, reason: &str) -> Result<Option<u32>, IngestError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| IngestError::ValidationFailed(reason.to_string()))
}

/// Request body for `POST /normalize`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NormalizeRequest {
    text: String,
    #[serde(default)]
    max_words: Option<u32>,
    #[serde(default)]
    grade_level: Option<u32>,
}

/// Success response for `POST /normalize`.
#[derive(Serialize)]
struct NormalizeResponse {
    success: bool,
    text: String,
    parameters: SummaryParameters,
    quality: QualityReport,
}

/// Validate and normalize free-form text.
async fn normalize_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<NormalizeRequest>,
) -> Result<Json<NormalizeResponse>, AppError>
where
    S: IngestApi,
{
    let started = Instant::now();
    let parameters = SummaryParameters::resolve(request.max_words, request.grade_level)?;
    let text = service.ingest_text(request.text).await?;
    let quality = QualityReport::new(text.word_count(), started);
    Ok(Json(NormalizeResponse {
        success: true,
        text: text.into_inner(),
        parameters,
        quality,
    }))
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    endpoints: [&'static str; 4],
}

async fn health() -> Json<HealthResponse> {
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .ok();
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        timestamp,
        endpoints: ENDPOINTS,
    })
}

/// Return the ingestion counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: IngestApi,
{
    Json(service.metrics_snapshot())
}

/// Error body shared by every failing endpoint.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: &'static str,
    message: String,
}

struct AppError(IngestError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            IngestError::ValidationFailed(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            IngestError::UnsupportedFormat { .. } => {
                (StatusCode::BAD_REQUEST, "Unsupported file type")
            }
            IngestError::ExtractionFailed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Failed to process document")
            }
        };
        tracing::warn!(status = status.as_u16(), error = %self.0, "Request failed");
        let body = ErrorResponse {
            success: false,
            error,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self(inner)
    }
}
