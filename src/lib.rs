#![deny(missing_docs)]

//! Core library for docprep: document ingestion and text normalization ahead of summarization.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Extraction, validation, and normalization pipeline.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
