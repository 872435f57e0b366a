//! Error types for the doctriage library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocTriageError`] — **Fatal**: the operation cannot proceed at all
//!   (registry CRUD rejected, durable write failed, bad configuration).
//!   Returned as `Err(DocTriageError)` from registry, store, and pipeline
//!   entry points.
//!
//! * [`ExtractionError`] — **Non-fatal**: the PDF could not be turned into
//!   text, but the upload is still processed to completion. Stored inside
//!   [`crate::record::ExtractionOutcome`] so the resulting document record
//!   describes the failure instead of the whole upload being lost to it.
//!
//! Classification failures have no error type at all: every one of them
//! degrades to a fallback [`crate::record::ClassificationResult`] (see
//! [`crate::pipeline::classify`]), so nothing classification-related ever
//! reaches a caller as `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doctriage library.
///
/// Extraction-level failures use [`ExtractionError`] and are stored in
/// [`crate::record::ExtractionOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DocTriageError {
    // ── Schema registry errors ────────────────────────────────────────────
    /// No schema with the given id exists in the registry.
    #[error("schema '{id}' not found")]
    SchemaNotFound { id: String },

    /// `add` was called with an id that is already registered.
    #[error("schema '{id}' already exists")]
    DuplicateSchema { id: String },

    /// `delete` was called on a predefined, non-deletable schema id.
    #[error("schema '{id}' is predefined and cannot be deleted")]
    ProtectedSchema { id: String },

    /// The submitted body is not a structurally valid Draft 7 JSON Schema,
    /// or the id is not filename-safe.
    #[error("invalid schema '{id}': {detail}")]
    InvalidSchema { id: String, detail: String },

    // ── Persistence errors ────────────────────────────────────────────────
    /// A durable read or write failed. Never swallowed: silent data loss is
    /// worse than a failed request.
    #[error("persistence failure at '{path}': {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The durable document collection exists but cannot be decoded.
    #[error("document store at '{path}' is corrupt: {detail}")]
    CorruptStore { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal extraction failure for a single document.
///
/// Stored inside [`crate::record::ExtractionOutcome::Failed`] when the PDF
/// cannot be parsed. The pipeline continues: the classifier sees the failure
/// and produces its fallback result, and the record is appended as usual.
///
/// Serialises as `{"error_kind": "...", "message": "..."}`.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "error_kind", content = "message", rename_all = "snake_case")]
pub enum ExtractionError {
    /// The bytes do not start with the `%PDF` magic.
    #[error("not a PDF: {0}")]
    NotAPdf(String),

    /// The input file could not be read at all.
    #[error("failed to read input: {0}")]
    Io(String),

    /// The PDF text extractor rejected the document (corrupt xref,
    /// unsupported encoding, encrypted content, ...).
    #[error("PDF parsing failed: {0}")]
    ParseFailed(String),
}
