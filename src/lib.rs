//! # doctriage
//!
//! Classify PDF documents against named JSON Schemas using an LLM
//! text-generation backend.
//!
//! ## Why this crate?
//!
//! Document intake systems receive PDFs of unknown type — invoices, receipts,
//! contracts — and need each one tagged with a schema, scored for confidence,
//! and (when the model extracts fields) validated against that schema's
//! Draft 7 JSON Schema. The model doing the tagging is an untrusted,
//! non-deterministic collaborator: everything it returns is treated as
//! advisory and checked against the closed set of registered schema ids
//! before being trusted.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract   pdf-extract → page-indexed plain text (spawn_blocking)
//!  ├─ 2. Cleanup   deterministic text rules (line endings, invisible chars)
//!  ├─ 3. Classify  POST /api/generate, interpret the JSON fragment in the reply
//!  ├─ 4. Resolve   schema id checked against the registry's closed set
//!  ├─ 5. Validate  extracted fields vs. the schema's Draft 7 body
//!  └─ 6. Persist   append the DocumentRecord to the durable store
//! ```
//!
//! Every stage is failure-isolated: an unreadable PDF, a dead endpoint, or
//! unparsable model output each degrade the record (inline extraction error,
//! fallback classification) instead of failing the upload. Only persistence
//! failures surface as `Err`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doctriage::{DocumentPipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint auto-detected from LLM_API_URL, else http://localhost:8000
//!     let config = PipelineConfig::default();
//!     let pipeline = DocumentPipeline::new(config)?;
//!     pipeline.registry().seed_defaults()?;
//!
//!     let record = pipeline.process("invoice-042.pdf", "uploads/invoice-042.pdf").await?;
//!     println!("{} -> {} ({:.0}%)", record.filename, record.schema_id, record.confidence * 100.0);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doctriage` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doctriage = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod record;
pub mod registry;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_FALLBACK_SCHEMA_ID};
pub use error::{DocTriageError, ExtractionError};
pub use pipeline::classify::ClassificationClient;
pub use pipeline::extract::extract;
pub use pipeline::fragment::extract_json_fragment;
pub use pipeline::validate::ValidationEngine;
pub use process::DocumentPipeline;
pub use record::{
    ClassificationResult, DocumentRecord, ExtractionOutcome, PageText, ParseMetadata,
    ParsedContent, ValidationResult,
};
pub use registry::{Schema, SchemaRegistry, SchemaSummary, PREDEFINED_SCHEMA_IDS};
pub use store::DocumentStore;
