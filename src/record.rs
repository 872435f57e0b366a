//! Output data model: everything the pipeline produces and persists.
//!
//! All types here serialise with serde because the document store keeps them
//! as JSON and the reporting layer reads them back verbatim. A record is
//! immutable once appended; nothing in the crate mutates a stored
//! [`DocumentRecord`].

use crate::error::ExtractionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text extracted from a single PDF page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageText {
    /// 1-based page number, in document order.
    pub page_number: usize,
    /// Cleaned plain text of the page.
    pub text: String,
    /// Character count of `text`, recorded so reporting does not have to
    /// re-measure page sizes.
    pub length: usize,
}

/// Extraction-time metadata for a parsed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseMetadata {
    /// Original filename as supplied by the upload collaborator.
    pub filename: String,
    /// When extraction ran.
    pub parsed_at: DateTime<Utc>,
    /// Total number of pages found in the document.
    pub total_pages: usize,
}

/// A successfully parsed document: page-indexed plain text plus metadata.
///
/// Produced once per upload and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedContent {
    pub metadata: ParseMetadata,
    /// Pages in document order; `pages[i].page_number == i + 1`.
    pub pages: Vec<PageText>,
}

impl ParsedContent {
    /// Concatenate page texts in page order, separated by a single newline.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when the document has no pages or only whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// What extraction produced: either parsed content or an inline failure.
///
/// Downstream stages match on both variants explicitly — a failed extraction
/// is never coerced into empty text. Serialises with a `status` tag:
/// `{"status": "parsed", ...}` or `{"status": "failed", "error_kind": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// The document yielded page-structured text.
    Parsed(ParsedContent),
    /// The document could not be parsed; the error travels with the record.
    Failed(ExtractionError),
}

impl ExtractionOutcome {
    /// The parsed content, when extraction succeeded.
    pub fn content(&self) -> Option<&ParsedContent> {
        match self {
            ExtractionOutcome::Parsed(c) => Some(c),
            ExtractionOutcome::Failed(_) => None,
        }
    }

    /// The extraction error, when extraction failed.
    pub fn error(&self) -> Option<&ExtractionError> {
        match self {
            ExtractionOutcome::Parsed(_) => None,
            ExtractionOutcome::Failed(e) => Some(e),
        }
    }
}

/// The classifier's verdict for one document.
///
/// May be a fallback value: when the LLM call fails, times out, returns a
/// non-200, or returns text that cannot be interpreted, `schema_id` is the
/// fallback sentinel, `confidence` is 0.0 and `reasoning` carries a
/// diagnostic. `schema_id` is always a member of the closed set
/// `known ids ∪ {fallback}` — model output never bypasses that check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Chosen schema id, or the fallback sentinel.
    pub schema_id: String,
    /// Clamped into [0, 1]; 0.5 when the model omitted it, 0.0 on fallback.
    pub confidence: f64,
    /// Model-supplied explanation, or a diagnostic on fallback.
    pub reasoning: String,
    /// Fields the model extracted from the document, when it supplied a JSON
    /// object for them. `None` on fallback and when the model omitted them;
    /// `Some` (possibly empty) triggers validation downstream.
    pub extracted_data: Option<Map<String, Value>>,
}

impl ClassificationResult {
    /// Build a fallback result with confidence 0 and no extracted data.
    pub fn fallback(schema_id: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            confidence: 0.0,
            reasoning: reasoning.into(),
            extracted_data: None,
        }
    }
}

/// Result of validating extracted data against a registered schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// First validation error's message; `None` when valid.
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error_message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
        }
    }
}

/// The persisted result of processing one uploaded document.
///
/// Identified by `classification_id`, generated fresh per upload. Owned by
/// the document store once appended. `schema_id` references the registry but
/// may dangle if the schema is deleted later; readers must tolerate that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Globally unique id, `doc-<uuid4>`.
    pub classification_id: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// Resolved schema id: a registered id or the fallback sentinel.
    pub schema_id: String,
    /// When the pipeline processed the document.
    pub processed_at: DateTime<Utc>,
    /// Extraction output, success or inline failure.
    pub parsed_content: ExtractionOutcome,
    /// `None` when no classifier was configured for the pipeline.
    pub classification: Option<ClassificationResult>,
    /// `None` when the classifier produced no extracted data.
    pub validation: Option<ValidationResult>,
    /// Copy of the classification confidence (0.0 when unclassified), kept
    /// top-level for cheap reporting queries.
    pub confidence: f64,
}

impl DocumentRecord {
    /// Generate a fresh record id.
    pub fn new_id() -> String {
        format!("doc-{}", uuid::Uuid::new_v4())
    }
}
