//! Prompt text for LLM-based document classification.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how the model is asked to
//!    classify requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompt directly
//!    without calling a real backend, so prompt regressions are easy to catch.

/// Build the classification prompt for one document.
///
/// The model is told the closed set of schema ids it may choose from and the
/// fallback id to use when nothing matches; `text` must already be truncated
/// by the caller. The response-shape instruction asks for a bare JSON object,
/// but the interpreter tolerates prose around it — see
/// [`crate::pipeline::fragment`].
pub fn classification_prompt(text: &str, schema_ids: &[String], fallback_id: &str) -> String {
    let types = if schema_ids.is_empty() {
        fallback_id.to_string()
    } else {
        schema_ids.join(", ")
    };

    format!(
        r#"Analyze the following document text and determine its type.
Possible document types are: {types}.

If you cannot confidently match the document to any of these types,
return '{fallback_id}' as the schema_id.

Document text:
{text}

Provide a JSON response with the following fields:
{{
    "schema_id": "one of: {types}, or {fallback_id}",
    "confidence": 0.0-1.0,
    "reasoning": "explanation",
    "extracted_data": {{
        "key1": "value1",
        "key2": "value2"
    }}
}}

Respond ONLY with the valid JSON, no additional text."#
    )
}
