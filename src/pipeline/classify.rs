//! LLM interaction: build the classification request and interpret the reply.
//!
//! This module drives the only network call in the pipeline. It is
//! intentionally thin — prompt text lives in [`crate::prompts`] and JSON
//! fragment location in [`crate::pipeline::fragment`], so both can change
//! without touching the HTTP or fallback logic here.
//!
//! ## Failure Policy
//!
//! The model is an untrusted, non-deterministic collaborator. Every failure —
//! connect error, timeout, non-200 status, an `{"error": ...}` body, missing
//! or unparsable generated text, an unknown schema id — degrades to a
//! fallback [`ClassificationResult`] carrying a diagnostic `reasoning`.
//! Nothing here returns `Err`, and there are no retries: a failed call maps
//! directly to the fallback value and the pipeline moves on.

use crate::config::PipelineConfig;
use crate::error::DocTriageError;
use crate::pipeline::fragment::extract_json_fragment;
use crate::prompts;
use crate::record::{ClassificationResult, ExtractionOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Request body for `POST {endpoint}/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    max_new_tokens: u32,
    temperature: f32,
}

/// Response body of the generation endpoint.
///
/// The backend answers HTTP 200 with `{"text": ...}` on success, but also
/// HTTP 200 with `{"error": ...}` while its model is still loading — both
/// shapes must be handled.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the external text-generation endpoint.
///
/// Holds a single `reqwest::Client` with the configured timeout; cheap to
/// clone per task via the pipeline's ownership.
pub struct ClassificationClient {
    http: reqwest::Client,
    endpoint: String,
    max_new_tokens: u32,
    temperature: f32,
    text_limit: usize,
    fallback_id: String,
}

impl ClassificationClient {
    /// Build a client from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Result<Self, DocTriageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| DocTriageError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.llm_endpoint.trim_end_matches('/').to_string(),
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            text_limit: config.classify_text_limit,
            fallback_id: config.fallback_schema_id.clone(),
        })
    }

    /// The fallback schema id this client stamps on degraded results.
    pub fn fallback_id(&self) -> &str {
        &self.fallback_id
    }

    /// Classify one extracted document against the closed set of known
    /// schema ids. Infallible by contract: always returns a result, fallback
    /// or otherwise.
    pub async fn classify(
        &self,
        extraction: &ExtractionOutcome,
        known_ids: &[String],
    ) -> ClassificationResult {
        let content = match extraction {
            ExtractionOutcome::Failed(e) => {
                return ClassificationResult::fallback(
                    &self.fallback_id,
                    format!("extraction failed: {e}"),
                );
            }
            ExtractionOutcome::Parsed(content) => content,
        };

        if content.is_blank() {
            return ClassificationResult::fallback(
                &self.fallback_id,
                "document contains no extractable text",
            );
        }

        let text = truncate_chars(&content.full_text(), self.text_limit);
        let prompt = prompts::classification_prompt(&text, known_ids, &self.fallback_id);
        debug!(
            "classifying '{}': {} prompt chars, {} candidate schemas",
            content.metadata.filename,
            prompt.chars().count(),
            known_ids.len()
        );

        match self.generate(&prompt).await {
            Ok(generated) => interpret(&generated, known_ids, &self.fallback_id),
            Err(reason) => {
                warn!(
                    "classification of '{}' degraded to fallback: {reason}",
                    content.metadata.filename
                );
                ClassificationResult::fallback(&self.fallback_id, reason)
            }
        }
    }

    /// Run one generation call. `Err` carries the diagnostic string that
    /// becomes the fallback `reasoning`.
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            prompt,
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
        };

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                format!("classification request timed out: {e}")
            } else {
                format!("classification request error: {e}")
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("classification endpoint returned HTTP {status}"));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| format!("classification response was not JSON: {e}"))?;

        if let Some(err) = parsed.error {
            return Err(format!("classification backend error: {err}"));
        }
        parsed
            .text
            .ok_or_else(|| "classification response had no generated text".to_string())
    }
}

/// Interpret the model's generated text into a [`ClassificationResult`].
///
/// Pure function, separated from the network path so the closed-set property
/// can be tested against arbitrary adversarial output:
///
/// * no parsable JSON fragment → fallback;
/// * `schema_id` missing or not a string → fallback;
/// * `schema_id` outside `known_ids ∪ {fallback_id}` → overridden to the
///   fallback id (the rest of the result is kept);
/// * `confidence` clamped into [0, 1], 0.5 when absent or non-numeric;
/// * `extracted_data` kept only when it is a JSON object.
pub fn interpret(
    generated: &str,
    known_ids: &[String],
    fallback_id: &str,
) -> ClassificationResult {
    let Some(value) = extract_json_fragment(generated) else {
        return ClassificationResult::fallback(
            fallback_id,
            "model output contained no parsable JSON fragment",
        );
    };

    let Some(raw_id) = value.get("schema_id").and_then(|v| v.as_str()) else {
        return ClassificationResult::fallback(fallback_id, "model output had no schema_id");
    };

    let schema_id = if raw_id == fallback_id || known_ids.iter().any(|id| id == raw_id) {
        raw_id.to_string()
    } else {
        warn!("model proposed unknown schema id '{raw_id}', overriding to '{fallback_id}'");
        fallback_id.to_string()
    };

    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let reasoning = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or("no reasoning provided")
        .to_string();

    let extracted_data = value
        .get("extracted_data")
        .and_then(|v| v.as_object())
        .cloned();

    ClassificationResult {
        schema_id,
        confidence,
        reasoning,
        extracted_data,
    }
}

/// Truncate to the first `limit` characters without splitting a code point.
fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
