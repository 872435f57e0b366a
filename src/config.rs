//! Configuration for the document classification pipeline.
//!
//! Every knob lives in one [`PipelineConfig`] struct, built via its
//! [`PipelineConfigBuilder`]. Keeping the whole configuration in one place
//! makes it trivial to share across tasks, log it, and diff two runs to
//! understand why their outputs differ.

use crate::error::DocTriageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default LLM endpoint when neither the builder nor `LLM_API_URL` says
/// otherwise. Matches the text-generation service's default bind address.
pub const DEFAULT_LLM_ENDPOINT: &str = "http://localhost:8000";

/// Sentinel schema id used when classification cannot resolve a type.
pub const DEFAULT_FALLBACK_SCHEMA_ID: &str = "generic";

/// Configuration for a [`crate::DocumentPipeline`].
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use doctriage::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .llm_endpoint("http://llm.internal:8000")
///     .api_timeout_secs(90)
///     .schema_dir("data/schemas")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the text-generation backend. The classifier POSTs to
    /// `{llm_endpoint}/api/generate`. Default: `LLM_API_URL` env var, else
    /// `http://localhost:8000`.
    pub llm_endpoint: String,

    /// Per-classification-call timeout in seconds. Default: 60.
    ///
    /// The LLM call dominates pipeline latency (seconds to minutes on a busy
    /// backend). A timed-out call degrades to the fallback classification;
    /// it never aborts the record.
    pub api_timeout_secs: u64,

    /// `max_new_tokens` sent to the generation endpoint. Default: 500.
    pub max_new_tokens: u32,

    /// Sampling temperature sent to the generation endpoint. Default: 0.7.
    pub temperature: f32,

    /// Maximum number of characters of document text included in the
    /// classification prompt. Default: 2000.
    ///
    /// Caps prompt size: the opening of a business document is almost always
    /// enough to identify its type, and the backend's context window is not.
    pub classify_text_limit: usize,

    /// Schema id recorded when classification cannot resolve a type.
    /// Default: `"generic"`.
    pub fallback_schema_id: String,

    /// Directory holding one JSON-Schema file per registered schema.
    /// Default: `data/schemas`.
    pub schema_dir: PathBuf,

    /// Path of the durable document collection. Default:
    /// `data/documents.json`.
    pub documents_path: PathBuf,

    /// Number of documents processed concurrently by
    /// [`crate::DocumentPipeline::process_batch`]. Default: 4.
    ///
    /// Classification is network-bound; a handful of in-flight calls cuts
    /// batch wall-clock time without hammering the backend.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let endpoint = std::env::var("LLM_API_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string());
        Self {
            llm_endpoint: endpoint,
            api_timeout_secs: 60,
            max_new_tokens: 500,
            temperature: 0.7,
            classify_text_limit: 2000,
            fallback_schema_id: DEFAULT_FALLBACK_SCHEMA_ID.to_string(),
            schema_dir: PathBuf::from("data/schemas"),
            documents_path: PathBuf::from("data/documents.json"),
            concurrency: 4,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn llm_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.llm_endpoint = endpoint.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_new_tokens(mut self, n: u32) -> Self {
        self.config.max_new_tokens = n.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn classify_text_limit(mut self, chars: usize) -> Self {
        self.config.classify_text_limit = chars.max(1);
        self
    }

    pub fn fallback_schema_id(mut self, id: impl Into<String>) -> Self {
        self.config.fallback_schema_id = id.into();
        self
    }

    pub fn schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.schema_dir = dir.into();
        self
    }

    pub fn documents_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.documents_path = path.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, DocTriageError> {
        let c = &self.config;
        if c.llm_endpoint.is_empty() {
            return Err(DocTriageError::InvalidConfig(
                "llm_endpoint must not be empty".into(),
            ));
        }
        if !c.llm_endpoint.starts_with("http://") && !c.llm_endpoint.starts_with("https://") {
            return Err(DocTriageError::InvalidConfig(format!(
                "llm_endpoint must be an HTTP(S) URL, got '{}'",
                c.llm_endpoint
            )));
        }
        if c.api_timeout_secs == 0 || c.api_timeout_secs > 600 {
            return Err(DocTriageError::InvalidConfig(format!(
                "api_timeout_secs must be 1–600, got {}",
                c.api_timeout_secs
            )));
        }
        if c.fallback_schema_id.is_empty() {
            return Err(DocTriageError::InvalidConfig(
                "fallback_schema_id must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_buildable() {
        let c = PipelineConfig::builder().build().unwrap();
        assert_eq!(c.classify_text_limit, 2000);
        assert_eq!(c.max_new_tokens, 500);
        assert_eq!(c.fallback_schema_id, "generic");
    }

    #[test]
    fn temperature_is_clamped() {
        let c = PipelineConfig::builder().temperature(9.5).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = PipelineConfig::builder().llm_endpoint("").build();
        assert!(matches!(err, Err(DocTriageError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = PipelineConfig::builder()
            .llm_endpoint("ftp://llm.internal")
            .build();
        assert!(matches!(err, Err(DocTriageError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = PipelineConfig::builder().api_timeout_secs(0).build();
        assert!(matches!(err, Err(DocTriageError::InvalidConfig(_))));
    }

    #[test]
    fn concurrency_floor_is_one() {
        let c = PipelineConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }
}
