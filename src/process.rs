//! Pipeline orchestration: one uploaded file in, one persisted record out.
//!
//! Each stage is failure-isolated so one stage's failure degrades the record
//! instead of aborting the upload: an unreadable PDF travels as an inline
//! extraction failure, a dead LLM endpoint becomes a fallback
//! classification, a schema the registry does not know becomes a failed
//! validation. Only registry and store persistence failures — where silence
//! would mean data loss — propagate as `Err`.
//!
//! No stage runs more than once per upload and nothing retries; retries, if
//! wanted, belong to the caller.

use crate::config::PipelineConfig;
use crate::error::{DocTriageError, ExtractionError};
use crate::pipeline::classify::ClassificationClient;
use crate::pipeline::extract;
use crate::pipeline::validate::ValidationEngine;
use crate::record::{ClassificationResult, DocumentRecord, ExtractionOutcome};
use crate::registry::SchemaRegistry;
use crate::store::DocumentStore;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The document classification pipeline.
///
/// Composes extractor → classifier → registry lookup → validator → store.
/// Construct once at process start and share (`Arc` or reference) across
/// requests; all cross-request state lives in the injected stores.
pub struct DocumentPipeline {
    registry: Arc<SchemaRegistry>,
    store: Arc<DocumentStore>,
    /// Optional dependency: `None` runs the pipeline without classification
    /// and every record carries `classification: null`.
    classifier: Option<ClassificationClient>,
    validator: ValidationEngine,
    config: PipelineConfig,
}

impl DocumentPipeline {
    /// Build a pipeline from configuration alone: opens the registry and
    /// store at their configured paths and connects the classifier.
    pub fn new(config: PipelineConfig) -> Result<Self, DocTriageError> {
        let registry = Arc::new(SchemaRegistry::open(&config.schema_dir)?);
        let store = Arc::new(DocumentStore::open(&config.documents_path)?);
        let classifier = Some(ClassificationClient::new(&config)?);
        Ok(Self::with_components(registry, store, classifier, config))
    }

    /// Build a pipeline from pre-constructed components.
    ///
    /// This is the injection seam: tests pass stores over temp dirs, and
    /// callers that want extraction + persistence without an LLM pass
    /// `classifier: None`.
    pub fn with_components(
        registry: Arc<SchemaRegistry>,
        store: Arc<DocumentStore>,
        classifier: Option<ClassificationClient>,
        config: PipelineConfig,
    ) -> Self {
        let validator = ValidationEngine::new(Arc::clone(&registry));
        Self {
            registry,
            store,
            classifier,
            validator,
            config,
        }
    }

    /// The schema registry this pipeline resolves ids against.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// The document store records are appended to.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Process one uploaded file: the path points at already-persisted bytes
    /// (storage placement is the upload collaborator's job).
    ///
    /// Returns the appended record. `Err` only on registry/store persistence
    /// failures — extraction and classification problems are recorded inside
    /// the record instead.
    pub async fn process(
        &self,
        original_filename: &str,
        filepath: impl AsRef<Path>,
    ) -> Result<DocumentRecord, DocTriageError> {
        let outcome = match tokio::fs::read(filepath.as_ref()).await {
            Ok(bytes) => self.extract(original_filename, bytes).await?,
            Err(e) => {
                warn!("'{original_filename}': cannot read upload: {e}");
                ExtractionOutcome::Failed(ExtractionError::Io(e.to_string()))
            }
        };
        self.finish(original_filename, outcome).await
    }

    /// Process a document already held in memory.
    pub async fn process_bytes(
        &self,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, DocTriageError> {
        let outcome = self.extract(original_filename, bytes).await?;
        self.finish(original_filename, outcome).await
    }

    /// Process several uploads with bounded concurrency, preserving input
    /// order in the returned results. Each item gets its own `Result`; one
    /// store failure does not cancel its neighbours.
    pub async fn process_batch(
        &self,
        items: Vec<(String, PathBuf)>,
    ) -> Vec<Result<DocumentRecord, DocTriageError>> {
        stream::iter(items.into_iter().map(|(filename, path)| async move {
            self.process(&filename, &path).await
        }))
        .buffered(self.config.concurrency)
        .collect()
        .await
    }

    /// Run the CPU-bound PDF parse off the async runtime's worker threads.
    async fn extract(
        &self,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ExtractionOutcome, DocTriageError> {
        let filename = original_filename.to_string();
        tokio::task::spawn_blocking(move || extract::extract(&bytes, &filename))
            .await
            .map_err(|e| DocTriageError::Internal(format!("extraction task failed: {e}")))
    }

    /// Classify, resolve, validate, assemble, append.
    async fn finish(
        &self,
        original_filename: &str,
        outcome: ExtractionOutcome,
    ) -> Result<DocumentRecord, DocTriageError> {
        let start = Instant::now();

        // Registry I/O failures here are persistence problems, not
        // classification problems: they propagate.
        let known_ids = self.registry.list_ids()?;

        let classification = match &self.classifier {
            Some(client) => Some(client.classify(&outcome, &known_ids).await),
            None => {
                debug!("'{original_filename}': no classifier configured, skipping");
                None
            }
        };

        let schema_id = self.resolve_schema_id(classification.as_ref(), &known_ids);

        let validation = classification
            .as_ref()
            .and_then(|c| c.extracted_data.as_ref())
            .map(|data| {
                // Policy: validate whenever extracted_data is present, even
                // when the mapping is empty.
                self.validator
                    .validate(&schema_id, &serde_json::Value::Object(data.clone()))
            });

        let confidence = classification.as_ref().map(|c| c.confidence).unwrap_or(0.0);
        let record = DocumentRecord {
            classification_id: DocumentRecord::new_id(),
            filename: original_filename.to_string(),
            schema_id,
            processed_at: Utc::now(),
            parsed_content: outcome,
            classification,
            validation,
            confidence,
        };

        self.store.append(&record)?;
        info!(
            "processed '{}' as '{}' (confidence {:.2}) in {}ms",
            record.filename,
            record.schema_id,
            record.confidence,
            start.elapsed().as_millis()
        );
        Ok(record)
    }

    /// Resolve the record's schema id.
    ///
    /// The classification's id is honoured when it is a known id or the
    /// fallback sentinel (fallback records keep the sentinel even when the
    /// registry is non-empty). Without a usable classification the first
    /// registered schema wins, and an empty registry leaves only the
    /// sentinel.
    fn resolve_schema_id(
        &self,
        classification: Option<&ClassificationResult>,
        known_ids: &[String],
    ) -> String {
        let fallback = &self.config.fallback_schema_id;
        if let Some(c) = classification {
            if c.schema_id == *fallback || known_ids.iter().any(|id| *id == c.schema_id) {
                return c.schema_id.clone();
            }
            warn!(
                "classification carried unresolvable schema id '{}', falling back",
                c.schema_id
            );
        }
        known_ids
            .first()
            .cloned()
            .unwrap_or_else(|| fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ClassificationResult;
    use tempfile::tempdir;

    fn pipeline_without_classifier(dir: &Path) -> DocumentPipeline {
        let config = PipelineConfig::builder()
            .schema_dir(dir.join("schemas"))
            .documents_path(dir.join("documents.json"))
            .build()
            .unwrap();
        let registry = Arc::new(SchemaRegistry::open(&config.schema_dir).unwrap());
        let store = Arc::new(DocumentStore::open(&config.documents_path).unwrap());
        DocumentPipeline::with_components(registry, store, None, config)
    }

    #[test]
    fn resolve_honours_known_classification() {
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());
        let c = ClassificationResult::fallback("invoice", "test");
        let known = vec!["invoice".to_string(), "receipt".to_string()];
        assert_eq!(p.resolve_schema_id(Some(&c), &known), "invoice");
    }

    #[test]
    fn resolve_keeps_the_sentinel_even_with_a_populated_registry() {
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());
        let c = ClassificationResult::fallback("generic", "endpoint down");
        let known = vec!["invoice".to_string()];
        assert_eq!(p.resolve_schema_id(Some(&c), &known), "generic");
    }

    #[test]
    fn resolve_falls_back_to_first_registered_schema() {
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());
        let known = vec!["receipt".to_string(), "invoice".to_string()];
        assert_eq!(p.resolve_schema_id(None, &known), "receipt");
    }

    #[test]
    fn resolve_uses_sentinel_when_registry_is_empty() {
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());
        assert_eq!(p.resolve_schema_id(None, &[]), "generic");
    }

    #[test]
    fn resolve_rejects_unknown_non_sentinel_ids() {
        // Defence in depth: the classifier already enforces the closed set,
        // but an injected classification must not bypass it.
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());
        let c = ClassificationResult::fallback("forged", "test");
        let known = vec!["invoice".to_string()];
        assert_eq!(p.resolve_schema_id(Some(&c), &known), "invoice");
    }

    #[tokio::test]
    async fn unclassified_pipeline_still_produces_complete_records() {
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());
        p.registry()
            .add("memo", serde_json::json!({"type": "object"}))
            .unwrap();

        let record = p
            .process_bytes("not-a-pdf.pdf", b"plain text".to_vec())
            .await
            .unwrap();

        assert!(record.classification_id.starts_with("doc-"));
        assert!(record.classification.is_none());
        assert!(record.validation.is_none());
        assert_eq!(record.confidence, 0.0);
        // No classification: first registered schema wins.
        assert_eq!(record.schema_id, "memo");
        assert!(record.parsed_content.error().is_some());
        assert_eq!(p.store().list(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_degrades_to_io_extraction_failure() {
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());

        let record = p
            .process("ghost.pdf", dir.path().join("does-not-exist.pdf"))
            .await
            .unwrap();

        assert!(matches!(
            record.parsed_content.error(),
            Some(ExtractionError::Io(_))
        ));
        assert_eq!(record.schema_id, "generic");
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let dir = tempdir().unwrap();
        let p = pipeline_without_classifier(dir.path());

        let f1 = dir.path().join("one.bin");
        let f2 = dir.path().join("two.bin");
        std::fs::write(&f1, b"garbage one").unwrap();
        std::fs::write(&f2, b"garbage two").unwrap();

        let results = p
            .process_batch(vec![
                ("one.pdf".to_string(), f1),
                ("two.pdf".to_string(), f2),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().filename, "one.pdf");
        assert_eq!(results[1].as_ref().unwrap().filename, "two.pdf");
        assert_eq!(p.store().list(None).unwrap().len(), 2);
    }
}
