//! Document store: the append-only collection of processed records.
//!
//! A single JSON file holds every [`DocumentRecord`]. Reads reload the file
//! each time — no in-memory cache can go stale, and at the volumes this
//! pipeline handles the reread cost is noise. Appends are read-modify-write
//! under an internal mutex, persisted with the write-new-then-rename
//! discipline, so in-process concurrent writers cannot lose each other's
//! records. Writers in *other* processes still race (last one wins); putting
//! the collection behind a real database is the upgrade path for that.

use crate::error::DocTriageError;
use crate::record::DocumentRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// File-backed store of processed document records.
pub struct DocumentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    /// Open a store at `path`, creating the parent directory if needed.
    /// The collection file itself is created lazily on first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DocTriageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DocTriageError::Persistence {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the durable collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record: load the current set, add, persist atomically.
    pub fn append(&self, record: &DocumentRecord) -> Result<(), DocTriageError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut records = self.load_all()?;
        records.push(record.clone());
        self.persist(&records)?;
        info!(
            "appended record {} ({} -> '{}'), {} total",
            record.classification_id,
            record.filename,
            record.schema_id,
            records.len()
        );
        Ok(())
    }

    /// All records, optionally filtered by schema id, in insertion order.
    /// Always reloads from durable storage.
    pub fn list(&self, schema_id: Option<&str>) -> Result<Vec<DocumentRecord>, DocTriageError> {
        let records = self.load_all()?;
        Ok(match schema_id {
            None => records,
            Some(id) => records.into_iter().filter(|r| r.schema_id == id).collect(),
        })
    }

    fn load_all(&self) -> Result<Vec<DocumentRecord>, DocTriageError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DocTriageError::Persistence {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| DocTriageError::CorruptStore {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }

    /// Atomic replace of the whole collection.
    fn persist(&self, records: &[DocumentRecord]) -> Result<(), DocTriageError> {
        let payload = serde_json::to_vec_pretty(records)
            .map_err(|e| DocTriageError::Internal(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload).map_err(|e| DocTriageError::Persistence {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| DocTriageError::Persistence {
            path: self.path.clone(),
            source: e,
        })?;
        debug!("persisted {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::record::{ClassificationResult, ExtractionOutcome};
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(schema_id: &str, filename: &str) -> DocumentRecord {
        DocumentRecord {
            classification_id: DocumentRecord::new_id(),
            filename: filename.to_string(),
            schema_id: schema_id.to_string(),
            processed_at: Utc::now(),
            parsed_content: ExtractionOutcome::Failed(ExtractionError::NotAPdf("test".into())),
            classification: Some(ClassificationResult::fallback(schema_id, "test fixture")),
            validation: None,
            confidence: 0.0,
        }
    }

    #[test]
    fn empty_store_lists_nothing() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("documents.json")).unwrap();
        assert!(store.list(None).unwrap().is_empty());
        assert!(store.list(Some("invoice")).unwrap().is_empty());
    }

    #[test]
    fn filter_preserves_insertion_order() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("documents.json")).unwrap();

        let a = record("invoice", "a.pdf");
        let b = record("contract", "b.pdf");
        let c = record("contract", "c.pdf");
        for r in [&a, &b, &c] {
            store.append(r).unwrap();
        }

        let contracts = store.list(Some("contract")).unwrap();
        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[0].classification_id, b.classification_id);
        assert_eq!(contracts[1].classification_id, c.classification_id);

        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].classification_id, a.classification_id);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let id = {
            let store = DocumentStore::open(&path).unwrap();
            let r = record("invoice", "a.pdf");
            store.append(&r).unwrap();
            r.classification_id
        };
        let store = DocumentStore::open(&path).unwrap();
        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].classification_id, id);
    }

    #[test]
    fn reads_see_out_of_band_writes() {
        // Reload-on-read: a second handle over the same file observes
        // appends made through the first with no shared state.
        let dir = tempdir().unwrap();
        let path = dir.path().join("documents.json");
        let writer = DocumentStore::open(&path).unwrap();
        let reader = DocumentStore::open(&path).unwrap();

        assert!(reader.list(None).unwrap().is_empty());
        writer.append(&record("receipt", "r.pdf")).unwrap();
        assert_eq!(reader.list(None).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_collection_surfaces_as_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documents.json");
        fs::write(&path, b"{ definitely not a record list").unwrap();
        let store = DocumentStore::open(&path).unwrap();
        assert!(matches!(
            store.list(None).unwrap_err(),
            DocTriageError::CorruptStore { .. }
        ));
    }

    #[test]
    fn dangling_schema_ids_are_served_verbatim() {
        // A record may reference a schema deleted later; reads must not
        // error or hide it.
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("documents.json")).unwrap();
        store.append(&record("deleted-schema", "x.pdf")).unwrap();
        let got = store.list(Some("deleted-schema")).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        use std::sync::Arc;
        let dir = tempdir().unwrap();
        let store = Arc::new(DocumentStore::open(dir.path().join("documents.json")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.append(&record("invoice", &format!("f{i}.pdf"))).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.list(None).unwrap().len(), 8);
    }
}
