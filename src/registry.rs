//! Schema registry: the set of named document schemas.
//!
//! An explicit store object over an injected directory — no ambient global
//! state. One file per schema, named `{id}.json`, whose payload is the JSON
//! Schema body itself. `title`, `description` and `version` are read from the
//! body's own keywords (JSON Schema permits them), so the file on disk is
//! exactly what a caller submitted.
//!
//! Every read re-scans the directory, which keeps listings stable across
//! process restarts and makes the registry safe to share behind an `Arc`.
//! Every mutation validates first, then persists via write-new-then-rename so
//! a crash between the two leaves the prior state intact.

use crate::error::DocTriageError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Predefined schema ids seeded by [`SchemaRegistry::seed_defaults`] and
/// protected from deletion by default.
pub const PREDEFINED_SCHEMA_IDS: &[&str] = &["invoice", "receipt", "contract"];

/// A registered document schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Unique id; also the filename stem on disk.
    pub id: String,
    /// Human-readable title, from the body's `title` keyword (defaults to id).
    pub title: String,
    /// Optional description, from the body's `description` keyword.
    pub description: Option<String>,
    /// Schema version, from the body's `version` keyword (defaults to "1").
    pub version: String,
    /// The JSON Schema document itself.
    pub body: Value,
}

/// Listing entry: schema metadata without the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub version: String,
}

impl Schema {
    fn from_body(id: &str, body: Value) -> Self {
        let title = body
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or(id)
            .to_string();
        let description = body
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let version = body
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("1")
            .to_string();
        Self {
            id: id.to_string(),
            title,
            description,
            version,
            body,
        }
    }

    /// Metadata-only view for listings.
    pub fn summary(&self) -> SchemaSummary {
        SchemaSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
        }
    }
}

/// File-backed registry of named document schemas.
pub struct SchemaRegistry {
    dir: PathBuf,
    protected: BTreeSet<String>,
    write_lock: Mutex<()>,
}

impl SchemaRegistry {
    /// Open (creating if needed) a registry over `dir`, with the predefined
    /// ids protected from deletion.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DocTriageError> {
        Self::with_protected(dir, PREDEFINED_SCHEMA_IDS.iter().map(|s| s.to_string()))
    }

    /// Open a registry with an explicit protected-id set.
    pub fn with_protected(
        dir: impl Into<PathBuf>,
        protected: impl IntoIterator<Item = String>,
    ) -> Result<Self, DocTriageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| DocTriageError::Persistence {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self {
            dir,
            protected: protected.into_iter().collect(),
            write_lock: Mutex::new(()),
        })
    }

    /// Directory this registry persists to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the predefined schemas for any id not already present.
    ///
    /// Idempotent: existing files (including user-modified ones) are left
    /// untouched.
    pub fn seed_defaults(&self) -> Result<(), DocTriageError> {
        for (id, body) in default_schema_bodies() {
            if !self.schema_path(&id).exists() {
                info!("seeding predefined schema '{id}'");
                self.write_schema(&id, &body)?;
            }
        }
        Ok(())
    }

    /// List registered schemas in insertion order (file mtime, then id —
    /// recomputed from storage on every call, so stable across restarts).
    pub fn list(&self) -> Result<Vec<SchemaSummary>, DocTriageError> {
        let mut entries: Vec<(SystemTime, String)> = Vec::new();
        let read_dir = fs::read_dir(&self.dir).map_err(|e| DocTriageError::Persistence {
            path: self.dir.clone(),
            source: e,
        })?;
        for entry in read_dir {
            let entry = entry.map_err(|e| DocTriageError::Persistence {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((mtime, id.to_string()));
        }
        entries.sort();

        let mut summaries = Vec::with_capacity(entries.len());
        for (_, id) in entries {
            match self.get(&id) {
                Ok(schema) => summaries.push(schema.summary()),
                Err(e) => warn!("skipping unreadable schema '{id}' in listing: {e}"),
            }
        }
        Ok(summaries)
    }

    /// Ids of all registered schemas, in listing order.
    pub fn list_ids(&self) -> Result<Vec<String>, DocTriageError> {
        Ok(self.list()?.into_iter().map(|s| s.id).collect())
    }

    /// Fetch one schema by id.
    pub fn get(&self, id: &str) -> Result<Schema, DocTriageError> {
        let path = self.schema_path(id);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocTriageError::SchemaNotFound { id: id.to_string() })
            }
            Err(e) => return Err(DocTriageError::Persistence { path, source: e }),
        };
        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| DocTriageError::InvalidSchema {
                id: id.to_string(),
                detail: format!("stored schema is not valid JSON: {e}"),
            })?;
        Ok(Schema::from_body(id, body))
    }

    /// Register a new schema. The body must compile as a Draft 7 JSON Schema.
    pub fn add(&self, id: &str, body: Value) -> Result<Schema, DocTriageError> {
        validate_schema_id(id)?;
        check_schema_body(id, &body)?;

        let _guard = self.write_lock.lock().expect("registry lock poisoned");
        if self.schema_path(id).exists() {
            return Err(DocTriageError::DuplicateSchema { id: id.to_string() });
        }
        self.write_schema(id, &body)?;
        info!("registered schema '{id}'");
        Ok(Schema::from_body(id, body))
    }

    /// Replace an existing schema wholesale.
    pub fn update(&self, id: &str, body: Value) -> Result<Schema, DocTriageError> {
        validate_schema_id(id)?;
        check_schema_body(id, &body)?;

        let _guard = self.write_lock.lock().expect("registry lock poisoned");
        if !self.schema_path(id).exists() {
            return Err(DocTriageError::SchemaNotFound { id: id.to_string() });
        }
        self.write_schema(id, &body)?;
        info!("updated schema '{id}'");
        Ok(Schema::from_body(id, body))
    }

    /// Delete a schema. Predefined/protected ids are rejected.
    pub fn delete(&self, id: &str) -> Result<(), DocTriageError> {
        if self.protected.contains(id) {
            return Err(DocTriageError::ProtectedSchema { id: id.to_string() });
        }
        let _guard = self.write_lock.lock().expect("registry lock poisoned");
        let path = self.schema_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("deleted schema '{id}'");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocTriageError::SchemaNotFound { id: id.to_string() })
            }
            Err(e) => Err(DocTriageError::Persistence { path, source: e }),
        }
    }

    fn schema_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Atomic replace: write `{id}.json.tmp`, then rename over the target.
    fn write_schema(&self, id: &str, body: &Value) -> Result<(), DocTriageError> {
        let path = self.schema_path(id);
        let tmp = self.dir.join(format!("{id}.json.tmp"));
        let payload =
            serde_json::to_vec_pretty(body).map_err(|e| DocTriageError::Internal(e.to_string()))?;
        fs::write(&tmp, payload).map_err(|e| DocTriageError::Persistence {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| DocTriageError::Persistence { path, source: e })?;
        debug!("persisted schema '{id}'");
        Ok(())
    }
}

/// Ids double as filenames; keep them boring.
fn validate_schema_id(id: &str) -> Result<(), DocTriageError> {
    let ok = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(DocTriageError::InvalidSchema {
            id: id.to_string(),
            detail: "id must be 1-64 chars of [A-Za-z0-9_-]".into(),
        })
    }
}

/// Structural Draft 7 check: the body must compile into a validator.
/// Incoherent keyword usage ("type": 42, "required": "name", ...) fails here,
/// at add/update time — never at validate time.
fn check_schema_body(id: &str, body: &Value) -> Result<(), DocTriageError> {
    if !body.is_object() {
        return Err(DocTriageError::InvalidSchema {
            id: id.to_string(),
            detail: "schema body must be a JSON object".into(),
        });
    }
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft7)
        .build(body)
        .map(|_| ())
        .map_err(|e| DocTriageError::InvalidSchema {
            id: id.to_string(),
            detail: e.to_string(),
        })
}

/// Built-in bodies for the predefined document types.
fn default_schema_bodies() -> Vec<(String, Value)> {
    use serde_json::json;
    vec![
        (
            "invoice".to_string(),
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "title": "Invoice",
                "description": "A bill issued to a customer",
                "version": "1",
                "type": "object",
                "properties": {
                    "invoice_number": { "type": "string" },
                    "date": { "type": "string" },
                    "vendor": { "type": "string" },
                    "total": { "type": ["string", "number"] }
                },
                "required": ["invoice_number", "total"]
            }),
        ),
        (
            "receipt".to_string(),
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "title": "Receipt",
                "description": "Proof of a completed payment",
                "version": "1",
                "type": "object",
                "properties": {
                    "merchant": { "type": "string" },
                    "date": { "type": "string" },
                    "amount": { "type": ["string", "number"] },
                    "payment_method": { "type": "string" }
                },
                "required": ["amount"]
            }),
        ),
        (
            "contract".to_string(),
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "title": "Contract",
                "description": "A signed agreement between parties",
                "version": "1",
                "type": "object",
                "properties": {
                    "parties": { "type": "array", "items": { "type": "string" } },
                    "effective_date": { "type": "string" },
                    "term": { "type": "string" }
                },
                "required": ["parties"]
            }),
        ),
    ]
}
