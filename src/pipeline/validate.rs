//! Field validation: extracted data against a registered JSON Schema.
//!
//! Infallible by contract — every path yields a [`ValidationResult`] value.
//! A missing schema is a validation failure ("schema not found"), not an
//! error the pipeline has to special-case, so a classification pointing at
//! the fallback sentinel (or at a schema deleted since) still produces a
//! complete record.

use crate::record::ValidationResult;
use crate::registry::SchemaRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Validates extracted-data mappings against schemas from the registry.
///
/// Pure given `(schema_id, data, current registry state)`: repeated calls
/// with unchanged inputs give identical results.
pub struct ValidationEngine {
    registry: Arc<SchemaRegistry>,
}

impl ValidationEngine {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Validate `data` against the schema registered under `schema_id`.
    ///
    /// Standard Draft 7 semantics: type checks, required properties, nested
    /// object/array rules. The first validation error's message is reported
    /// on failure.
    pub fn validate(&self, schema_id: &str, data: &Value) -> ValidationResult {
        let schema = match self.registry.get(schema_id) {
            Ok(s) => s,
            Err(e) => {
                debug!("validation against '{schema_id}' skipped: {e}");
                return ValidationResult::invalid(format!("schema '{schema_id}' not found"));
            }
        };

        let validator = match jsonschema::options()
            .with_draft(jsonschema::Draft::Draft7)
            .build(&schema.body)
        {
            Ok(v) => v,
            // Registry validation normally prevents this; a hand-edited file
            // on disk can still reach it.
            Err(e) => {
                return ValidationResult::invalid(format!(
                    "schema '{schema_id}' failed to compile: {e}"
                ))
            }
        };

        match validator.validate(data) {
            Ok(()) => ValidationResult::valid(),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn engine_with(id: &str, body: Value) -> (tempfile::TempDir, ValidationEngine) {
        let dir = tempdir().unwrap();
        let registry = Arc::new(SchemaRegistry::open(dir.path()).unwrap());
        registry.add(id, body).unwrap();
        (dir, ValidationEngine::new(registry))
    }

    fn order_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "order_id": { "type": "string" },
                "quantity": { "type": "integer", "minimum": 1 },
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "sku": { "type": "string" } },
                        "required": ["sku"]
                    }
                }
            },
            "required": ["order_id"]
        })
    }

    #[test]
    fn conforming_data_is_valid() {
        let (_dir, engine) = engine_with("order", order_schema());
        let data = json!({"order_id": "A-1", "quantity": 2, "items": [{"sku": "X"}]});
        assert_eq!(engine.validate("order", &data), ValidationResult::valid());
    }

    #[test]
    fn missing_required_property_fails_with_a_message() {
        let (_dir, engine) = engine_with("order", order_schema());
        let result = engine.validate("order", &json!({"quantity": 2}));
        assert!(!result.is_valid);
        assert!(result.error_message.unwrap().contains("order_id"));
    }

    #[test]
    fn wrong_type_fails() {
        let (_dir, engine) = engine_with("order", order_schema());
        let result = engine.validate("order", &json!({"order_id": 17}));
        assert!(!result.is_valid);
    }

    #[test]
    fn nested_array_rules_are_enforced() {
        let (_dir, engine) = engine_with("order", order_schema());
        let data = json!({"order_id": "A-1", "items": [{"name": "no sku"}]});
        let result = engine.validate("order", &data);
        assert!(!result.is_valid);
        assert!(result.error_message.unwrap().contains("sku"));
    }

    #[test]
    fn unknown_schema_is_a_failure_result_not_a_pass() {
        let (_dir, engine) = engine_with("order", order_schema());
        let result = engine.validate("ghost", &json!({}));
        assert!(!result.is_valid);
        assert!(result.error_message.unwrap().contains("not found"));
    }

    #[test]
    fn validation_is_idempotent() {
        let (_dir, engine) = engine_with("order", order_schema());
        let data = json!({"order_id": "A-1", "quantity": 0});
        let first = engine.validate("order", &data);
        let second = engine.validate("order", &data);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_object_against_no_required_schema_is_valid() {
        let (_dir, engine) = engine_with("loose", json!({"type": "object"}));
        assert!(engine.validate("loose", &json!({})).is_valid);
    }
}
