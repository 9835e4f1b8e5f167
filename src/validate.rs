//! Upstream schema validation (SPEC_FULL.md 6A): checks each document's
//! front matter against the schema's standard JSON Schema keywords before
//! the transformation core runs, so a malformed document is diagnosed in
//! terms of the schema rather than a directive that never got valid data.
//!
//! Grounded directly on the teacher's `core/validator.rs::validate_json_schema`,
//! which compiles a schema once with `jsonschema::validator_for` and
//! iterates `.iter_errors(data)` per instance.

use crate::core::error::FmxError;
use crate::core::value::to_json;
use crate::frontmatter::FrontmatterDocument;

/// Validates every document in `batch` against `schema`'s standard
/// (non-`x-*`) keywords. `x-*` keywords are simply unknown to `jsonschema`
/// and are ignored by it, so this does not need to strip them first.
pub fn validate_batch(schema: &serde_json::Value, batch: &[FrontmatterDocument]) -> Result<(), FmxError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| FmxError::SchemaParseFailed {
        path: "<schema>".into(),
        message: e.to_string(),
    })?;

    for doc in batch {
        let instance = to_json(&doc.data);
        let errors: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        if !errors.is_empty() {
            return Err(FmxError::SchemaValidationFailed {
                source_path: doc.source_path.clone(),
                errors,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use indexmap::IndexMap;
    use serde_json::json;

    fn doc(path: &str, pairs: &[(&str, Value)]) -> FrontmatterDocument {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        FrontmatterDocument {
            source_path: path.to_string(),
            data: Value::Map(m),
        }
    }

    #[test]
    fn passes_a_document_satisfying_required_fields() {
        let schema = json!({
            "type": "object",
            "required": ["c1"],
            "properties": { "c1": { "type": "string" } }
        });
        let batch = vec![doc("a.md", &[("c1", Value::Str("git".into()))])];
        assert!(validate_batch(&schema, &batch).is_ok());
    }

    #[test]
    fn fails_a_document_missing_a_required_field() {
        let schema = json!({
            "type": "object",
            "required": ["c1"],
        });
        let batch = vec![doc("a.md", &[("c2", Value::Str("x".into()))])];
        assert!(matches!(
            validate_batch(&schema, &batch),
            Err(FmxError::SchemaValidationFailed { .. })
        ));
    }
}
