//! Depth-first schema traversal yielding ordered directive sites.
//!
//! Adapted from the fold-style `SchemaFolder` traversal used elsewhere in
//! this corpus: a node is visited, its directives extracted, then its
//! children (`properties`, and `items` when it is itself a schema object)
//! are visited in declaration order. `$ref` is not handled here; the
//! schema is assumed fully resolved before it reaches the walker (see
//! `schema_ref`).

use crate::core::directive::{extract_directives, Directive};
use crate::core::error::FmxError;
use crate::core::value::Value;

/// One traversal result: the JSON-pointer-style path to a schema node and
/// the (stage-ordered) directives attached to it.
#[derive(Debug, Clone)]
pub struct DirectiveSite {
    pub path: String,
    pub directives: Vec<Directive>,
}

/// Walks `schema` depth-first and returns every node carrying at least one
/// directive, in traversal (parent-before-child) order.
pub fn walk(schema: &Value) -> Result<Vec<DirectiveSite>, FmxError> {
    let mut sites = Vec::new();
    walk_node(schema, "$", &mut sites, 0)?;
    Ok(sites)
}

const MAX_DEPTH: usize = 256;

fn walk_node(
    node: &Value,
    path: &str,
    sites: &mut Vec<DirectiveSite>,
    depth: usize,
) -> Result<(), FmxError> {
    if depth > MAX_DEPTH {
        return Err(FmxError::DirectiveConflict {
            path: path.to_string(),
            reason: "cyclic".into(),
        });
    }

    let directives = extract_directives(path, node)?;
    if !directives.is_empty() {
        sites.push(DirectiveSite {
            path: path.to_string(),
            directives,
        });
    }

    let Value::Map(map) = node else {
        return Ok(());
    };

    if let Some(Value::Map(properties)) = map.get("properties") {
        for (key, child) in properties {
            let child_path = format!("{path}.{key}");
            walk_node(child, &child_path, sites, depth + 1)?;
        }
    }

    if let Some(items) = map.get("items") {
        if matches!(items, Value::Map(_)) {
            let child_path = format!("{path}[]");
            walk_node(items, &child_path, sites, depth + 1)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn schema_with_directive() -> Value {
        let mut available = IndexMap::new();
        available.insert("type".to_string(), Value::Str("array".into()));
        available.insert("x-derived-from".to_string(), Value::Str("c1".into()));
        available.insert("x-derived-unique".to_string(), Value::Bool(true));

        let mut properties = IndexMap::new();
        properties.insert("availableConfigs".to_string(), Value::Map(available));

        let mut root = IndexMap::new();
        root.insert("type".to_string(), Value::Str("object".into()));
        root.insert("properties".to_string(), Value::Map(properties));
        Value::Map(root)
    }

    #[test]
    fn visits_nested_properties_with_dotted_path() {
        let schema = schema_with_directive();
        let sites = walk(&schema).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].path, "$.availableConfigs");
        assert_eq!(sites[0].directives.len(), 2);
    }

    #[test]
    fn schema_with_no_directives_yields_no_sites() {
        let mut root = IndexMap::new();
        root.insert("type".to_string(), Value::Str("object".into()));
        let schema = Value::Map(root);
        assert!(walk(&schema).unwrap().is_empty());
    }
}
