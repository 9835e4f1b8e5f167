//! Eager `$ref`/`$defs` resolution.
//!
//! The transformation core assumes a fully-inlined schema tree (SPEC_FULL.md
//! 3A); this module performs that inlining before the core ever sees the
//! schema, using the same depth-first-traversal shape as `core::walker`
//! adapted to rewrite `$ref` pointers in place and to detect cycles, which
//! the core itself refuses to handle.

use std::collections::HashSet;

use crate::core::error::FmxError;
use crate::core::value::Value;

/// Resolves every `$ref` in `schema` against its own `$defs`/`definitions`,
/// returning a new tree with no `$ref` keywords remaining.
pub fn resolve(schema: &Value) -> Result<Value, FmxError> {
    let mut visiting = HashSet::new();
    resolve_node(schema, schema, &mut visiting)
}

fn resolve_node(node: &Value, root: &Value, visiting: &mut HashSet<String>) -> Result<Value, FmxError> {
    let Value::Map(map) = node else {
        return Ok(node.clone());
    };

    if let Some(Value::Str(pointer)) = map.get("$ref") {
        if !visiting.insert(pointer.clone()) {
            return Err(FmxError::RefCycle {
                pointer: pointer.clone(),
            });
        }
        let target = resolve_pointer(root, pointer)?;
        let resolved = resolve_node(&target, root, visiting)?;
        visiting.remove(pointer);
        return Ok(resolved);
    }

    let mut out = indexmap::IndexMap::new();
    for (k, v) in map {
        out.insert(k.clone(), resolve_node(v, root, visiting)?);
    }
    Ok(Value::Map(out))
}

/// Resolves a JSON Pointer of the form `#/$defs/Name` or `#/definitions/Name`
/// against `root`.
fn resolve_pointer(root: &Value, pointer: &str) -> Result<Value, FmxError> {
    let Some(fragment) = pointer.strip_prefix('#') else {
        return Err(FmxError::RefCycle {
            pointer: pointer.to_string(),
        });
    };
    let path = fragment.trim_start_matches('/').replace('/', ".");
    root.at(&path)
        .cloned()
        .ok_or_else(|| FmxError::RefCycle {
            pointer: pointer.to_string(),
        })
}
