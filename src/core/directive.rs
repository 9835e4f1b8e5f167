//! The closed set of `x-*` directives and the stage/dependency rules that
//! govern how they combine on a single schema node.
//!
//! Grounded on the keyword-category tables (`MAP_KEYWORDS`/`SINGLE_KEYWORDS`/
//! `ARRAY_KEYWORDS`) used by the schema-walker reference implementation in
//! this corpus: a closed, explicitly-enumerated keyword vocabulary rather
//! than open string matching scattered through the traversal.

use crate::core::error::FmxError;
use crate::core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    JmesPathFilter,
    DerivedFrom,
    DerivedUnique,
    FlattenArrays,
    MergeArrays,
    FrontmatterPart,
}

impl DirectiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::JmesPathFilter => "x-jmespath-filter",
            DirectiveKind::DerivedFrom => "x-derived-from",
            DirectiveKind::DerivedUnique => "x-derived-unique",
            DirectiveKind::FlattenArrays => "x-flatten-arrays",
            DirectiveKind::MergeArrays => "x-merge-arrays",
            DirectiveKind::FrontmatterPart => "x-frontmatter-part",
        }
    }

    /// Lower stages execute first within a node.
    pub fn stage(self) -> u8 {
        match self {
            DirectiveKind::JmesPathFilter => 1,
            DirectiveKind::DerivedFrom => 2,
            DirectiveKind::DerivedUnique => 3,
            DirectiveKind::FlattenArrays => 3,
            DirectiveKind::MergeArrays => 3,
            DirectiveKind::FrontmatterPart => 4,
        }
    }

    const ALL: [DirectiveKind; 6] = [
        DirectiveKind::JmesPathFilter,
        DirectiveKind::DerivedFrom,
        DirectiveKind::DerivedUnique,
        DirectiveKind::FlattenArrays,
        DirectiveKind::MergeArrays,
        DirectiveKind::FrontmatterPart,
    ];
}

/// A directive attached to one schema node, with its raw (already-parsed)
/// payload value.
#[derive(Debug, Clone)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub payload: Value,
}

/// Reads every recognized `x-*` keyword present on `node`, in registry
/// order, and validates the collision/dependency rules fixed by the
/// specification: at most one of `{x-derived-from, x-merge-arrays}`, and
/// `x-derived-unique` only meaningful alongside `x-derived-from`.
pub fn extract_directives(path: &str, node: &Value) -> Result<Vec<Directive>, FmxError> {
    let Value::Map(map) = node else {
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for kind in DirectiveKind::ALL {
        if let Some(payload) = map.get(kind.keyword()) {
            found.push(Directive {
                kind,
                payload: payload.clone(),
            });
        }
    }

    let has = |k: DirectiveKind| found.iter().any(|d| d.kind == k);

    if has(DirectiveKind::DerivedFrom) && has(DirectiveKind::MergeArrays) {
        return Err(FmxError::DirectiveConflict {
            path: path.to_string(),
            reason: "x-derived-from and x-merge-arrays cannot appear on the same node".into(),
        });
    }

    if has(DirectiveKind::DerivedUnique) && !has(DirectiveKind::DerivedFrom) {
        return Err(FmxError::DirectiveDependencyMissing {
            path: path.to_string(),
            directive: DirectiveKind::DerivedUnique.keyword().into(),
            missing: DirectiveKind::DerivedFrom.keyword().into(),
        });
    }

    found.sort_by_key(|d| d.kind.stage());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn node(pairs: &[(&str, Value)]) -> Value {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Map(m)
    }

    #[test]
    fn rejects_derived_from_and_merge_arrays_together() {
        let n = node(&[
            ("x-derived-from", Value::Str("a".into())),
            ("x-merge-arrays", Value::Bool(true)),
        ]);
        assert!(matches!(
            extract_directives("$", &n),
            Err(FmxError::DirectiveConflict { .. })
        ));
    }

    #[test]
    fn rejects_unique_without_derived_from() {
        let n = node(&[("x-derived-unique", Value::Bool(true))]);
        assert!(matches!(
            extract_directives("$", &n),
            Err(FmxError::DirectiveDependencyMissing { .. })
        ));
    }

    #[test]
    fn sorts_directives_by_stage() {
        let n = node(&[
            ("x-derived-unique", Value::Bool(true)),
            ("x-derived-from", Value::Str("a".into())),
            ("x-jmespath-filter", Value::Str("a[?b]".into())),
        ]);
        let directives = extract_directives("$", &n).unwrap();
        let stages: Vec<u8> = directives.iter().map(|d| d.kind.stage()).collect();
        assert_eq!(stages, vec![1, 2, 3]);
    }
}
