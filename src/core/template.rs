//! Template rendering: expands `x-frontmatter-part` arrays, substitutes
//! `{path}`/`{path?}` placeholders, and takes cached aggregator values
//! verbatim ("aggregation binding").
//!
//! Adapted from the teacher's `core/template.rs`, which walks a
//! `serde_json::Value` template substituting `{{ }}`-delimited variables.
//! The delimiter syntax here is the specification's single-brace form, and
//! array expansion iterates the document batch rather than a caller-supplied
//! variable array.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;

use crate::core::directive::DirectiveKind;
use crate::core::error::FmxError;
use crate::core::value::Value;
use crate::core::walker::DirectiveSite;
use crate::frontmatter::FrontmatterDocument;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_.\[\]]+)(\?)?\}").unwrap());

/// Renders a scalar string against `context`, replacing every `{path}` or
/// `{path?}` token. Unknown required paths fail with `VariableNotFound`;
/// unknown optional paths (trailing `?`) render as an empty string.
pub fn render_scalar(template: &str, context: &Value) -> Result<String, FmxError> {
    let mut result = String::with_capacity(template.len());
    let mut last_end = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let whole = caps.get(0).unwrap();
        let path = caps.get(1).unwrap().as_str();
        let optional = caps.get(2).is_some();

        result.push_str(&template[last_end..whole.start()]);
        match context.at(path) {
            Some(v) => result.push_str(&scalar_to_string(v)?),
            None if optional => {}
            None => {
                return Err(FmxError::VariableNotFound {
                    path: path.to_string(),
                })
            }
        }
        last_end = whole.end();
    }
    result.push_str(&template[last_end..]);
    Ok(result)
}

fn scalar_to_string(v: &Value) -> Result<String, FmxError> {
    match v {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Str(s) => Ok(s.clone()),
        Value::Array(_) | Value::Map(_) => Err(FmxError::InvalidTemplateFormat {
            path: String::new(),
            reason: "cannot substitute an array or map into a scalar slot".into(),
        }),
    }
}

/// Renders `template` against `context`, recursing into maps/arrays in
/// declaration order and substituting placeholder strings along the way.
pub fn render_value(template: &Value, context: &Value) -> Result<Value, FmxError> {
    match template {
        Value::Str(s) => Ok(Value::Str(render_scalar(s, context)?)),
        Value::Array(items) => {
            let rendered: Result<Vec<Value>, FmxError> =
                items.iter().map(|item| render_value(item, context)).collect();
            Ok(Value::Array(rendered?))
        }
        Value::Map(map) => {
            let mut out = indexmap::IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), render_value(v, context)?);
            }
            Ok(Value::Map(out))
        }
        other => Ok(other.clone()),
    }
}

/// Returns the node's template body: its own `x-template` keyword if
/// present, else its standard `default` keyword.
pub fn template_body(schema_node: &Value) -> Option<&Value> {
    let Value::Map(map) = schema_node else {
        return None;
    };
    map.get("x-template").or_else(|| map.get("default"))
}

/// Renders a node carrying `x-frontmatter-part`: one output item per batch
/// document, in batch order (invariant I6), using the site's template body.
///
/// Per-document rendering is independent (each item only reads its own
/// document), so when `parallel` is set it runs on a `rayon` pool sized to
/// `max_workers`; items are still collected back in batch order, so the
/// result is identical to the sequential path (SPEC_FULL.md 5).
pub fn render_frontmatter_part(
    site: &DirectiveSite,
    schema_node: &Value,
    batch: &[FrontmatterDocument],
    parallel: bool,
    max_workers: usize,
) -> Result<Value, FmxError> {
    let has_part = site
        .directives
        .iter()
        .any(|d| d.kind == DirectiveKind::FrontmatterPart);
    debug_assert!(has_part);

    let Some(item_template) = template_body(schema_node) else {
        return Err(FmxError::InvalidTemplateFormat {
            path: site.path.clone(),
            reason: "x-frontmatter-part requires an x-template or default item shape".into(),
        });
    };

    let items = if parallel && batch.len() > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers.max(1))
            .build()
            .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().expect("default rayon pool"));
        pool.install(|| {
            batch
                .par_iter()
                .map(|doc| render_value(item_template, &doc.data))
                .collect::<Result<Vec<Value>, FmxError>>()
        })?
    } else {
        let mut items = Vec::with_capacity(batch.len());
        for doc in batch {
            items.push(render_value(item_template, &doc.data)?);
        }
        items
    };
    Ok(Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn doc_value(pairs: &[(&str, Value)]) -> Value {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Map(m)
    }

    #[test]
    fn substitutes_required_and_optional_placeholders() {
        let ctx = doc_value(&[("title", Value::Str("Hello".into()))]);
        let rendered = render_scalar("{title} — {subtitle?}", &ctx).unwrap();
        assert_eq!(rendered, "Hello — ");
    }

    #[test]
    fn missing_required_placeholder_is_an_error() {
        let ctx = doc_value(&[]);
        assert!(matches!(
            render_scalar("{title}", &ctx),
            Err(FmxError::VariableNotFound { .. })
        ));
    }

    #[test]
    fn array_in_scalar_slot_is_rejected() {
        let ctx = doc_value(&[("tags", Value::Array(vec![Value::Str("a".into())]))]);
        let err = render_scalar("{tags}", &ctx);
        assert!(matches!(err, Err(FmxError::InvalidTemplateFormat { .. })));
    }

    #[test]
    fn render_value_preserves_map_key_order() {
        let template = doc_value(&[
            ("c1", Value::Str("{c1}".into())),
            ("c2", Value::Str("{c2}".into())),
        ]);
        let ctx = doc_value(&[
            ("c1", Value::Str("git".into())),
            ("c2", Value::Str("create".into())),
        ]);
        let rendered = render_value(&template, &ctx).unwrap();
        let Value::Map(m) = rendered else { panic!() };
        let keys: Vec<&str> = m.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["c1", "c2"]);
    }
}
