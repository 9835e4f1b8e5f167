//! Markdown front-matter extraction.
//!
//! Finds the YAML block at the head of a Markdown file and parses it with
//! `serde_yaml`. Grounded on the frontmatter-extraction reference in this
//! corpus (`FRONTMATTER_RE` built once behind a `Lazy<Regex>`), extended
//! here only to fail closed rather than degrade gracefully: a schema-driven
//! build needs every input document to contribute data, so a malformed or
//! missing front-matter block is a hard `FrontmatterParseFailed`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::FmxError;
use crate::core::value::{from_json, Value};

static FRONTMATTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^---\n(?P<yaml>.*?)\n---").unwrap());

/// One Markdown file's parsed front matter, labeled by its source path.
#[derive(Debug, Clone)]
pub struct FrontmatterDocument {
    pub source_path: String,
    pub data: Value,
}

/// Extracts and parses the front matter of `content`. Returns `Ok(None)`
/// when the file carries no `---`-delimited header at all (skipped by the
/// caller, not an error); returns `Err` when a header is present but fails
/// to parse as YAML or does not resolve to a map.
pub fn extract(source_path: &str, content: &str) -> Result<Option<Value>, FmxError> {
    let Some(caps) = FRONTMATTER_RE.captures(content) else {
        return Ok(None);
    };
    let yaml_block = caps.name("yaml").unwrap().as_str();

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(yaml_block).map_err(|e| FmxError::FrontmatterParseFailed {
            path: source_path.to_string(),
            message: e.to_string(),
        })?;

    let json: serde_json::Value =
        serde_json::to_value(&yaml).map_err(|e| FmxError::FrontmatterParseFailed {
            path: source_path.to_string(),
            message: e.to_string(),
        })?;

    let value = from_json(json);
    if !matches!(value, Value::Map(_)) {
        return Err(FmxError::FrontmatterParseFailed {
            path: source_path.to_string(),
            message: "front matter must be a YAML mapping".into(),
        });
    }
    Ok(Some(value))
}

/// Loads and parses front matter for every path in `paths`, in the order
/// given (the caller is responsible for sorting paths lexicographically so
/// batch order is deterministic, per the core's invariants).
pub fn load_batch(paths: &[(String, String)]) -> Result<Vec<FrontmatterDocument>, FmxError> {
    let mut batch = Vec::with_capacity(paths.len());
    for (source_path, content) in paths {
        if let Some(data) = extract(source_path, content)? {
            batch.push(FrontmatterDocument {
                source_path: source_path.clone(),
                data,
            });
        }
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_yaml_map_between_fences() {
        let content = "---\ntitle: Hello\ncount: 3\n---\nBody text.\n";
        let value = extract("doc.md", content).unwrap().unwrap();
        assert_eq!(value.at("title"), Some(&Value::Str("Hello".into())));
        assert_eq!(value.at("count"), Some(&Value::Int(3)));
    }

    #[test]
    fn returns_none_for_documents_without_front_matter() {
        let content = "# Just a heading\n\nNo front matter here.\n";
        assert!(extract("doc.md", content).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_yaml() {
        let content = "---\nkey: [unterminated\n---\n";
        assert!(matches!(
            extract("doc.md", content),
            Err(FmxError::FrontmatterParseFailed { .. })
        ));
    }

    #[test]
    fn rejects_non_mapping_front_matter() {
        let content = "---\n- a\n- b\n---\n";
        assert!(matches!(
            extract("doc.md", content),
            Err(FmxError::FrontmatterParseFailed { .. })
        ));
    }
}
