//! Output formatter: emits the rendered value tree as JSON, YAML, or TOML,
//! preserving map order throughout.
//!
//! JSON delegates to `serde_json` (built with the `preserve_order` feature
//! so its `Map` is backed by `IndexMap`, matching the teacher's choice of
//! `serde_json::Value` as a universal intermediate representation in
//! `core/converter.rs`). YAML and TOML need bespoke emission: `serde_yaml`'s
//! default writer does not implement this specification's quoting rules,
//! and the `toml` crate has no way to express "reject arrays of arrays"
//! short of walking the tree ourselves first.

use crate::core::error::FmxError;
use crate::core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Toml,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<OutputFormat> {
        match ext.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "yml" | "yaml" => Some(OutputFormat::Yaml),
            "toml" => Some(OutputFormat::Toml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub indent: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions { indent: 2 }
    }
}

pub fn format(value: &Value, format: OutputFormat, options: FormatOptions) -> Result<String, FmxError> {
    match format {
        OutputFormat::Json => format_json(value, options),
        OutputFormat::Yaml => format_yaml(value, options),
        OutputFormat::Toml => format_toml(value),
    }
}

fn format_json(value: &Value, options: FormatOptions) -> Result<String, FmxError> {
    check_finite_floats(value, "$")?;
    let json = crate::core::value::to_json(value);
    if options.indent == 0 {
        serde_json::to_string(&json).map_err(|e| FmxError::UnsupportedFormat {
            reason: e.to_string(),
        })
    } else {
        let indent = " ".repeat(options.indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&json, &mut ser).map_err(|e| FmxError::UnsupportedFormat {
            reason: e.to_string(),
        })?;
        String::from_utf8(buf).map_err(|e| FmxError::UnsupportedFormat {
            reason: e.to_string(),
        })
    }
}

fn check_finite_floats(value: &Value, path: &str) -> Result<(), FmxError> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(FmxError::UnsupportedFloat {
            path: path.to_string(),
        }),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_finite_floats(item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        Value::Map(map) => {
            for (k, v) in map {
                check_finite_floats(v, &format!("{path}.{k}"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn format_yaml(value: &Value, options: FormatOptions) -> Result<String, FmxError> {
    check_finite_floats(value, "$")?;
    let mut out = String::new();
    write_yaml(value, 0, options.indent.max(1), &mut out);
    if out.is_empty() {
        out.push_str("{}\n");
    }
    Ok(out)
}

fn write_yaml(value: &Value, indent_cols: usize, step: usize, out: &mut String) {
    match value {
        Value::Map(map) if !map.is_empty() => {
            let pad = " ".repeat(indent_cols);
            for (k, v) in map {
                write_map_entry(&pad, k, v, indent_cols + step, step, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            let pad = " ".repeat(indent_cols);
            for item in items {
                write_seq_entry(&pad, item, indent_cols + step, step, out);
            }
        }
        _ => {}
    }
}

/// Writes `{pad}{key}: ...` for a map entry whose own nested content (if
/// any) is indented to `child_indent`.
fn write_map_entry(pad: &str, key: &str, v: &Value, child_indent: usize, step: usize, out: &mut String) {
    match v {
        Value::Map(m) if !m.is_empty() => {
            out.push_str(&format!("{pad}{}:\n", yaml_scalar_key(key)));
            write_yaml(v, child_indent, step, out);
        }
        Value::Array(a) if !a.is_empty() => {
            out.push_str(&format!("{pad}{}:\n", yaml_scalar_key(key)));
            // Sequence items sit at the same column as the key that owns
            // them, not nested a further step in.
            write_yaml(v, pad.len(), step, out);
        }
        _ => out.push_str(&format!(
            "{pad}{}: {}\n",
            yaml_scalar_key(key),
            yaml_scalar_value(v)
        )),
    }
}

/// Writes one `- ...` sequence entry. A map item renders its first key
/// inline after the dash, with later keys aligned under it.
fn write_seq_entry(pad: &str, item: &Value, child_indent: usize, step: usize, out: &mut String) {
    match item {
        Value::Map(m) if !m.is_empty() => {
            let dash_pad = format!("{pad}- ");
            let mut iter = m.iter();
            let (k0, v0) = iter.next().unwrap();
            write_map_entry(&dash_pad, k0, v0, child_indent, step, out);
            let cont_pad = " ".repeat(pad.len() + 2);
            for (k, v) in iter {
                write_map_entry(&cont_pad, k, v, child_indent, step, out);
            }
        }
        Value::Array(a) if !a.is_empty() => {
            out.push_str(&format!("{pad}-\n"));
            write_yaml(item, child_indent, step, out);
        }
        _ => out.push_str(&format!("{pad}- {}\n", yaml_scalar_value(item))),
    }
}

fn yaml_scalar_key(key: &str) -> String {
    yaml_quote_if_needed(key)
}

fn yaml_scalar_value(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => yaml_quote_if_needed(s),
        Value::Array(_) | Value::Map(_) => String::new(),
    }
}

/// Implements the specification's YAML quoting rules: quote when the string
/// contains any of `: # & * ! | > ' " % @` or a backtick, starts with `-` or
/// `?`, equals a boolean/null literal, is empty, or looks like a number.
fn yaml_quote_if_needed(s: &str) -> String {
    const SPECIAL_CHARS: &[char] = &[':', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`'];
    let needs_quote = s.is_empty()
        || s.starts_with('-')
        || s.starts_with('?')
        || s.contains(|c| SPECIAL_CHARS.contains(&c))
        || matches!(
            s.to_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "on" | "off" | "null" | "~"
        )
        || looks_like_number(s);

    if needs_quote {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

fn looks_like_number(s: &str) -> bool {
    !s.is_empty() && s.parse::<f64>().is_ok()
}

fn format_toml(value: &Value) -> Result<String, FmxError> {
    reject_array_of_arrays(value, "$")?;
    let toml_value = to_toml_value(value)?;
    toml::to_string_pretty(&toml_value).map_err(|e| FmxError::UnsupportedFormat {
        reason: e.to_string(),
    })
}

/// TOML cannot represent an array whose elements are themselves arrays as
/// an array-of-tables, and this specification's open question (9b) fixes
/// the behavior as an outright rejection rather than an inline-array guess.
fn reject_array_of_arrays(value: &Value, path: &str) -> Result<(), FmxError> {
    match value {
        Value::Array(items) => {
            if items.iter().any(|v| matches!(v, Value::Array(_))) {
                return Err(FmxError::UnsupportedFormat {
                    reason: format!("TOML cannot represent an array of arrays at {path}"),
                });
            }
            for (i, item) in items.iter().enumerate() {
                reject_array_of_arrays(item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        Value::Map(map) => {
            for (k, v) in map {
                reject_array_of_arrays(v, &format!("{path}.{k}"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn to_toml_value(value: &Value) -> Result<toml::Value, FmxError> {
    Ok(match value {
        Value::Null => {
            return Err(FmxError::UnsupportedFormat {
                reason: "TOML has no null representation".into(),
            })
        }
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Int(i) => toml::Value::Integer(*i),
        Value::Float(f) => toml::Value::Float(*f),
        Value::Str(s) => toml::Value::String(s.clone()),
        Value::Array(items) => {
            let converted: Result<Vec<toml::Value>, FmxError> =
                items.iter().map(to_toml_value).collect();
            toml::Value::Array(converted?)
        }
        Value::Map(map) => {
            let mut table = toml::map::Map::new();
            for (k, v) in map {
                if v.is_null() {
                    continue;
                }
                table.insert(k.clone(), to_toml_value(v)?);
            }
            toml::Value::Table(table)
        }
    })
}
