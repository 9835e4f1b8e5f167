//! The transformation core's own value tree.
//!
//! Front matter, schema nodes, and rendered output all live in this type
//! rather than in `serde_json::Value` directly, because the pipeline needs
//! map-key order to survive every transformation and needs path-addressed
//! reads/writes with specific failure modes (`PathOutOfRange` rather than a
//! silent no-op).

use indexmap::IndexMap;
use std::fmt;

use crate::core::error::FmxError;

/// An ordered map from string keys to `Value`s. Iteration order is
/// insertion order, which is what makes `Value::Map` suitable for anything
/// that must round-trip through YAML or the template renderer unchanged.
pub type Map = IndexMap<String, Value>;

/// The tagged sum every stage of the pipeline operates on.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Structural equality: map key order does not matter for equality even
    /// though it is preserved for output (invariant I4 relies on this).
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|v2| v.structural_eq(v2)))
            }
            _ => false,
        }
    }

    /// Resolves a dotted/bracket path (`a.b`, `a[n]`) against this value.
    /// A missing intermediate yields `None`, never an error: callers decide
    /// whether absence is fatal.
    pub fn at(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in parse_path(path) {
            current = match (&segment, current) {
                (PathSegment::Key(k), Value::Map(m)) => m.get(k)?,
                (PathSegment::Index(i), Value::Array(a)) => a.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Writes `value` at `path`, creating intermediate maps as needed.
    /// Arrays are never implicitly grown: writing at or past the end of an
    /// existing array is a hard error (`PathOutOfRange`).
    pub fn insert(&mut self, path: &str, value: Value) -> Result<(), FmxError> {
        let segments = parse_path(path);
        self.insert_segments(&segments, value)
    }

    fn insert_segments(&mut self, segments: &[PathSegment], value: Value) -> Result<(), FmxError> {
        let Some((head, rest)) = segments.split_first() else {
            *self = value;
            return Ok(());
        };
        match head {
            PathSegment::Key(k) => {
                if !matches!(self, Value::Map(_)) {
                    *self = Value::Map(Map::new());
                }
                let Value::Map(m) = self else { unreachable!() };
                if rest.is_empty() {
                    m.insert(k.clone(), value);
                    return Ok(());
                }
                let entry = m.entry(k.clone()).or_insert(Value::Null);
                entry.insert_segments(rest, value)
            }
            PathSegment::Index(i) => {
                let Value::Array(a) = self else {
                    return Err(FmxError::PathOutOfRange {
                        path: format!("[{i}]"),
                    });
                };
                if *i >= a.len() {
                    return Err(FmxError::PathOutOfRange {
                        path: format!("[{i}]"),
                    });
                }
                if rest.is_empty() {
                    a[*i] = value;
                    return Ok(());
                }
                a[*i].insert_segments(rest, value)
            }
        }
    }

    pub fn deep_clone(&self) -> Value {
        self.clone()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(_) | Value::Map(_) => {
                write!(f, "{}", serde_json::to_string(&to_json(self)).unwrap_or_default())
            }
        }
    }
}

#[derive(Debug, Clone)]
enum PathSegment {
    Key(String),
    Index(usize),
}

fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for dotted in path.split('.') {
        let mut rest = dotted;
        while let Some(bracket_start) = rest.find('[') {
            let key_part = &rest[..bracket_start];
            if !key_part.is_empty() {
                segments.push(PathSegment::Key(key_part.to_string()));
            }
            let Some(bracket_end) = rest[bracket_start..].find(']') else {
                break;
            };
            let index_str = &rest[bracket_start + 1..bracket_start + bracket_end];
            if let Ok(idx) = index_str.parse::<usize>() {
                segments.push(PathSegment::Index(idx));
            }
            rest = &rest[bracket_start + bracket_end + 1..];
        }
        if !rest.is_empty() {
            segments.push(PathSegment::Key(rest.to_string()));
        }
    }
    segments
}

/// Converts a `serde_json::Value` (as produced by parsing YAML/JSON input)
/// into the core `Value`, preserving object key order.
pub fn from_json(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(a) => Value::Array(a.into_iter().map(from_json).collect()),
        serde_json::Value::Object(o) => {
            Value::Map(o.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

/// Converts the core `Value` back to `serde_json::Value`, used as the JSON
/// output backend and as the bridge into the `jmespath` evaluator.
pub fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Array(a) => serde_json::Value::Array(a.iter().map(to_json).collect()),
        Value::Map(m) => {
            serde_json::Value::Object(m.iter().map(|(k, v)| (k.clone(), to_json(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn at_resolves_dotted_and_bracket_paths() {
        let v = map(&[(
            "a",
            map(&[("b", Value::Array(vec![Value::Int(1), Value::Int(2)]))]),
        )]);
        assert_eq!(v.at("a.b[1]"), Some(&Value::Int(2)));
        assert_eq!(v.at("a.b[5]"), None);
        assert_eq!(v.at("missing"), None);
    }

    #[test]
    fn insert_past_array_end_is_path_out_of_range() {
        let mut v = map(&[("items", Value::Array(vec![Value::Int(1)]))]);
        let err = v.insert("items[1]", Value::Int(2));
        assert!(matches!(err, Err(FmxError::PathOutOfRange { .. })));
        let err = v.insert("items[9]", Value::Int(3));
        assert!(matches!(err, Err(FmxError::PathOutOfRange { .. })));
        v.insert("items[0]", Value::Int(9)).unwrap();
        assert_eq!(v.at("items[0]"), Some(&Value::Int(9)));
    }

    #[test]
    fn structural_eq_ignores_key_order() {
        let a = map(&[("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = map(&[("y", Value::Int(2)), ("x", Value::Int(1))]);
        assert!(a.structural_eq(&b));
    }
}
