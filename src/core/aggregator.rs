//! Cross-document derivation, uniqueness, flattening, and merging.
//!
//! Runs once per directive site across the whole batch, single-threaded,
//! producing a cache the renderer later substitutes verbatim
//! ("aggregation binding", SPEC_FULL.md 4.4). Order of operations within a
//! site: filter (if present) -> derive-from or merge-arrays -> flatten ->
//! unique, matching the stage table in `core::directive`.

use rayon::prelude::*;

use crate::core::directive::{Directive, DirectiveKind};
use crate::core::error::FmxError;
use crate::core::evaluator::{Evaluator, JmesPathEvaluator};
use crate::core::orchestrator::PipelineOptions;
use crate::core::value::Value;
use crate::frontmatter::FrontmatterDocument;

/// Rough size estimate used by the soft memory-bounds check (SPEC_FULL.md
/// 4.5): cheap enough to call per element without itself dominating
/// aggregation cost, generous enough not to flag ordinary payloads.
fn approx_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 8,
        Value::Str(s) => s.len(),
        Value::Array(items) => items.iter().map(approx_size).sum(),
        Value::Map(map) => map.iter().map(|(k, v)| k.len() + approx_size(v)).sum(),
    }
}

/// A path segment of an `x-derived-from` expression: either a literal key
/// or the `[]` marker meaning "flatten one array level while walking".
enum DerivedSegment {
    Key(String),
    Flatten,
}

fn parse_derived_path(path: &str) -> Vec<DerivedSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(stripped) = part.strip_suffix("[]") {
            if !stripped.is_empty() {
                segments.push(DerivedSegment::Key(stripped.to_string()));
            }
            segments.push(DerivedSegment::Flatten);
        } else {
            segments.push(DerivedSegment::Key(part.to_string()));
        }
    }
    segments
}

fn walk_derived<'a>(value: &'a Value, segments: &[DerivedSegment], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match head {
        DerivedSegment::Key(k) => {
            let Value::Map(m) = value else { return };
            let Some(child) = m.get(k) else { return };
            walk_derived(child, rest, out);
        }
        DerivedSegment::Flatten => {
            let Value::Array(items) = value else { return };
            for item in items {
                walk_derived(item, rest, out);
            }
        }
    }
}

/// Computes `x-derived-from P` across the whole batch: for each document,
/// walks `P`, collecting every terminal value reached, in batch order.
pub fn derive_from(path: &str, batch: &[FrontmatterDocument]) -> Vec<Value> {
    let segments = parse_derived_path(path);
    let mut out = Vec::new();
    for doc in batch {
        let mut terminals = Vec::new();
        walk_derived(&doc.data, &segments, &mut terminals);
        out.extend(terminals.into_iter().cloned());
    }
    out
}

/// Same algorithm as [`derive_from`], but walks `P` against an
/// already-computed per-document value (e.g. the output of an
/// `x-jmespath-filter` pre-pass) instead of re-reading `doc.data`.
fn derive_from_values(path: &str, per_doc: &[Value]) -> Vec<Value> {
    let segments = parse_derived_path(path);
    let mut out = Vec::new();
    for value in per_doc {
        let mut terminals = Vec::new();
        walk_derived(value, &segments, &mut terminals);
        out.extend(terminals.into_iter().cloned());
    }
    out
}

/// Per-document flags for the source manifest: whether walking `P` against
/// that document reached at least one terminal.
fn derive_from_contributes(path: &str, batch: &[FrontmatterDocument]) -> Vec<bool> {
    let segments = parse_derived_path(path);
    batch
        .iter()
        .map(|doc| {
            let mut terminals = Vec::new();
            walk_derived(&doc.data, &segments, &mut terminals);
            !terminals.is_empty()
        })
        .collect()
}

/// Same as [`derive_from_contributes`], against already-filtered per-document
/// values.
fn derive_from_values_contributes(path: &str, per_doc: &[Value]) -> Vec<bool> {
    let segments = parse_derived_path(path);
    per_doc
        .iter()
        .map(|value| {
            let mut terminals = Vec::new();
            walk_derived(value, &segments, &mut terminals);
            !terminals.is_empty()
        })
        .collect()
}

/// Same algorithm as [`merge_arrays`], but takes each document's
/// contribution directly rather than looking it up by path.
fn merge_values(per_doc: &[Value], flatten: bool) -> Vec<Value> {
    let collected: Vec<Value> = per_doc.to_vec();
    if flatten {
        flatten_one_level(collected)
    } else {
        collected
            .into_iter()
            .map(|v| match v {
                Value::Array(_) => v,
                other => Value::Array(vec![other]),
            })
            .collect()
    }
}

/// `x-derived-unique`: stable first-occurrence deduplication by structural
/// equality (invariant I4). Applied after flattening per the fixed
/// precedence documented in DESIGN.md.
pub fn dedupe_stable(values: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for v in values {
        if !out.iter().any(|existing| existing.structural_eq(&v)) {
            out.push(v);
        }
    }
    out
}

/// `x-flatten-arrays`: splices array elements one level deep; non-array
/// elements pass through untouched (invariant I5).
pub fn flatten_one_level(values: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::new();
    for v in values {
        match v {
            Value::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    out
}

/// `x-merge-arrays`: collects each document's value at `path` in batch
/// order. With `flatten`, concatenates contents instead of nesting.
pub fn merge_arrays(path: &str, batch: &[FrontmatterDocument], flatten: bool) -> Vec<Value> {
    let mut collected = Vec::new();
    for doc in batch {
        let Some(value) = doc.data.at(path) else {
            continue;
        };
        collected.push(value.clone());
    }
    if flatten {
        flatten_one_level(collected)
    } else {
        collected
            .into_iter()
            .map(|v| match v {
                Value::Array(_) => v,
                other => Value::Array(vec![other]),
            })
            .collect()
    }
}

fn merge_flatten_flag(payload: &Value) -> bool {
    match payload {
        Value::Map(m) => matches!(m.get("flatten"), Some(Value::Bool(true))),
        Value::Bool(b) => *b,
        _ => false,
    }
}

/// Runs every aggregation-class directive at one site against the batch.
///
/// `x-jmespath-filter` runs first: each document's per-document value is
/// replaced by `evaluate(expr, document.data)`, evaluated against that
/// document's whole front matter rather than scoped to this node's own
/// path, and every directive that follows consumes that filtered value
/// instead of the document's raw data.
///
/// The returned source manifest lists only documents that actually
/// contributed a value at this site; a document missing the derived or
/// merged path, or whose filter result was empty, contributes nothing and
/// is left out.
pub fn aggregate_site(
    path: &str,
    directives: &[Directive],
    batch: &[FrontmatterDocument],
    evaluator: &JmesPathEvaluator,
    options: &PipelineOptions,
) -> Result<Option<(Vec<Value>, Vec<String>)>, FmxError> {
    let filter_expr = directives
        .iter()
        .find(|d| d.kind == DirectiveKind::JmesPathFilter);
    let derived_from = directives.iter().find(|d| d.kind == DirectiveKind::DerivedFrom);
    let merge = directives.iter().find(|d| d.kind == DirectiveKind::MergeArrays);
    let flatten = directives.iter().any(|d| d.kind == DirectiveKind::FlattenArrays);
    let unique = directives.iter().any(|d| d.kind == DirectiveKind::DerivedUnique);

    if derived_from.is_none() && merge.is_none() && filter_expr.is_none() {
        return Ok(None);
    }

    let filtered_per_doc: Option<Vec<Value>> = match filter_expr {
        Some(d) => {
            let expr = d
                .payload
                .as_str()
                .ok_or_else(|| FmxError::InvalidDirectivePayload {
                    path: path.to_string(),
                    directive: DirectiveKind::JmesPathFilter.keyword().into(),
                    reason: "expected a string expression".into(),
                })?;
            let compiled = evaluator.compile(expr)?;
            let out = if options.parallel && batch.len() > 1 {
                // `jmespath`'s compiled expression isn't `Send`, so each
                // worker recompiles its own copy locally rather than
                // sharing `compiled` across the pool; only the resulting
                // owned `Value`s cross back.
                build_pool(options.max_workers).install(|| {
                    batch
                        .par_iter()
                        .map(|doc| {
                            let worker = JmesPathEvaluator;
                            let local = worker.compile(expr)?;
                            worker.evaluate(&local, &doc.data)
                        })
                        .collect::<Result<Vec<Value>, FmxError>>()
                })?
            } else {
                let mut out = Vec::with_capacity(batch.len());
                for doc in batch {
                    out.push(evaluator.evaluate(&compiled, &doc.data)?);
                }
                out
            };
            Some(out)
        }
        None => None,
    };

    let (mut values, contributes): (Vec<Value>, Vec<bool>) = if let Some(d) = derived_from {
        let expr = d
            .payload
            .as_str()
            .ok_or_else(|| FmxError::InvalidDirectivePayload {
                path: path.to_string(),
                directive: DirectiveKind::DerivedFrom.keyword().into(),
                reason: "expected a string path".into(),
            })?;
        match &filtered_per_doc {
            Some(filtered) => (
                derive_from_values(expr, filtered),
                derive_from_values_contributes(expr, filtered),
            ),
            None => (
                derive_from(expr, batch),
                derive_from_contributes(expr, batch),
            ),
        }
    } else if let Some(d) = merge {
        let flatten_flag = merge_flatten_flag(&d.payload);
        match &filtered_per_doc {
            Some(filtered) => (
                merge_values(filtered, flatten_flag),
                filtered.iter().map(|v| !v.is_null()).collect(),
            ),
            None => (
                merge_arrays(path_without_root(path), batch, flatten_flag),
                batch
                    .iter()
                    .map(|doc| doc.data.at(path_without_root(path)).is_some())
                    .collect(),
            ),
        }
    } else {
        // A bare `x-jmespath-filter` with no derivation/merge on the node:
        // concatenate each document's filtered array, in batch order (S2).
        let filtered = filtered_per_doc.expect("filter_expr.is_some() was checked above");
        let contributes = filtered
            .iter()
            .map(|v| matches!(v, Value::Array(items) if !items.is_empty()))
            .collect();
        let mut out = Vec::new();
        for v in filtered {
            match v {
                Value::Array(items) => out.extend(items),
                Value::Null => {}
                other => return Err(FmxError::InvalidJMESPathResult {
                    expression: filter_expr.unwrap().payload.as_str().unwrap_or_default().to_string(),
                    got: format!("{other:?}"),
                }),
            }
        }
        (out, contributes)
    };

    let contributors: Vec<String> = batch
        .iter()
        .zip(contributes)
        .filter_map(|(doc, contributed)| contributed.then(|| doc.source_path.clone()))
        .collect();

    if flatten {
        values = flatten_one_level(values);
    }
    if unique {
        values = dedupe_stable(values);
    }

    let total_size: usize = values.iter().map(approx_size).sum();
    if total_size > options.memory_soft_limit_bytes {
        return Err(FmxError::MemoryBoundsViolation {
            path: path.to_string(),
            reason: format!(
                "aggregated buffer grew to ~{total_size} bytes, over the {}-byte soft limit",
                options.memory_soft_limit_bytes
            ),
        });
    }

    Ok(Some((values, contributors)))
}

/// Strips the walker's leading `$.` / `$` root marker, leaving a path
/// usable against a single document's front-matter data.
fn path_without_root(path: &str) -> &str {
    path.strip_prefix("$.").or_else(|| path.strip_prefix('$')).unwrap_or(path)
}

/// Builds a scoped worker pool sized to `max_workers`, falling back to
/// rayon's global pool sizing if construction fails (e.g. `max_workers` set
/// to something the platform rejects).
fn build_pool(max_workers: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .build()
        .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().expect("default rayon pool"))
}
