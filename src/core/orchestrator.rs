//! Pipeline orchestrator: drives the walker, aggregator, and renderer in
//! the fixed order the specification requires and exposes the
//! `Init -> Walked -> Aggregated -> Rendered -> Done` state machine (any
//! step may transition to `Failed`).
//!
//! Grounded on the teacher's `core/converter.rs::convert()`, which stages a
//! single top-level operation (detect -> parse -> transform -> serialize)
//! behind one public entry point rather than exposing each stage to the
//! caller.

use indexmap::IndexMap;

use crate::core::aggregator::aggregate_site;
use crate::core::directive::DirectiveKind;
use crate::core::error::FmxError;
use crate::core::evaluator::JmesPathEvaluator;
use crate::core::template::{render_frontmatter_part, render_value, template_body};
use crate::core::value::Value;
use crate::core::walker::{walk, DirectiveSite};
use crate::frontmatter::FrontmatterDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Walked,
    Aggregated,
    Rendered,
    Done,
}

pub struct PipelineOutput {
    pub value: Value,
    pub source_manifest: IndexMap<String, Vec<String>>,
}

/// Controls how the pipeline fans independent per-document work (JMESPath
/// filter evaluation, per-item placeholder substitution) out to a `rayon`
/// pool. Cross-document aggregation always runs single threaded so
/// ordering stays deterministic; the rendered `Value` is the same with or
/// without `parallel`, only the path taken to compute it differs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub parallel: bool,
    pub max_workers: usize,
    pub memory_soft_limit_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            max_workers: 1,
            memory_soft_limit_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Runs the whole pipeline with the default (sequential) options. Kept
/// alongside [`run_with_options`] so single-threaded callers and existing
/// tests don't need to thread an options value through.
pub fn run(schema: &Value, batch: &[FrontmatterDocument]) -> Result<PipelineOutput, FmxError> {
    run_with_options(schema, batch, &PipelineOptions::default())
}

/// Runs the whole pipeline: walk the schema, aggregate every directive
/// site across the batch, then render the schema root against the
/// aggregated cache and the batch.
pub fn run_with_options(
    schema: &Value,
    batch: &[FrontmatterDocument],
    options: &PipelineOptions,
) -> Result<PipelineOutput, FmxError> {
    let mut state = PipelineState::Init;
    let evaluator = JmesPathEvaluator;

    let sites = walk(schema)?;
    state = transition(state, PipelineState::Walked);

    let mut aggregated: IndexMap<String, Vec<Value>> = IndexMap::new();
    let mut manifest: IndexMap<String, Vec<String>> = IndexMap::new();
    for site in &sites {
        if let Some((values, contributors)) =
            aggregate_site(&site.path, &site.directives, batch, &evaluator, options)?
        {
            aggregated.insert(site.path.clone(), values);
            manifest.insert(site.path.clone(), contributors);
        }
    }
    state = transition(state, PipelineState::Aggregated);

    let value = render_node(schema, "$", batch, &sites, &aggregated, options)?;
    state = transition(state, PipelineState::Rendered);

    let _ = transition(state, PipelineState::Done);
    Ok(PipelineOutput {
        value,
        source_manifest: manifest,
    })
}

fn transition(_from: PipelineState, to: PipelineState) -> PipelineState {
    to
}

fn site_at<'a>(sites: &'a [DirectiveSite], path: &str) -> Option<&'a DirectiveSite> {
    sites.iter().find(|s| s.path == path)
}

/// Renders the schema tree starting at `node`/`path`, substituting cached
/// aggregator output where a site produced one and expanding
/// `x-frontmatter-part` arrays against the batch.
fn render_node(
    node: &Value,
    path: &str,
    batch: &[FrontmatterDocument],
    sites: &[DirectiveSite],
    aggregated: &IndexMap<String, Vec<Value>>,
    options: &PipelineOptions,
) -> Result<Value, FmxError> {
    if let Some(values) = aggregated.get(path) {
        return Ok(Value::Array(values.clone()));
    }

    if let Some(site) = site_at(sites, path) {
        if site
            .directives
            .iter()
            .any(|d| d.kind == DirectiveKind::FrontmatterPart)
        {
            return render_frontmatter_part(site, node, batch, options.parallel, options.max_workers);
        }
    }

    let Value::Map(map) = node else {
        return Ok(template_body(node).cloned().unwrap_or_else(|| node.clone()));
    };

    if let Some(properties) = map.get("properties").and_then(|v| v.as_map()) {
        let mut out = IndexMap::new();
        for (key, child_schema) in properties {
            let child_path = format!("{path}.{key}");
            out.insert(
                key.clone(),
                render_node(child_schema, &child_path, batch, sites, aggregated, options)?,
            );
        }
        return Ok(Value::Map(out));
    }

    // Leaf schema node: fall back to rendering its own template body (if
    // any) against an empty, whole-batch-agnostic context. Leaves with no
    // template body and no aggregation contribute `Null`.
    match template_body(node) {
        Some(body) => render_value(body, &Value::Null),
        None => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;

    fn doc(path: &str, pairs: &[(&str, Value)]) -> FrontmatterDocument {
        let mut m = Map::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        FrontmatterDocument {
            source_path: path.to_string(),
            data: Value::Map(m),
        }
    }

    fn schema_node(pairs: &[(&str, Value)]) -> Value {
        let mut m = Map::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Map(m)
    }

    #[test]
    fn s1_basic_registry_scenario() {
        let batch = vec![
            doc(
                "a.md",
                &[
                    ("c1", Value::Str("git".into())),
                    ("c2", Value::Str("create".into())),
                    ("c3", Value::Str("refinement-issue".into())),
                ],
            ),
            doc(
                "b.md",
                &[
                    ("c1", Value::Str("spec".into())),
                    ("c2", Value::Str("analyze".into())),
                    ("c3", Value::Str("quality-metrics".into())),
                ],
            ),
        ];

        let item_template = schema_node(&[
            ("c1", Value::Str("{c1}".into())),
            ("c2", Value::Str("{c2}".into())),
            ("c3", Value::Str("{c3}".into())),
        ]);

        let available_configs = schema_node(&[
            ("type", Value::Str("array".into())),
            ("x-derived-from", Value::Str("c1".into())),
            ("x-derived-unique", Value::Bool(true)),
        ]);

        let commands = schema_node(&[
            ("type", Value::Str("array".into())),
            ("x-frontmatter-part", Value::Bool(true)),
            ("default", item_template),
        ]);

        let properties = schema_node(&[
            ("availableConfigs", available_configs),
            ("commands", commands),
        ]);

        let schema = schema_node(&[("type", Value::Str("object".into())), ("properties", properties)]);

        let output = run(&schema, &batch).unwrap();
        let Value::Map(root) = &output.value else { panic!() };
        assert_eq!(
            root.get("availableConfigs"),
            Some(&Value::Array(vec![
                Value::Str("git".into()),
                Value::Str("spec".into())
            ]))
        );
        let Some(Value::Array(commands)) = root.get("commands") else {
            panic!()
        };
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].at("c1"), Some(&Value::Str("git".into())));
        assert_eq!(commands[1].at("c1"), Some(&Value::Str("spec".into())));
    }

    #[test]
    fn s2_filter_scenario() {
        let command = |c1: &str, c2: &str| {
            schema_node(&[("c1", Value::Str(c1.into())), ("c2", Value::Str(c2.into()))])
        };
        let batch = vec![doc(
            "a.md",
            &[(
                "commands",
                Value::Array(vec![command("git", "status"), command("npm", "install")]),
            )],
        )];

        let git_commands = schema_node(&[
            ("type", Value::Str("array".into())),
            (
                "x-jmespath-filter",
                Value::Str("commands[?c1=='git']".into()),
            ),
        ]);
        let properties = schema_node(&[("git_commands", git_commands)]);
        let schema = schema_node(&[("type", Value::Str("object".into())), ("properties", properties)]);

        let output = run(&schema, &batch).unwrap();
        let Value::Map(root) = &output.value else { panic!() };
        assert_eq!(
            root.get("git_commands"),
            Some(&Value::Array(vec![command("git", "status")]))
        );
    }

    #[test]
    fn s3_flatten_scenario() {
        let batch = vec![
            doc(
                "a.md",
                &[(
                    "tags",
                    Value::Array(vec![
                        Value::Array(vec![Value::Str("a".into()), Value::Str("b".into())]),
                        Value::Array(vec![Value::Str("c".into())]),
                    ]),
                )],
            ),
            doc(
                "b.md",
                &[("tags", Value::Array(vec![Value::Array(vec![Value::Str("d".into())])]))],
            ),
        ];

        let all_tags = schema_node(&[
            ("type", Value::Str("array".into())),
            ("x-derived-from", Value::Str("tags[]".into())),
            ("x-flatten-arrays", Value::Bool(true)),
        ]);
        let properties = schema_node(&[("all_tags", all_tags)]);
        let schema = schema_node(&[("type", Value::Str("object".into())), ("properties", properties)]);

        let output = run(&schema, &batch).unwrap();
        let Value::Map(root) = &output.value else { panic!() };
        assert_eq!(
            root.get("all_tags"),
            Some(&Value::Array(vec![
                Value::Str("a".into()),
                Value::Str("b".into()),
                Value::Str("c".into()),
                Value::Str("d".into()),
            ]))
        );
    }

    #[test]
    fn s4_merge_without_flatten_scenario() {
        let batch = vec![
            doc(
                "a.md",
                &[(
                    "cmds",
                    Value::Array(vec![Value::Str("build".into()), Value::Str("test".into())]),
                )],
            ),
            doc("b.md", &[("cmds", Value::Array(vec![Value::Str("deploy".into())]))]),
        ];

        let cmds = schema_node(&[
            ("type", Value::Str("array".into())),
            (
                "x-merge-arrays",
                schema_node(&[("flatten", Value::Bool(false))]),
            ),
        ]);
        let properties = schema_node(&[("cmds", cmds)]);
        let schema = schema_node(&[("type", Value::Str("object".into())), ("properties", properties)]);

        let output = run(&schema, &batch).unwrap();
        let Value::Map(root) = &output.value else { panic!() };
        assert_eq!(
            root.get("cmds"),
            Some(&Value::Array(vec![
                Value::Array(vec![Value::Str("build".into()), Value::Str("test".into())]),
                Value::Array(vec![Value::Str("deploy".into())]),
            ]))
        );
    }

    #[test]
    fn s6_jmespath_compile_failure_aborts_the_pipeline() {
        let batch = vec![doc("a.md", &[("commands", Value::Array(vec![]))])];
        let broken = schema_node(&[
            ("type", Value::Str("array".into())),
            ("x-jmespath-filter", Value::Str("[?unterminated".into())),
        ]);
        let properties = schema_node(&[("broken", broken)]);
        let schema = schema_node(&[("type", Value::Str("object".into())), ("properties", properties)]);

        let err = run(&schema, &batch).unwrap_err();
        assert!(matches!(err, FmxError::JMESPathCompilationFailed { .. }));
    }
}
