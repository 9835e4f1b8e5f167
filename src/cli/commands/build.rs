//! `fmx build` implementation: glob inputs -> extract front matter ->
//! resolve schema -> validate -> run the core -> format -> write.
//!
//! Grounded on the teacher's `cli/commands/convert.rs::execute`, which
//! follows the same read -> transform -> write shape with the same
//! quiet/colored messaging conventions.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::cli::args::{BuildArgs, PipelineArgs};
use crate::core::orchestrator::{self, PipelineOptions};
use crate::core::output::{self, FormatOptions, OutputFormat};
use crate::frontmatter;
use crate::schema_ref;
use crate::validate;

pub fn execute(args: BuildArgs, quiet: bool) -> Result<()> {
    let (batch, schema, schema_json) = prepare(&args.pipeline)?;

    validate::validate_batch(&schema_json, &batch).context("schema validation failed")?;

    let options = pipeline_options(&args.pipeline);
    let output = orchestrator::run_with_options(&schema, &batch, &options).context("pipeline failed")?;

    let ext = args
        .output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let format = OutputFormat::from_extension(ext)
        .with_context(|| format!("unrecognized output extension: .{ext}"))?;

    let rendered = output::format(
        &output.value,
        format,
        FormatOptions {
            indent: args.pipeline.indent,
        },
    )?;

    fs::write(&args.output_path, &rendered)
        .with_context(|| format!("failed to write {}", args.output_path.display()))?;

    if !quiet {
        eprintln!(
            "{} {} document(s) -> {}",
            "Built:".green(),
            batch.len(),
            args.output_path.display().to_string().cyan()
        );
    }

    Ok(())
}

/// Shared by `build` and `check`: turns the CLI's `--parallel`/
/// `--max-workers` flags into the core's `PipelineOptions`.
pub fn pipeline_options(args: &PipelineArgs) -> PipelineOptions {
    PipelineOptions {
        parallel: args.parallel,
        max_workers: args.max_workers,
        ..PipelineOptions::default()
    }
}

/// Shared by `build` and `check`: expands input globs, extracts front
/// matter, and eagerly resolves the schema's `$ref`s.
pub fn prepare(
    args: &PipelineArgs,
) -> Result<(
    Vec<frontmatter::FrontmatterDocument>,
    crate::core::value::Value,
    serde_json::Value,
)> {
    let schema_content = fs::read_to_string(&args.schema_path)
        .with_context(|| format!("failed to read schema {}", args.schema_path.display()))?;
    let schema_json: serde_json::Value = parse_schema(&args.schema_path, &schema_content)?;
    let schema_value = crate::core::value::from_json(schema_json.clone());
    let resolved_schema = schema_ref::resolve(&schema_value)?;
    let resolved_json = crate::core::value::to_json(&resolved_schema);

    let mut paths: Vec<String> = Vec::new();
    for pattern in &args.input_pattern {
        let mut matched = false;
        for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
            let path = entry.with_context(|| format!("failed to read glob entry for {pattern}"))?;
            paths.push(path.to_string_lossy().into_owned());
            matched = true;
        }
        if !matched {
            bail!("no input matched pattern: {pattern}");
        }
    }
    paths.sort();

    let mut loaded = Vec::with_capacity(paths.len());
    for path in &paths {
        let content = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        loaded.push((path.clone(), content));
    }
    let batch = frontmatter::load_batch(&loaded)?;

    Ok((batch, resolved_schema, resolved_json))
}

fn parse_schema(path: &Path, content: &str) -> Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext == "yaml" || ext == "yml" {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(content).with_context(|| format!("failed to parse schema {}", path.display()))?;
        Ok(serde_json::to_value(yaml)?)
    } else {
        serde_json::from_str(content).with_context(|| format!("failed to parse schema {}", path.display()))
    }
}
