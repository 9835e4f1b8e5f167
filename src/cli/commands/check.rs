//! `fmx check`: runs the pipeline in dry-run mode, validating and reporting
//! without writing an output artifact.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::args::CheckArgs;
use crate::cli::commands::build::{pipeline_options, prepare};
use crate::core::orchestrator;
use crate::validate;

pub fn execute(args: CheckArgs, quiet: bool) -> Result<()> {
    let (batch, schema, schema_json) = prepare(&args.pipeline)?;

    validate::validate_batch(&schema_json, &batch).context("schema validation failed")?;

    let options = pipeline_options(&args.pipeline);
    let output = orchestrator::run_with_options(&schema, &batch, &options).context("pipeline failed")?;

    if !quiet {
        eprintln!(
            "{} {} document(s), {} derived/aggregated field(s)",
            "OK:".green(),
            batch.len(),
            output.source_manifest.len()
        );
    }

    Ok(())
}
