//! fmx - schema-directed transformation CLI entry point.

use anyhow::Result;
use clap::Parser;

use fmx::cli::args::{Cli, Commands};
use fmx::cli::commands::{build, check, completions};
use fmx::cli::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logging::init(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Build(args) => build::execute(args, cli.quiet),
        Commands::Check(args) => check::execute(args, cli.quiet),
        Commands::Completions(args) => completions::execute(args),
    };

    if let Err(err) = result {
        if cli.verbose > 0 {
            eprintln!("{}", serde_json::json!({ "error": err.to_string() }));
        } else {
            eprintln!("error: {err}");
        }
        std::process::exit(exit_code(&err));
    }

    Ok(())
}

/// `1` for user error (bad args, bad schema, I/O), `2` for a pipeline
/// failure (directive or evaluator error), matching the CLI surface pinned
/// by the specification's §6. `.context()` wraps the root cause, so the
/// chain is walked rather than downcasting the top-level error directly.
/// The ambient variants this binary adds on top of the core's closed
/// taxonomy (schema/front-matter parsing, missing input, upstream
/// validation) are user errors; every core `FmxError` variant is a
/// pipeline failure.
fn exit_code(err: &anyhow::Error) -> i32 {
    use fmx::core::error::FmxError;

    let core_error = err.chain().find_map(|cause| cause.downcast_ref::<FmxError>());
    match core_error {
        Some(FmxError::InputNotFound { .. })
        | Some(FmxError::SchemaParseFailed { .. })
        | Some(FmxError::FrontmatterParseFailed { .. })
        | Some(FmxError::SchemaValidationFailed { .. })
        | Some(FmxError::RefCycle { .. }) => 1,
        Some(_) => 2,
        None => 1,
    }
}
