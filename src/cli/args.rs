//! CLI argument definitions using clap.
//!
//! Collapsed from the teacher's 16-subcommand Swiss-army-knife surface
//! (`cli/args.rs` in `dtx`) down to the single pipeline this specification
//! describes: `build` runs it end to end, `check` runs it in dry-run mode,
//! and `completions` is kept nearly verbatim.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// fmx - schema-directed transformation of Markdown front matter
#[derive(Parser, Debug)]
#[command(name = "fmx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all but warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and write the aggregated artifact
    Build(BuildArgs),

    /// Run the pipeline without writing output, reporting any errors
    Check(CheckArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

/// Arguments shared by `build` and `check`.
#[derive(Parser, Debug)]
pub struct PipelineArgs {
    /// JSON or YAML Schema file carrying the `x-*` transformation directives
    pub schema_path: PathBuf,

    /// Glob pattern(s) selecting the Markdown input files
    #[arg(required = true, num_args = 1..)]
    pub input_pattern: Vec<String>,

    /// Run independent per-document operations (filter, substitution) on a
    /// worker pool instead of sequentially
    #[arg(short, long)]
    pub parallel: bool,

    /// Worker pool size when --parallel is set
    #[arg(long, default_value_t = 4)]
    pub max_workers: usize,

    /// Output indentation width (JSON/YAML)
    #[arg(long, default_value_t = 2)]
    pub indent: usize,
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output artifact path; extension (.json/.yml/.yaml/.toml) selects the format
    pub output_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
