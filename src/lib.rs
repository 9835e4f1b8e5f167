//! fmx - schema-directed transformation of Markdown front matter into
//! aggregated JSON/YAML/TOML artifacts.
//!
//! `core` is the transformation core proper (value model, directive
//! registry, walker, aggregator, template renderer, output formatter); the
//! remaining top-level modules are the upstream collaborators the core
//! trusts to have already run: front-matter extraction, schema `$ref`
//! resolution, and standard JSON Schema validation.

pub mod cli;
pub mod core;
pub mod frontmatter;
pub mod schema_ref;
pub mod validate;
