//! The closed error taxonomy the transformation core reports.
//!
//! Every fallible operation in `core::*` returns `Result<_, FmxError>`. The
//! CLI layer wraps these in `anyhow::Error` at the boundary (matching the
//! teacher's `anyhow`-based command layer) but the core itself never loses
//! the structured variant, since `--verbose` serializes it as JSON.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum FmxError {
    // Directive errors
    #[error("directive conflict at {path}: {reason}")]
    DirectiveConflict { path: String, reason: String },
    #[error("directive {directive} is not applicable at {path}")]
    DirectiveNotApplicable { path: String, directive: String },
    #[error("directive {directive} at {path} depends on {missing}, which is absent")]
    DirectiveDependencyMissing {
        path: String,
        directive: String,
        missing: String,
    },
    #[error("invalid payload for directive {directive} at {path}: {reason}")]
    InvalidDirectivePayload {
        path: String,
        directive: String,
        reason: String,
    },

    // Evaluator errors
    #[error("failed to compile JMESPath expression `{expression}`: {message}")]
    JMESPathCompilationFailed { expression: String, message: String },
    #[error("failed to evaluate JMESPath expression `{expression}`: {message}")]
    JMESPathExecutionFailed { expression: String, message: String },
    #[error("JMESPath expression `{expression}` produced an unexpected result: {got}")]
    InvalidJMESPathResult { expression: String, got: String },

    // Data / path errors
    #[error("path not found: {path}")]
    PathNotFound { path: String },
    #[error("path out of range: {path}")]
    PathOutOfRange { path: String },
    #[error("type mismatch at {path}: expected {expected}, got {got}")]
    TypeMismatch {
        path: String,
        expected: String,
        got: String,
    },

    // Template errors
    #[error("variable not found: {path}")]
    VariableNotFound { path: String },
    #[error("invalid template at {path}: {reason}")]
    InvalidTemplateFormat { path: String, reason: String },

    // Output errors
    #[error("cannot represent non-finite float at {path}")]
    UnsupportedFloat { path: String },
    #[error("output format does not support this shape: {reason}")]
    UnsupportedFormat { reason: String },

    // Resource errors
    #[error("memory bounds exceeded while aggregating {path}: {reason}")]
    MemoryBoundsViolation { path: String, reason: String },

    // Ambient: schema validation (section 6A)
    #[error("{source_path} failed schema validation: {errors:?}")]
    SchemaValidationFailed {
        source_path: String,
        errors: Vec<String>,
    },

    // Ambient: upstream I/O / config errors
    #[error("no input matched pattern: {pattern}")]
    InputNotFound { pattern: String },
    #[error("failed to parse schema {path}: {message}")]
    SchemaParseFailed { path: String, message: String },
    #[error("failed to parse front matter in {path}: {message}")]
    FrontmatterParseFailed { path: String, message: String },
    #[error("cyclic $ref detected at {pointer}")]
    RefCycle { pointer: String },
}

pub type Result<T> = std::result::Result<T, FmxError>;
