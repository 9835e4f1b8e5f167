//! JMESPath evaluator interface.
//!
//! The rest of the pipeline never names the `jmespath` crate directly; it
//! goes through this trait, the same way the teacher isolates JSONPath
//! behind `core::query`. `compile` and `evaluate` are deliberately split so
//! the walker can detect a bad expression once, ahead of the per-document
//! aggregation loop.

use crate::core::error::FmxError;
use crate::core::value::{from_json, to_json, Value};

pub trait Evaluator {
    type Compiled;

    fn compile(&self, expression: &str) -> Result<Self::Compiled, FmxError>;
    fn evaluate(&self, compiled: &Self::Compiled, input: &Value) -> Result<Value, FmxError>;
}

/// `jmespath`-backed evaluator. Compiled expressions borrow nothing from the
/// evaluator itself, so they can be cached per directive site and shared
/// across documents without recompiling.
#[derive(Default)]
pub struct JmesPathEvaluator;

pub struct CompiledExpression {
    expression: String,
    inner: jmespath::Expression<'static>,
}

impl Evaluator for JmesPathEvaluator {
    type Compiled = CompiledExpression;

    fn compile(&self, expression: &str) -> Result<Self::Compiled, FmxError> {
        let inner = jmespath::compile(expression).map_err(|e| FmxError::JMESPathCompilationFailed {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;
        Ok(CompiledExpression {
            expression: expression.to_string(),
            inner,
        })
    }

    fn evaluate(&self, compiled: &Self::Compiled, input: &Value) -> Result<Value, FmxError> {
        if input.is_null() {
            return Ok(Value::Null);
        }
        let json = to_json(input);
        let var = jmespath::Variable::from_json(&json.to_string()).map_err(|e| {
            FmxError::JMESPathExecutionFailed {
                expression: compiled.expression.clone(),
                message: e.to_string(),
            }
        })?;
        let result = compiled
            .inner
            .search(var)
            .map_err(|e| FmxError::JMESPathExecutionFailed {
                expression: compiled.expression.clone(),
                message: e.to_string(),
            })?;
        let json_value =
            serde_json::to_value(&*result).map_err(|e| FmxError::JMESPathExecutionFailed {
                expression: compiled.expression.clone(),
                message: e.to_string(),
            })?;
        Ok(from_json(json_value))
    }
}
