// Built-in function implementations for the condition-query language
//
// The language exposes exactly three built-ins: `includes` on strings and
// sequences, the `Boolean` truthiness cast, and `Object.values` over the
// parameter aggregate. Anything else is rejected by the evaluator.

use serde_json::Value;
use thiserror::Error;

/// Function errors
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Argument error: {0}")]
    ArgumentError(String),

    #[error("Type error: {0}")]
    TypeError(String),
}

/// Truthiness: null, false, 0, "", and [] are falsy; everything else truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(_) => true,
    }
}

/// Equality with numeric tolerance: integer and float encodings of the
/// same number compare equal, everything else compares structurally.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

/// `X.includes(Y)` - substring test for strings, membership test for sequences
pub fn includes(target: &Value, needle: &Value) -> Result<Value, FunctionError> {
    match target {
        Value::String(s) => {
            let needle_text = match needle {
                Value::String(n) => n.clone(),
                other => other.to_string(),
            };
            Ok(Value::Bool(s.contains(&needle_text)))
        }
        Value::Array(arr) => Ok(Value::Bool(arr.iter().any(|v| values_equal(v, needle)))),
        other => Err(FunctionError::TypeError(format!(
            "includes is not supported on {}",
            type_name(other)
        ))),
    }
}

/// `Boolean(X)` - truthiness coercion
pub fn boolean(args: &[Value]) -> Result<Value, FunctionError> {
    match args {
        [value] => Ok(Value::Bool(is_truthy(value))),
        _ => Err(FunctionError::ArgumentError(format!(
            "Boolean expects 1 argument, got {}",
            args.len()
        ))),
    }
}

/// `Object.values(X)` - the values of a mapping as a sequence
pub fn object_values(value: &Value) -> Result<Value, FunctionError> {
    match value {
        Value::Object(map) => Ok(Value::Array(map.values().cloned().collect())),
        other => Err(FunctionError::TypeError(format!(
            "Object.values expects an object, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
