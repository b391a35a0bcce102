// Expression evaluator for the condition-query language
//
// Expressions are evaluated against a read-only scope derived from the
// ParameterMap: each parameter is bound under its sanitized name, and the
// whole map is bound under the `parameters` aggregate so expressions like
// `!parameters.Color` or `Object.values(parameters).includes('"row"')`
// can enumerate current values.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::functions::{self, is_truthy, values_equal};
use crate::params::{sanitize_name, validate_parameters, ParamError, ParameterMap};
use crate::parser::{self, ParserError};

/// The fixed identifier the whole ParameterMap is bound under.
pub const AGGREGATE_NAME: &str = "parameters";

/// The namespace carrying the `values` built-in.
const OBJECT_NAMESPACE: &str = "Object";

/// Evaluator errors
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Function(#[from] functions::FunctionError),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Type error: {0}")]
    TypeError(String),
}

/// The identifier bindings one ParameterMap induces.
pub struct Scope {
    bindings: HashMap<String, Value>,
}

impl Scope {
    /// Build the scope for a ParameterMap. Rejects maps in which two
    /// distinct parameter names sanitize to the same identifier.
    pub fn build(params: &ParameterMap) -> Result<Self, ParamError> {
        validate_parameters(params)?;

        let mut bindings = HashMap::new();
        let mut aggregate = serde_json::Map::new();
        for (name, value) in params {
            aggregate.insert(name.clone(), value.to_json());
            let identifier = sanitize_name(name);
            if !identifier.is_empty() {
                bindings.insert(identifier, value.to_json());
            }
        }
        // the aggregate wins over any parameter that happens to share its name
        bindings.insert(AGGREGATE_NAME.to_string(), Value::Object(aggregate));

        Ok(Scope { bindings })
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

/// Evaluate a parsed expression against a scope.
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, EvaluatorError> {
    match expr {
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Number(n) => Ok(Value::from(*n)),
        Expr::Boolean(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),

        Expr::Identifier(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvaluatorError::UnknownIdentifier(name.clone())),

        Expr::Member { target, name } => {
            let target = evaluate(target, scope)?;
            match target {
                // a missing member reads as null, so `!parameters.Missing`
                // is true rather than an error
                Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
                other => Err(EvaluatorError::TypeError(format!(
                    "cannot read property {:?} of {}",
                    name, other
                ))),
            }
        }

        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => {
            let value = evaluate(operand, scope)?;
            Ok(Value::Bool(!is_truthy(&value)))
        }

        Expr::Binary { op, lhs, rhs } => evaluate_binary(*op, lhs, rhs, scope),

        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            let condition = evaluate(condition, scope)?;
            if is_truthy(&condition) {
                evaluate(then_branch, scope)
            } else {
                match else_branch {
                    Some(branch) => evaluate(branch, scope),
                    None => Ok(Value::Null),
                }
            }
        }

        Expr::Method { target, name, args } => {
            // Object.values(x) is a namespace call, not a member read
            if name == "values" {
                if let Expr::Identifier(ns) = target.as_ref() {
                    if ns == OBJECT_NAMESPACE {
                        let [arg] = args.as_slice() else {
                            return Err(EvaluatorError::TypeError(format!(
                                "Object.values expects 1 argument, got {}",
                                args.len()
                            )));
                        };
                        let value = evaluate(arg, scope)?;
                        return Ok(functions::object_values(&value)?);
                    }
                }
            }

            match name.as_str() {
                "includes" => {
                    let target = evaluate(target, scope)?;
                    let [arg] = args.as_slice() else {
                        return Err(EvaluatorError::TypeError(format!(
                            "includes expects 1 argument, got {}",
                            args.len()
                        )));
                    };
                    let needle = evaluate(arg, scope)?;
                    Ok(functions::includes(&target, &needle)?)
                }
                other => Err(EvaluatorError::UnknownMethod(other.to_string())),
            }
        }

        Expr::Function { name, args } => match name.as_str() {
            "Boolean" => {
                let args = args
                    .iter()
                    .map(|arg| evaluate(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(functions::boolean(&args)?)
            }
            other => Err(EvaluatorError::UnknownFunction(other.to_string())),
        },
    }
}

fn evaluate_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    scope: &Scope,
) -> Result<Value, EvaluatorError> {
    match op {
        // logical operators short-circuit and yield the deciding operand
        BinaryOp::And => {
            let lhs = evaluate(lhs, scope)?;
            if !is_truthy(&lhs) {
                Ok(lhs)
            } else {
                evaluate(rhs, scope)
            }
        }
        BinaryOp::Or => {
            let lhs = evaluate(lhs, scope)?;
            if is_truthy(&lhs) {
                Ok(lhs)
            } else {
                evaluate(rhs, scope)
            }
        }
        BinaryOp::Equal => {
            let lhs = evaluate(lhs, scope)?;
            let rhs = evaluate(rhs, scope)?;
            Ok(Value::Bool(values_equal(&lhs, &rhs)))
        }
        BinaryOp::NotEqual => {
            let lhs = evaluate(lhs, scope)?;
            let rhs = evaluate(rhs, scope)?;
            Ok(Value::Bool(!values_equal(&lhs, &rhs)))
        }
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => {
            let lhs = evaluate(lhs, scope)?;
            let rhs = evaluate(rhs, scope)?;
            let ordering = compare_values(&lhs, &rhs)?;
            let result = match op {
                BinaryOp::LessThan => ordering == Ordering::Less,
                BinaryOp::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOp::GreaterThan => ordering == Ordering::Greater,
                BinaryOp::GreaterThanOrEqual => ordering != Ordering::Less,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
    }
}

fn compare_values(lhs: &Value, rhs: &Value) -> Result<Ordering, EvaluatorError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .ok_or_else(|| EvaluatorError::TypeError("numbers are not comparable".to_string())),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        // a numeric string compares numerically against a number
        (Value::String(s), Value::Number(n)) => {
            let parsed = parse_numeric(s)?;
            let rhs = n.as_f64().ok_or_else(not_comparable)?;
            parsed.partial_cmp(&rhs).ok_or_else(not_comparable)
        }
        (Value::Number(n), Value::String(s)) => {
            let lhs = n.as_f64().ok_or_else(not_comparable)?;
            let parsed = parse_numeric(s)?;
            lhs.partial_cmp(&parsed).ok_or_else(not_comparable)
        }
        (lhs, rhs) => Err(EvaluatorError::TypeError(format!(
            "cannot compare {} with {}",
            lhs, rhs
        ))),
    }
}

fn parse_numeric(s: &str) -> Result<f64, EvaluatorError> {
    s.parse::<f64>()
        .map_err(|_| EvaluatorError::TypeError(format!("{:?} is not a number", s)))
}

fn not_comparable() -> EvaluatorError {
    EvaluatorError::TypeError("values are not comparable".to_string())
}

/// Parse and evaluate an expression in one shot. This is the strict entry
/// point; resolution uses [`Evaluator`] for the tolerant failure policy.
pub fn evaluate_expression(
    expression: &str,
    params: &ParameterMap,
) -> Result<Value, EvaluatorError> {
    let scope = Scope::build(params)?;
    let ast = parser::parse(expression)?;
    evaluate(&ast, &scope)
}

/// Tolerant evaluator bound to one ParameterMap and diagnostics sink.
///
/// Builds the scope once and absorbs every expression failure per the
/// engine's failure policy: report, then degrade (predicates to `false`).
pub struct Evaluator<'a> {
    params: &'a ParameterMap,
    sink: &'a dyn DiagnosticSink,
    scope: Result<Scope, ParamError>,
}

impl<'a> Evaluator<'a> {
    pub fn new(params: &'a ParameterMap, sink: &'a dyn DiagnosticSink) -> Self {
        let scope = Scope::build(params);
        if let Err(err) = &scope {
            sink.report(&Diagnostic::new(
                DiagnosticKind::IdentifierCollision,
                err.to_string(),
                "",
                params,
            ));
        }
        Evaluator {
            params,
            sink,
            scope,
        }
    }

    /// Evaluate an expression, propagating failures to the caller.
    pub fn evaluate(&self, expression: &str) -> Result<Value, EvaluatorError> {
        match &self.scope {
            Ok(scope) => {
                let ast = parser::parse(expression)?;
                evaluate(&ast, scope)
            }
            Err(err) => Err(err.clone().into()),
        }
    }

    /// Evaluate an expression as a conditional predicate. Failures are
    /// reported and read as `false`; a malformed conditional must not
    /// abort resolution of the rest of the document.
    pub fn predicate(&self, expression: &str) -> bool {
        match self.evaluate(expression) {
            Ok(value) => is_truthy(&value),
            Err(err) => {
                self.sink.report(&Diagnostic::new(
                    DiagnosticKind::ExpressionFailure,
                    err.to_string(),
                    expression,
                    self.params,
                ));
                false
            }
        }
    }
}
