// ivy-lang - template evaluation engine for parameterized chart specifications
// Copyright (c) 2026 ivy-lang contributors
// Licensed under the MIT License

//! # ivy-lang
//!
//! Template evaluation engine for parameterized chart specifications.
//!
//! A template is ordinary JSON text extended two ways: bracketed
//! `[name]` placeholders inside strings and keys, and conditional nodes
//! (`$if`/`$cond`) that select between two sub-trees based on a query
//! over the current parameter values. Evaluating a template against a
//! [`ParameterMap`] produces a concrete, fully-resolved
//! [`serde_json::Value`] ready for a chart renderer.
//!
//! The pipeline runs in three stages:
//!
//! - `substitute` - text-level placeholder substitution with
//!   quote-aware coercion, applied before any JSON parsing
//! - parse - standard JSON parsing of the substituted text
//! - `resolve` - recursive conditional resolution and dynamic-key
//!   computation, backed by a sandboxed expression evaluator
//!   (`parser` + `evaluator`; no host scripting engine is involved)
//!
//! Every recoverable failure is reported through an injectable
//! [`DiagnosticSink`] and degraded locally: parse failures yield an
//! empty object, expression failures read as `false`, key failures
//! fall back to the raw key text. Nothing in the engine panics on bad
//! template input.
//!
//! ## Example
//!
//! ```
//! use ivy_lang::{evaluate_program, ParamValue, ParameterMap};
//! use serde_json::json;
//!
//! let template = r#"{
//!     "mark": "bar",
//!     "encoding": {
//!         "y": {
//!             "field": "[xDim]",
//!             "sort": {"$if": "parameters.sort.includes('true')", "true": "-x"}
//!         }
//!     }
//! }"#;
//!
//! let mut params = ParameterMap::new();
//! params.insert("xDim".to_string(), ParamValue::from("\"Origin\""));
//! params.insert("sort".to_string(), ParamValue::from("false"));
//!
//! let resolved = evaluate_program(template, &params);
//! assert_eq!(resolved, json!({
//!     "mark": "bar",
//!     "encoding": {"y": {"field": "Origin"}}
//! }));
//! ```

use serde_json::Value;

pub mod ast;
pub mod diagnostics;
pub mod evaluator;
pub mod functions;
pub mod params;
pub mod parser;
pub mod resolve;
pub mod substitute;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, MemorySink, TracingSink};
pub use evaluator::{evaluate_expression, Evaluator, EvaluatorError};
pub use params::{validate_parameters, ParamError, ParamValue, ParameterMap};
pub use resolve::{apply_conditionals, Conditional, QueryResult, WidgetCondition};
pub use substitute::set_template_values;

/// Evaluate a template against the current parameter values, reporting
/// failures through the default `tracing` sink.
pub fn evaluate_program(template: &str, params: &ParameterMap) -> Value {
    evaluate_program_with(template, params, &TracingSink)
}

/// Evaluate a template against the current parameter values.
///
/// Sequence: placeholder substitution, JSON parse, conditional
/// resolution. If the substituted text fails to parse, the failure is
/// reported (with the offending text) and the program degrades to an
/// empty object, so callers always receive some Json value back.
pub fn evaluate_program_with(
    template: &str,
    params: &ParameterMap,
    sink: &dyn DiagnosticSink,
) -> Value {
    let substituted = set_template_values(template, params);

    let parsed = match serde_json::from_str::<Value>(&substituted) {
        Ok(value) => value,
        Err(err) => {
            sink.report(&Diagnostic::new(
                DiagnosticKind::ParseFailure,
                err.to_string(),
                substituted,
                params,
            ));
            return Value::Object(serde_json::Map::new());
        }
    };

    apply_conditionals(&parsed, params, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_facade_runs_full_pipeline() {
        let mut params = ParameterMap::new();
        params.insert("Color".to_string(), ParamValue::from("\"steelblue\""));

        let template = r#"{"mark": {"color": "[Color]"}}"#;
        assert_eq!(
            evaluate_program(template, &params),
            json!({"mark": {"color": "steelblue"}})
        );
    }

    #[test]
    fn test_facade_degrades_to_empty_object_on_parse_failure() {
        let params = ParameterMap::new();
        let sink = MemorySink::new();

        let resolved = evaluate_program_with("{not json", &params, &sink);
        assert_eq!(resolved, json!({}));

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, DiagnosticKind::ParseFailure);
        assert_eq!(reports[0].source, "{not json");
    }
}
