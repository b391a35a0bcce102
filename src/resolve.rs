// Conditional resolution walker
//
// Walks the parsed template tree, replaces `$cond`/`$if` nodes with the
// branch their query selects, and computes dynamic `[...]` object keys.
// The walk is total: every Json value has a result for every ParameterMap,
// and expression failures degrade per the evaluator's failure policy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::evaluator::Evaluator;
use crate::params::ParameterMap;

/// The internal form of a conditional node. Both surface syntaxes feed
/// this one representation:
///
/// - old: `{"$cond": {"query": Q, "true": T, "false": F}}`
/// - new: `{"$if": Q, "true": T, "false": F}`
///
/// Either branch may be absent, and absence is meaningful: a selected but
/// missing branch removes the node from its container entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub query: String,
    pub true_branch: Option<Value>,
    pub false_branch: Option<Value>,
}

impl Conditional {
    /// Recognize a conditional node. Returns `None` for anything that is
    /// not an object carrying a well-formed `$cond` or `$if` key; such
    /// values are walked as plain objects.
    pub fn from_value(value: &Value) -> Option<Conditional> {
        let obj = value.as_object()?;
        if let Some(args) = obj.get("$cond") {
            let args = args.as_object()?;
            let query = args.get("query")?.as_str()?;
            Some(Conditional {
                query: query.to_string(),
                true_branch: args.get("true").cloned(),
                false_branch: args.get("false").cloned(),
            })
        } else if let Some(query) = obj.get("$if") {
            let query = query.as_str()?;
            Some(Conditional {
                query: query.to_string(),
                true_branch: obj.get("true").cloned(),
                false_branch: obj.get("false").cloned(),
            })
        } else {
            None
        }
    }

    fn branch(&self, selected: bool) -> Option<&Value> {
        if selected {
            self.true_branch.as_ref()
        } else {
            self.false_branch.as_ref()
        }
    }
}

/// Resolve every conditional node and dynamic key in `spec` against
/// `params`, producing a conditional-free Json value.
pub fn apply_conditionals(
    spec: &Value,
    params: &ParameterMap,
    sink: &dyn DiagnosticSink,
) -> Value {
    let resolver = Resolver {
        evaluator: Evaluator::new(params, sink),
        params,
        sink,
    };
    resolver.resolve(spec)
}

struct Resolver<'a> {
    evaluator: Evaluator<'a>,
    params: &'a ParameterMap,
    sink: &'a dyn DiagnosticSink,
}

impl Resolver<'_> {
    fn resolve(&self, spec: &Value) -> Value {
        match spec {
            Value::Array(items) => {
                let mut out = Vec::new();
                for item in items {
                    if let Some(conditional) = Conditional::from_value(item) {
                        match self.select(&conditional) {
                            // a branch that resolves to an array is spliced
                            // in flat, matching filter-or-replace semantics
                            Some(Value::Array(resolved)) => out.extend(resolved),
                            Some(resolved) => out.push(resolved),
                            // absent branch drops the element
                            None => {}
                        }
                    } else {
                        out.push(self.resolve(item));
                    }
                }
                Value::Array(out)
            }

            Value::Object(map) => {
                if let Some(conditional) = Conditional::from_value(spec) {
                    return self.select(&conditional).unwrap_or(Value::Null);
                }

                let mut out = serde_json::Map::new();
                for (key, value) in map {
                    let effective_key = self.compute_key(key);
                    if let Some(conditional) = Conditional::from_value(value) {
                        // absent branch omits the property altogether
                        if let Some(resolved) = self.select(&conditional) {
                            out.insert(effective_key, resolved);
                        }
                    } else {
                        out.insert(effective_key, self.resolve(value));
                    }
                }
                Value::Object(out)
            }

            scalar => scalar.clone(),
        }
    }

    /// Evaluate the query and resolve the selected branch, if present.
    /// A selected branch may itself contain further conditionals.
    fn select(&self, conditional: &Conditional) -> Option<Value> {
        let selected = self.evaluator.predicate(&conditional.query);
        conditional.branch(selected).map(|branch| self.resolve(branch))
    }

    /// Compute the effective key for an object property. Keys wrapped in
    /// brackets are evaluated as expressions; failures fall back to the
    /// bracket-stripped text so the output always has some string key.
    fn compute_key(&self, key: &str) -> String {
        if key.len() < 2 || !key.starts_with('[') || !key.ends_with(']') {
            return key.to_string();
        }
        let inner = &key[1..key.len() - 1];
        match self.evaluator.evaluate(inner) {
            Ok(value) => stringify_key(&value),
            Err(err) => {
                self.sink.report(&Diagnostic::new(
                    DiagnosticKind::KeyFailure,
                    err.to_string(),
                    key,
                    self.params,
                ));
                inner.to_string()
            }
        }
    }
}

fn stringify_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// What to do with a widget when its condition query fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryResult {
    #[serde(rename = "show")]
    Show,
    #[serde(rename = "hide")]
    Hide,
}

/// A widget visibility condition, driven by the same query language as
/// conditional nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetCondition {
    pub query: String,
    #[serde(rename = "queryResult")]
    pub result: QueryResult,
}

impl WidgetCondition {
    /// Whether the widget should be visible for the current parameters.
    /// Query failures read as `false`, so a broken condition shows a
    /// `hide` widget and hides a `show` widget.
    pub fn should_show(&self, params: &ParameterMap, sink: &dyn DiagnosticSink) -> bool {
        let fired = Evaluator::new(params, sink).predicate(&self.query);
        match self.result {
            QueryResult::Show => fired,
            QueryResult::Hide => !fired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::params::ParamValue;
    use serde_json::json;

    fn params(entries: &[(&str, &str)]) -> ParameterMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
            .collect()
    }

    fn resolve(spec: &Value, params: &ParameterMap) -> Value {
        let sink = MemorySink::new();
        apply_conditionals(spec, params, &sink)
    }

    #[test]
    fn test_true_branch_selected() {
        let code = json!({"$if": "!parameters.Color", "true": "[Single Color]", "false": null});
        let params = params(&[("Color", "")]);
        assert_eq!(resolve(&code, &params), json!("[Single Color]"));
    }

    #[test]
    fn test_false_branch_selected() {
        let code = json!({"$if": "!parameters.Color", "true": "[Single Color]", "false": "red"});
        let params = params(&[("Color", "true")]);
        assert_eq!(resolve(&code, &params), json!("red"));
    }

    #[test]
    fn test_missing_branch_resolves_to_null_at_top_level() {
        let code = json!({"$if": "!parameters.Color", "true": "[Single Color]"});
        let params = params(&[("Color", "true")]);
        assert_eq!(resolve(&code, &params), Value::Null);
    }

    #[test]
    fn test_old_syntax() {
        let code = json!({"$cond": {"query": "!parameters.Color", "true": "[Single Color]", "false": "red"}});

        assert_eq!(resolve(&code, &params(&[("Color", "")])), json!("[Single Color]"));
        assert_eq!(resolve(&code, &params(&[("Color", "true")])), json!("red"));
    }

    #[test]
    fn test_old_and_new_syntax_resolve_identically() {
        let old = json!({"$cond": {"query": "parameters.sort.includes('true')", "true": "-x"}});
        let new = json!({"$if": "parameters.sort.includes('true')", "true": "-x"});

        for value in ["true", "false"] {
            let params = params(&[("sort", value)]);
            assert_eq!(resolve(&old, &params), resolve(&new, &params));
        }
    }

    #[test]
    fn test_conditionals_in_array() {
        let code = json!({
            "foo": [
                {"$if": "!parameters.Color", "true": "[Single Color]", "false": "red"},
                {"$if": "parameters.Color", "true": "[Single Color]", "false": "red"}
            ]
        });
        let params = params(&[("Color", "")]);
        assert_eq!(resolve(&code, &params), json!({"foo": ["[Single Color]", "red"]}));
    }

    #[test]
    fn test_conditionals_in_array_old_syntax() {
        let code = json!({
            "foo": [
                {"$cond": {"query": "!parameters.Color", "true": "[Single Color]", "false": "red"}},
                {"$cond": {"query": "parameters.Color", "true": "[Single Color]", "false": "red"}}
            ]
        });
        let params = params(&[("Color", "")]);
        assert_eq!(resolve(&code, &params), json!({"foo": ["[Single Color]", "red"]}));
    }

    #[test]
    fn test_missing_branch_drops_array_element() {
        let code = json!(["keep", {"$if": "parameters.Color", "true": "chosen"}, "also kept"]);
        let params = params(&[("Color", "")]);
        assert_eq!(resolve(&code, &params), json!(["keep", "also kept"]));
    }

    #[test]
    fn test_array_branch_is_spliced_flat() {
        let code = json!([
            "first",
            {"$if": "parameters.expand", "true": ["a", "b"]},
            "last"
        ]);
        let params = params(&[("expand", "true")]);
        assert_eq!(resolve(&code, &params), json!(["first", "a", "b", "last"]));
    }

    #[test]
    fn test_non_conditional_nested_arrays_kept_in_place() {
        let code = json!([[1, 2], [3]]);
        assert_eq!(resolve(&code, &ParameterMap::new()), json!([[1, 2], [3]]));
    }

    #[test]
    fn test_conditional_object_properties() {
        let code = json!({
            "foo": {
                "bar": {"$if": "!parameters.Color", "true": "[Single Color]", "false": "red"},
                "baz": {"$if": "parameters.Color", "true": "[Single Color]", "false": "red"}
            }
        });
        let params = params(&[("Color", "")]);
        assert_eq!(
            resolve(&code, &params),
            json!({"foo": {"bar": "[Single Color]", "baz": "red"}})
        );
    }

    #[test]
    fn test_missing_branch_omits_property() {
        let code = json!({"kept": 1, "dropped": {"$if": "parameters.Color", "true": "x"}});
        let params = params(&[("Color", "")]);
        assert_eq!(resolve(&code, &params), json!({"kept": 1}));
    }

    #[test]
    fn test_selected_branch_is_resolved_recursively() {
        let code = json!({
            "$if": "parameters.outer",
            "true": {"$if": "parameters.inner", "true": "deep", "false": "shallow"}
        });
        let params = params(&[("outer", "yes"), ("inner", "")]);
        assert_eq!(resolve(&code, &params), json!("shallow"));
    }

    #[test]
    fn test_conditional_free_input_is_unchanged() {
        let code = json!({
            "mark": {"type": "point", "tooltip": true},
            "encoding": {"x": {"field": "a"}, "sizes": [1, 2.5, null]}
        });
        assert_eq!(resolve(&code, &params(&[("Color", "x")])), code);
    }

    #[test]
    fn test_malformed_conditional_is_walked_as_plain_object() {
        // $cond without a string query is not a conditional node
        let code = json!({"$cond": {"wrong": true}});
        assert_eq!(resolve(&code, &ParameterMap::new()), code);
    }

    #[test]
    fn test_dynamic_key_is_computed() {
        let code = json!({"[parameters.axis]": "quantitative"});
        let params = params(&[("axis", "x")]);
        assert_eq!(resolve(&code, &params), json!({"x": "quantitative"}));
    }

    #[test]
    fn test_dynamic_key_failure_falls_back_to_raw_text() {
        let code = json!({"[unknown_name]": 1});
        let params = params(&[("axis", "x")]);
        let sink = MemorySink::new();
        let resolved = apply_conditionals(&code, &params, &sink);
        assert_eq!(resolved, json!({"unknown_name": 1}));

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, DiagnosticKind::KeyFailure);
        assert_eq!(reports[0].source, "[unknown_name]");
    }

    #[test]
    fn test_failed_predicate_reads_false_and_walk_continues() {
        let code = json!({
            "broken": {"$if": "nonsense(", "true": "a", "false": "b"},
            "fine": {"$if": "parameters.Color", "true": "c", "false": "d"}
        });
        let params = params(&[("Color", "x")]);
        let sink = MemorySink::new();
        let resolved = apply_conditionals(&code, &params, &sink);
        assert_eq!(resolved, json!({"broken": "b", "fine": "c"}));
        assert_eq!(sink.reports().len(), 1);
    }

    #[test]
    fn test_widget_condition_show_and_hide() {
        let params = params(&[("Color", "red")]);
        let sink = MemorySink::new();

        let show = WidgetCondition {
            query: "parameters.Color".to_string(),
            result: QueryResult::Show,
        };
        let hide = WidgetCondition {
            query: "parameters.Color".to_string(),
            result: QueryResult::Hide,
        };
        assert!(show.should_show(&params, &sink));
        assert!(!hide.should_show(&params, &sink));
    }

    #[test]
    fn test_widget_condition_deserializes() {
        let condition: WidgetCondition =
            serde_json::from_value(json!({"query": "!parameters.X", "queryResult": "hide"}))
                .unwrap();
        assert_eq!(condition.result, QueryResult::Hide);
    }
}
