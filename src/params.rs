// Parameter values and the identifier scope they induce

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single parameter value as supplied by the GUI state layer.
///
/// String values may carry their own quoting: a value of `"\"Origin\""`
/// (quotes included) substitutes as a JSON string literal, while `"18"`
/// substitutes as a bare token. See [`crate::substitute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Number(f64),
    String(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Render this value as template text for the bare `[name]` pattern.
    ///
    /// Empty and null values render as the literal `null` so the
    /// substituted document stays parseable.
    pub fn render_bare(&self) -> String {
        match self {
            ParamValue::Null => "null".to_string(),
            ParamValue::Number(n) => Value::from(*n).to_string(),
            ParamValue::String(s) => {
                let text = unquote(s);
                if text.is_empty() {
                    "null".to_string()
                } else {
                    text.to_string()
                }
            }
            ParamValue::List(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| "null".to_string())
            }
        }
    }

    /// Render this value as template text for the quoted `"[name]"` pattern.
    ///
    /// A quoted string value is inserted verbatim, quotes included, so the
    /// value supplies its own quoting.
    pub fn render_quoted(&self) -> String {
        match self {
            ParamValue::String(s) if is_quoted(s) => s.clone(),
            _ => self.render_bare(),
        }
    }

    /// The raw JSON form bound into the expression scope.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Null => Value::Null,
            ParamValue::Number(n) => Value::from(*n),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

/// The live table of current parameter values driving one evaluation.
///
/// Insertion order is preserved so the substitution pass and diagnostic
/// snapshots are deterministic.
pub type ParameterMap = IndexMap<String, ParamValue>;

/// Configuration errors detectable before evaluation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("parameters {first:?} and {second:?} collide on identifier {identifier:?}")]
    IdentifierCollision {
        first: String,
        second: String,
        identifier: String,
    },
}

/// Strip every character outside `[A-Za-z0-9_]` from a parameter name,
/// producing the identifier it is bound under in expressions.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Reject parameter maps in which two distinct names sanitize to the same
/// expression identifier. Intended for template-load time; the evaluator
/// performs the same check and degrades per the failure policy.
pub fn validate_parameters(params: &ParameterMap) -> Result<(), ParamError> {
    let mut seen: IndexMap<String, &str> = IndexMap::new();
    for name in params.keys() {
        let identifier = sanitize_name(name);
        if identifier.is_empty() {
            continue;
        }
        if let Some(first) = seen.get(&identifier) {
            return Err(ParamError::IdentifierCollision {
                first: (*first).to_string(),
                second: name.clone(),
                identifier,
            });
        }
        seen.insert(identifier, name);
    }
    Ok(())
}

/// True iff `s` is wrapped in double quotes (its own quoting).
pub fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

/// Remove the surrounding double quotes when present.
pub fn unquote(s: &str) -> &str {
    if is_quoted(s) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
