// Template substitution engine
//
// Substitution happens on the raw template text, before any JSON parsing,
// because placeholders may sit inside larger strings:
// `{"field": "datum[\"[xDim]\"]"}`. For each parameter two patterns are
// replaced, the quoted form `"[name]"` first and then the bare form
// `[name]`, with quote-aware coercion so values can control whether they
// land as JSON string literals or raw tokens.

use crate::params::{is_quoted, ParamValue, ParameterMap};

/// Replace every placeholder in `code` with the corresponding parameter
/// value. A single linear pass over the map; replacement text is never
/// re-scanned for further placeholders.
///
/// The caller is responsible for the substituted text remaining valid
/// JSON once every placeholder is filled in.
pub fn set_template_values(code: &str, params: &ParameterMap) -> String {
    let mut filled = code.to_string();
    for (name, value) in params {
        let quoted_pattern = format!("\"[{}]\"", name);
        let bare_pattern = format!("[{}]", name);

        match value {
            ParamValue::String(s) if is_quoted(s) => {
                // a quoted value supplies its own quoting at the quoted
                // site, and its dequoted content at the bare site
                filled = filled.replace(&quoted_pattern, &value.render_quoted());
                filled = filled.replace(&bare_pattern, &value.render_bare());
            }
            _ => {
                let text = value.render_bare();
                filled = filled.replace(&quoted_pattern, &text);
                filled = filled.replace(&bare_pattern, &text);
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> ParameterMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_substitute_single_value() {
        let x = set_template_values("[foo]", &params(&[("foo", "bar")]));
        assert_eq!(x, "bar");
    }

    #[test]
    fn test_substitute_single_value_enclosed_in_quotes() {
        let x = set_template_values(r#""[foo]?""#, &params(&[("foo", "bar")]));
        assert_eq!(x, r#""bar?""#);
    }

    #[test]
    fn test_substitute_unquoted_value_drops_template_quotes() {
        let x = set_template_values(r#""[foo]""#, &params(&[("foo", "bar")]));
        assert_eq!(x, "bar");
    }

    #[test]
    fn test_unquoted_value_is_never_quoted() {
        // parameter value `18` does not carry its own quotes
        let x = set_template_values(r#"{ "a": [foo], "b": "[foo]" }"#, &params(&[("foo", "18")]));
        assert_eq!(x, r#"{ "a": 18, "b": 18 }"#);
    }

    #[test]
    fn test_quoted_value_keeps_quotes_at_quoted_site_only() {
        // parameter value `"18"` does carry its own quotes
        let x = set_template_values(
            r#"{ "a": [foo], "b": "[foo]" }"#,
            &params(&[("foo", "\"18\"")]),
        );
        assert_eq!(x, r#"{ "a": 18, "b": "18" }"#);
    }

    #[test]
    fn test_substitute_multiple_values() {
        let x = set_template_values(
            "[foo] [bar] [baz]",
            &params(&[("foo", "1"), ("bar", "2"), ("baz", "3")]),
        );
        assert_eq!(x, "1 2 3");
    }

    #[test]
    fn test_empty_value_substitutes_null() {
        let x = set_template_values(r#"{"color": [Color]}"#, &params(&[("Color", "")]));
        assert_eq!(x, r#"{"color": null}"#);
    }

    #[test]
    fn test_null_value_substitutes_null() {
        let mut map = ParameterMap::new();
        map.insert("Color".to_string(), ParamValue::Null);
        let x = set_template_values("[Color]", &map);
        assert_eq!(x, "null");
    }

    #[test]
    fn test_list_value_substitutes_json_array() {
        let mut map = ParameterMap::new();
        map.insert(
            "fields".to_string(),
            ParamValue::List(vec!["a".to_string(), "b".to_string()]),
        );
        let x = set_template_values(r#"{"fields": "[fields]"}"#, &map);
        assert_eq!(x, r#"{"fields": ["a","b"]}"#);
    }

    #[test]
    fn test_placeholder_inside_larger_string() {
        let x = set_template_values(
            r#"{"field": "datum[\"[xDim]\"]"}"#,
            &params(&[("xDim", "\"Origin\"")]),
        );
        assert_eq!(x, r#"{"field": "datum[\"Origin\"]"}"#);
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        let x = set_template_values("[foo] [bar]", &params(&[("foo", "1")]));
        assert_eq!(x, "1 [bar]");
    }

    #[test]
    fn test_no_recursive_resubstitution() {
        // a replacement that happens to produce another placeholder's
        // pattern is still replaced by the later entry's pass, but only
        // within the single linear sweep
        let x = set_template_values("[a]", &params(&[("b", "2"), ("a", "[b]")]));
        assert_eq!(x, "[b]");
    }
}
