//! Normalization of parsed model output into a safe sections mapping.
//!
//! The model is asked for flat string fields plus two structured lists, but in
//! practice returns whatever it likes. Normalization guarantees the mapping
//! that reaches the renderer contains no nulls and no unexpected nesting.

use serde_json::{Map, Value};

/// Fields whose list/object values are passed through unchanged so the
/// renderer and the visualization collaborators can consume their structure.
pub const STRUCTURED_FIELDS: &[&str] = &["components", "milestones"];

/// Converts a loosely-typed mapping into a safe output mapping.
///
/// Rules per key: null becomes an empty string; string/number/bool scalars
/// pass through unchanged; list or object values on the recognized structured
/// fields pass through unchanged; any other structured value is serialized to
/// its canonical JSON text. Every input key survives, and running the result
/// through again yields an identical mapping.
pub fn normalize_sections(parsed: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(parsed.len());
    for (key, value) in parsed {
        let normalized = match value {
            Value::Null => Value::String(String::new()),
            Value::String(_) | Value::Number(_) | Value::Bool(_) => value,
            structured if STRUCTURED_FIELDS.contains(&key.as_str()) => structured,
            other => Value::String(stringify(&other)),
        };
        out.insert(key, normalized);
    }
    out
}

/// JSON serialization with a plain-text last resort.
fn stringify(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_every_input_key_survives() {
        let input = as_map(json!({
            "executive_summary_text": "summary",
            "payment_terms_text": null,
            "extra_key_from_model": 42
        }));
        let out = normalize_sections(input.clone());
        for key in input.keys() {
            assert!(out.contains_key(key), "lost key {key}");
        }
    }

    #[test]
    fn test_null_becomes_empty_string() {
        let out = normalize_sections(as_map(json!({"licenses_note": null})));
        assert_eq!(out["licenses_note"], json!(""));
    }

    #[test]
    fn test_scalars_pass_through_unchanged() {
        let out = normalize_sections(as_map(json!({
            "a": "text", "b": 3.5, "c": true
        })));
        assert_eq!(out["a"], json!("text"));
        assert_eq!(out["b"], json!(3.5));
        assert_eq!(out["c"], json!(true));
    }

    #[test]
    fn test_structured_fields_are_preserved() {
        let components = json!([{"name": "API", "description": "axum service"}]);
        let milestones = json!([{"title": "MVP", "duration_weeks": 4}]);
        let out = normalize_sections(as_map(json!({
            "components": components,
            "milestones": milestones
        })));
        assert_eq!(out["components"], components);
        assert_eq!(out["milestones"], milestones);
    }

    #[test]
    fn test_unexpected_structure_is_stringified() {
        let out = normalize_sections(as_map(json!({
            "development_note": {"unexpected": "object"},
            "support_note": ["a", "b"]
        })));
        assert_eq!(out["development_note"], json!(r#"{"unexpected":"object"}"#));
        assert_eq!(out["support_note"], json!(r#"["a","b"]"#));
    }

    #[test]
    fn test_idempotence() {
        let once = normalize_sections(as_map(json!({
            "executive_summary_text": "summary",
            "payment_terms_text": null,
            "components": [{"name": "core"}],
            "development_note": {"cost": 10}
        })));
        let twice = normalize_sections(once.clone());
        assert_eq!(once, twice);
    }
}
