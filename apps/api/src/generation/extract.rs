//! JSON blob extraction from raw model output.
//!
//! Models frequently wrap their JSON in prose or markdown fences. This module
//! recovers the first complete balanced `{...}` or `[...]` span with a bracket
//! stack rather than a regex, so nested structures and trailing chatter are
//! handled correctly.

/// Returns the first balanced JSON object or array embedded in `text`.
///
/// Scans left to right for the first `{` or `[`. A `{{` pair is skipped as a
/// single unit: the surrounding system uses `{{name}}` as template
/// placeholders, and model output sometimes echoes them back before the JSON.
/// From the first opener, every opening bracket pushes and every closer must
/// match the bracket kind on top of the stack; a mismatched closer means the
/// text is not JSON at all. When the stack returns to zero depth the span is
/// complete. An unterminated structure yields `None`, never a partial span.
pub fn extract_json_blob(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();

    let mut i = 0;
    let start = loop {
        match bytes.get(i)? {
            b'{' => {
                if bytes.get(i + 1) == Some(&b'{') {
                    // template placeholder, not JSON
                    i += 2;
                    continue;
                }
                break i;
            }
            b'[' => break i,
            _ => i += 1,
        }
    };

    let mut stack: Vec<u8> = Vec::new();
    for (offset, &b) in bytes[start..].iter().enumerate() {
        match b {
            b'{' | b'[' => stack.push(b),
            b'}' => {
                if stack.pop() != Some(b'{') {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[start..=start + offset]);
                }
            }
            b']' => {
                if stack.pop() != Some(b'[') {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_object_surrounded_by_noise() {
        assert_eq!(extract_json_blob(r#"JUNK {"a":1} JUNK"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_extracts_object_from_code_fence() {
        let raw = "Sure! ```json\n{\"executive_summary_text\":\"X\"}\n```";
        assert_eq!(
            extract_json_blob(raw),
            Some(r#"{"executive_summary_text":"X"}"#)
        );
    }

    #[test]
    fn test_extracts_array() {
        assert_eq!(
            extract_json_blob(r#"here you go: ["a", "b"] hope that helps"#),
            Some(r#"["a", "b"]"#)
        );
    }

    #[test]
    fn test_extracts_nested_structure_byte_for_byte() {
        let raw = r#"prose {"a": {"b": [1, 2, {"c": 3}]}, "d": []} more prose"#;
        assert_eq!(
            extract_json_blob(raw),
            Some(r#"{"a": {"b": [1, 2, {"c": 3}]}, "d": []}"#)
        );
    }

    #[test]
    fn test_first_complete_span_wins() {
        // Structures strictly after the first complete closure are never included.
        assert_eq!(
            extract_json_blob(r#"{"a": 1} and also {"b": 2}"#),
            Some(r#"{"a": 1}"#)
        );
    }

    #[test]
    fn test_unterminated_structure_yields_none() {
        assert_eq!(extract_json_blob(r#"{"a": ["#), None);
        assert_eq!(extract_json_blob(r#"start {"a": {"b": 1}"#), None);
    }

    #[test]
    fn test_mismatched_closer_is_a_hard_failure() {
        assert_eq!(extract_json_blob(r#"{"a": 1]"#), None);
        assert_eq!(extract_json_blob(r#"["a", "b"}"#), None);
    }

    #[test]
    fn test_no_bracket_at_all() {
        assert_eq!(extract_json_blob("no json here"), None);
        assert_eq!(extract_json_blob(""), None);
    }

    #[test]
    fn test_double_brace_placeholder_is_skipped() {
        // The {{name}} placeholder must not anchor the scan; the real object
        // further along is what gets extracted.
        let raw = r#"template says {{client_company_name}} then {"a": 1}"#;
        assert_eq!(extract_json_blob(raw), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_only_placeholders_yields_none() {
        assert_eq!(extract_json_blob("{{one}} and {{two}}"), None);
    }

    #[test]
    fn test_array_before_object_is_preferred() {
        // First opener wins regardless of bracket kind.
        assert_eq!(
            extract_json_blob(r#"["x"] later {"y": 1}"#),
            Some(r#"["x"]"#)
        );
    }

    #[test]
    fn test_utf8_noise_around_json() {
        let raw = "Конечно! {\"a\": \"ё\"} — готово";
        assert_eq!(extract_json_blob(raw), Some("{\"a\": \"ё\"}"));
    }
}
