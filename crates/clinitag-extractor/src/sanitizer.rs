//! Repair near-JSON generator output
//!
//! Models wrap output in code fences and sometimes emit several bare objects
//! instead of one array. Repair is best-effort; anything still unparseable is
//! a `ChunkError::Malformed` for that chunk only.

use crate::error::ChunkError;
use serde_json::Value;

const FENCE: &str = "```";

/// Apply the textual repairs without parsing
///
/// 1. strip a leading fence line (with optional language tag) and a trailing fence
/// 2. trim surrounding whitespace
/// 3. wrap several bare top-level objects into one array
///
/// # Examples
///
/// ```
/// use clinitag_extractor::sanitize;
///
/// assert_eq!(sanitize("```json\n[{\"name\":\"x\"}]\n```"), r#"[{"name":"x"}]"#);
/// assert_eq!(sanitize(r#"{"name":"a"}{"name":"b"}"#), r#"[{"name":"a"},{"name":"b"}]"#);
/// ```
pub fn sanitize(raw: &str) -> String {
    let text = strip_fences(raw.trim());

    if text.starts_with('{') {
        let objects = top_level_objects(text);
        if objects.len() > 1 {
            return wrap_objects(text, &objects);
        }
    }

    text.to_string()
}

/// Repair and parse generator output into a list of tag-shaped values
///
/// The parsed value must be an array; a single object or a scalar is
/// rejected.
pub fn sanitize_and_parse(raw: &str) -> Result<Vec<Value>, ChunkError> {
    let repaired = sanitize(raw);
    if repaired.is_empty() {
        return Err(ChunkError::Malformed("empty response".to_string()));
    }

    let value: Value = serde_json::from_str(&repaired)
        .map_err(|e| ChunkError::Malformed(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(ChunkError::Malformed(format!(
            "expected a JSON array, got {}",
            json_type_name(&other)
        ))),
    }
}

fn strip_fences(text: &str) -> &str {
    let mut text = text;

    if let Some(rest) = text.strip_prefix(FENCE) {
        // Language tag: everything up to the end of the fence line
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+'))
            .unwrap_or(rest.len());
        let rest = &rest[tag_len..];
        text = match rest.find('\n') {
            Some(newline) if rest[..newline].trim().is_empty() => &rest[newline + 1..],
            _ => rest,
        };
    }

    let text = text.trim();
    match text.strip_suffix(FENCE) {
        Some(rest) => rest.trim(),
        None => text,
    }
}

/// Byte spans of the top-level `{...}` objects, string-aware
fn top_level_objects(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => {
                if depth == 0 && c == '{' {
                    start = i;
                }
                depth += 1;
            }
            '}' | ']' => {
                if depth == 0 {
                    // Unbalanced; leave the text for the parser to reject
                    return spans;
                }
                depth -= 1;
                if depth == 0 && c == '}' {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans
}

fn wrap_objects(text: &str, objects: &[(usize, usize)]) -> String {
    let only_separators = |gap: &str| gap.chars().all(|c| c.is_whitespace() || c == ',');

    let mut previous_end = 0;
    for &(start, end) in objects {
        if !only_separators(&text[previous_end..start]) {
            return format!("[{}]", text);
        }
        previous_end = end;
    }
    if !only_separators(&text[previous_end..]) {
        return format!("[{}]", text);
    }

    let joined: Vec<&str> = objects.iter().map(|&(start, end)| &text[start..end]).collect();
    format!("[{}]", joined.join(","))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_array() {
        let parsed = sanitize_and_parse("```json\n[{\"name\":\"x\"}]\n```").unwrap();
        assert_eq!(parsed, vec![json!({"name": "x"})]);
    }

    #[test]
    fn test_fence_without_language_tag() {
        assert_eq!(sanitize("```\n[]\n```"), "[]");
    }

    #[test]
    fn test_fence_with_surrounding_whitespace() {
        assert_eq!(sanitize("  \n```python\n [1] \n```  \n"), "[1]");
    }

    #[test]
    fn test_two_bare_objects_become_a_list() {
        let parsed = sanitize_and_parse(r#"{"name":"a"}{"name":"b"}"#).unwrap();
        assert_eq!(parsed, vec![json!({"name": "a"}), json!({"name": "b"})]);
    }

    #[test]
    fn test_comma_and_newline_separated_objects() {
        let parsed = sanitize_and_parse("{\"name\":\"a\"},\n{\"name\":\"b\"}\n").unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_nested_braces_are_not_top_level() {
        let raw = r#"{"name":"a","conditions":[{"type":"tag","name":"b"}]}"#;
        assert_eq!(sanitize(raw), raw);
        assert!(matches!(sanitize_and_parse(raw), Err(ChunkError::Malformed(_))));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let raw = r#"{"name":"a","description":"} {"}"#;
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn test_single_object_is_malformed() {
        let result = sanitize_and_parse(r#"{"name":"x"}"#);
        assert!(matches!(result, Err(ChunkError::Malformed(m)) if m.contains("an object")));
    }

    #[test]
    fn test_scalar_is_malformed() {
        assert!(matches!(sanitize_and_parse("42"), Err(ChunkError::Malformed(_))));
    }

    #[test]
    fn test_prose_is_malformed() {
        assert!(sanitize_and_parse("Aqui estão as tags solicitadas").is_err());
        assert!(sanitize_and_parse("   ").is_err());
    }

    #[test]
    fn test_array_is_left_alone() {
        assert_eq!(sanitize("[{\"a\":1},{\"b\":2}]"), "[{\"a\":1},{\"b\":2}]");
    }

    #[test]
    fn test_trailing_prose_falls_back_to_literal_wrap() {
        let raw = "{\"a\":1}{\"b\":2} fim";
        assert_eq!(sanitize(raw), format!("[{}]", raw));
        assert!(sanitize_and_parse(raw).is_err());
    }
}
