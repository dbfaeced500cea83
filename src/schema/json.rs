//! Lenient accessors for platform JSON, which is loose about number vs string.

use serde_json::{Map, Value};

/// Read a string, accepting numbers as well.
pub fn string_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read an integer, accepting numeric strings as well.
pub fn int_at(value: &Value, pointer: &str) -> Option<i64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read an array of strings, skipping non-string and empty entries.
pub fn string_list_at(value: &Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Collect the non-empty strings found at each pointer, in order, without
/// duplicates.
pub fn first_strings(value: &Value, pointers: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for pointer in pointers {
        if let Some(s) = value.pointer(pointer).and_then(Value::as_str) {
            if !s.is_empty() && !out.iter().any(|existing| existing == s) {
                out.push(s.to_string());
            }
        }
    }
    out
}

/// Copy a value into `extra` under `key` when present and non-null.
pub fn copy_extra(extra: &mut Map<String, Value>, key: &str, value: Option<&Value>) {
    if let Some(v) = value.filter(|v| !v.is_null()) {
        extra.insert(key.to_string(), v.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loose_scalars() {
        let v = json!({"a": {"n": 5, "s": "17", "x": "abc"}});
        assert_eq!(string_at(&v, "/a/n"), Some("5".to_string()));
        assert_eq!(int_at(&v, "/a/s"), Some(17));
        assert_eq!(int_at(&v, "/a/x"), None);
        assert_eq!(string_at(&v, "/a/missing"), None);
    }

    #[test]
    fn test_lists() {
        let v = json!({"urls": ["a", "", 3, "b"], "one": "a", "two": "a", "three": "c"});
        assert_eq!(string_list_at(&v, "/urls"), vec!["a", "b"]);
        assert!(string_list_at(&v, "/missing").is_empty());
        assert_eq!(first_strings(&v, &["/one", "/two", "/three"]), vec!["a", "c"]);
    }
}
