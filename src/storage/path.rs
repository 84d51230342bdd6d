//! Slash-path resolution into nested JSON values.
//!
//! A stored document is navigated with slash-delimited segments:
//! `users/alice/address/city` walks object fields, and a numeric segment
//! after a list field is a 1-based index into that list
//! (`users/friends/2` is the second friend).
//!
//! Resolution scans every remaining segment against the current object
//! rather than stopping at the first miss, so when a later segment also
//! names a sibling field of the same object, the later match wins. That
//! scan order is part of the wire contract and is pinned by tests below.

use serde_json::{Map, Value};

/// Resolves `segments` against `object`, returning the matched value.
///
/// Returns `None` when no segment chain matches. Descent happens through
/// object fields; a list is only enterable with a 1-based numeric index in
/// `[1, len]` (zero, negative, out-of-range and non-numeric segments never
/// match). Scalars end descent.
pub fn resolve<'a>(object: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let mut result = None;

    for (i, segment) in segments.iter().enumerate() {
        let Some(value) = object.get(*segment) else {
            continue;
        };
        let rest = &segments[i + 1..];

        if rest.is_empty() {
            result = Some(value);
            continue;
        }

        match value {
            Value::Object(inner) => return resolve(inner, rest),
            Value::Array(items) => {
                if let Ok(index) = rest[0].parse::<usize>() {
                    if (1..=items.len()).contains(&index) {
                        result = Some(&items[index - 1]);
                    }
                }
            }
            _ => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_resolve_top_level_key() {
        let root = object(json!({"a": {"b": 1}}));
        assert_eq!(resolve(&root, &["a"]), Some(&json!({"b": 1})));
    }

    #[test]
    fn test_resolve_nested_objects() {
        let root = object(json!({"a": {"b": {"c": 5}}}));
        assert_eq!(resolve(&root, &["a", "b", "c"]), Some(&json!(5)));
        assert_eq!(resolve(&root, &["a", "b"]), Some(&json!({"c": 5})));
    }

    #[test]
    fn test_resolve_missing_field() {
        let root = object(json!({"a": {"b": 1}}));
        assert_eq!(resolve(&root, &["a", "x"]), None);
        assert_eq!(resolve(&root, &["x"]), None);
    }

    #[test]
    fn test_list_index_is_one_based() {
        let root = object(json!({"a": {"list": [10, 20, 30]}}));
        assert_eq!(resolve(&root, &["a", "list", "1"]), Some(&json!(10)));
        assert_eq!(resolve(&root, &["a", "list", "2"]), Some(&json!(20)));
        assert_eq!(resolve(&root, &["a", "list", "3"]), Some(&json!(30)));
    }

    #[test]
    fn test_list_index_out_of_range() {
        let root = object(json!({"a": {"list": [10, 20, 30]}}));
        assert_eq!(resolve(&root, &["a", "list", "0"]), None);
        assert_eq!(resolve(&root, &["a", "list", "4"]), None);
        assert_eq!(resolve(&root, &["a", "list", "-1"]), None);
        assert_eq!(resolve(&root, &["a", "list", "two"]), None);
    }

    #[test]
    fn test_scalar_blocks_descent() {
        let root = object(json!({"a": {"b": 7}}));
        assert_eq!(resolve(&root, &["a", "b", "c"]), None);
    }

    #[test]
    fn test_resolve_list_element_object() {
        let root = object(json!({"a": {"list": [{"x": 1}, {"x": 2}]}}));
        assert_eq!(resolve(&root, &["a", "list", "2"]), Some(&json!({"x": 2})));
    }

    // Pins the sibling-scan contract: segments keep being checked against
    // the current object after a list-index match, and a later match
    // overwrites an earlier one.
    #[test]
    fn test_sibling_scan_last_match_wins() {
        let root = object(json!({"a": {"list": [10, 20, 30], "2": "x"}}));
        assert_eq!(resolve(&root, &["a", "list", "2"]), Some(&json!("x")));
    }

    #[test]
    fn test_sibling_scan_without_collision_keeps_index_match() {
        let root = object(json!({"a": {"list": [10, 20, 30], "other": true}}));
        assert_eq!(resolve(&root, &["a", "list", "2"]), Some(&json!(20)));
    }
}
