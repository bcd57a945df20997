//! Key normalization for `sjson` answers.
//!
//! # Design
//! The panel's `sjson` output encodes XML text nodes as `"$"` keys and
//! attributes as `"$name"` keys, and can emit empty keys. `normalize`
//! rebuilds the tree so every mapping key is non-empty and free of `$`:
//!
//! - a key containing `$` loses every `$`;
//! - a key that is (or becomes) empty is replaced by its 0-based position
//!   `i` within the mapping, or by `i + 777` when a key `i` is already taken;
//! - every other key is kept as is, and values are normalized recursively,
//!   sequences included.
//!
//! The input is never mutated. Positions come from the input's iteration
//! order, which `serde_json`'s `preserve_order` feature keeps identical to
//! the wire order.
//!
//! The offset is applied once. A mapping that already holds both `i` and
//! `i + 777` loses one of the two values to whichever entry comes later.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// Character stripped from every mapping key.
pub const MARKER: char = '$';

/// Added to a positional key that is already taken in the same mapping.
pub const COLLISION_OFFSET: usize = 777;

/// Return a normalized copy of `value`.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        scalar => scalar.clone(),
    }
}

fn normalize_map(map: &Map<String, Value>) -> Map<String, Value> {
    let original: HashSet<&str> = map.keys().map(String::as_str).collect();
    let mut out = Map::with_capacity(map.len());

    for (position, (key, value)) in map.iter().enumerate() {
        let key = match rewritten_key(key, position, |k| original.contains(k) || out.contains_key(k)) {
            Some(new_key) => new_key,
            None => key.clone(),
        };
        out.insert(key, normalize(value));
    }
    out
}

/// The replacement for `key`, or `None` when it needs no rewrite.
fn rewritten_key(key: &str, position: usize, taken: impl Fn(&str) -> bool) -> Option<String> {
    if !key.is_empty() && !key.contains(MARKER) {
        return None;
    }

    let stripped: String = key.chars().filter(|&c| c != MARKER).collect();
    if !stripped.is_empty() {
        return Some(stripped);
    }

    let positional = position.to_string();
    if taken(&positional) {
        Some((position + COLLISION_OFFSET).to_string())
    } else {
        Some(positional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<&str> {
        value.as_object().unwrap().keys().map(String::as_str).collect()
    }

    #[test]
    fn worked_example_without_collision() {
        let input = json!({"$a": 1, "": 2, "b": 3});
        let out = normalize(&input);
        assert_eq!(out, json!({"a": 1, "1": 2, "b": 3}));
        assert_eq!(keys(&out), ["a", "1", "b"]);
    }

    #[test]
    fn worked_example_with_collision() {
        // Position 1 is empty, but key "1" already exists further on.
        let input = json!({"$a": 1, "": 2, "1": 3});
        let out = normalize(&input);
        assert_eq!(out, json!({"a": 1, "778": 2, "1": 3}));
        assert_eq!(keys(&out), ["a", "778", "1"]);
    }

    #[test]
    fn collision_with_earlier_literal_key() {
        let input = json!({"0": "x", "": "y"});
        let out = normalize(&input);
        // Position 1 is free, so the empty key takes it.
        assert_eq!(out, json!({"0": "x", "1": "y"}));

        let input = json!({"1": "x", "": "y"});
        let out = normalize(&input);
        assert_eq!(out, json!({"1": "x", "778": "y"}));
    }

    #[test]
    fn marker_only_key_becomes_positional() {
        let input = json!({"$": "text"});
        assert_eq!(normalize(&input), json!({"0": "text"}));

        let input = json!({"$id": "7", "$": "text"});
        assert_eq!(normalize(&input), json!({"id": "7", "1": "text"}));
    }

    #[test]
    fn every_marker_is_removed() {
        let input = json!({"$a$b$": 1});
        assert_eq!(normalize(&input), json!({"ab": 1}));
    }

    #[test]
    fn recurses_into_mappings_and_sequences() {
        let input = json!({
            "doc": {
                "$lang": "en",
                "elem": [
                    {"id": {"$": "1"}, "": "first"},
                    {"id": {"$": "2"}}
                ]
            }
        });
        let out = normalize(&input);
        assert_eq!(
            out,
            json!({
                "doc": {
                    "lang": "en",
                    "elem": [
                        {"id": {"0": "1"}, "1": "first"},
                        {"id": {"0": "2"}}
                    ]
                }
            })
        );
    }

    #[test]
    fn recurses_under_rewritten_keys() {
        let input = json!({"$ok": {"$": ""}});
        assert_eq!(normalize(&input), json!({"ok": {"0": ""}}));
    }

    #[test]
    fn clean_mapping_is_unchanged_and_idempotent() {
        let input = json!({"doc": {"elem": [{"id": "1"}], "ok": {"0": ""}}, "z": 1, "a": 2});
        let once = normalize(&input);
        assert_eq!(once, input);
        assert_eq!(keys(&once), ["doc", "z", "a"]);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn input_is_left_untouched() {
        let input = json!({"$a": 1, "": 2});
        let snapshot = input.clone();
        let _ = normalize(&input);
        assert_eq!(input, snapshot);
    }

    #[test]
    fn no_empty_keys_after_normalization() {
        let input = json!({"": 1, "$": 2, "$$": 3, "x": {"": 4}});
        let out = normalize(&input);
        fn check(value: &Value) {
            match value {
                Value::Object(map) => {
                    for (k, v) in map {
                        assert!(!k.is_empty());
                        assert!(!k.contains(MARKER));
                        check(v);
                    }
                }
                Value::Array(items) => items.iter().for_each(check),
                _ => {}
            }
        }
        check(&out);
        assert_eq!(keys(&out), ["0", "1", "2", "x"]);
    }

    #[test]
    fn repeated_collision_is_not_resolved() {
        // "" at position 1 collides with "1" and is moved to "778", which the
        // later literal "778" then overwrites.
        let input = json!({"a": 0, "": "lost", "1": "one", "778": "kept"});
        let out = normalize(&input);
        assert_eq!(out, json!({"a": 0, "778": "kept", "1": "one"}));
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(normalize(&json!("$x")), json!("$x"));
        assert_eq!(normalize(&json!(null)), json!(null));
    }
}
